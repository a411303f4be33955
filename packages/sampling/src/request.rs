//! Validation of heat points requests.
//!
//! Everything here runs before the source file is touched, so a malformed
//! request is rejected without any I/O.

use std::path::{Component, Path, PathBuf};

use heat_map_sampling_models::{
    DEFAULT_FILE, DEFAULT_MAX_POINTS, DEFAULT_SEED, HeatPointsQueryParams, SamplingMethod,
};

use crate::SamplingError;

/// Parameters of a single sampling pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingOptions {
    /// Reservoir capacity; always at least 1.
    pub max_points: usize,
    /// Retention strategy once the reservoir is full.
    pub method: SamplingMethod,
    /// Property to prefer as the weight.
    pub preferred_weight: Option<String>,
    /// Features weighted below this are dropped.
    pub min_weight: Option<f64>,
    /// Weights above this are clamped to it.
    pub max_weight: Option<f64>,
    /// Seed for the sampler's generator.
    pub seed: u64,
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            method: SamplingMethod::default(),
            preferred_weight: None,
            min_weight: None,
            max_weight: None,
            seed: DEFAULT_SEED,
        }
    }
}

/// A validated heat points request.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatPointsRequest {
    /// File name relative to the data directory, as requested.
    pub file: String,
    /// Sampling parameters.
    pub options: SamplingOptions,
}

impl HeatPointsRequest {
    /// Validates raw query parameters.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::InvalidRequest`] if `max` is not a positive
    /// integer, a weight bound is not a number, or `file` is not a plain
    /// relative path.
    pub fn from_params(params: &HeatPointsQueryParams) -> Result<Self, SamplingError> {
        let file = params
            .file
            .clone()
            .unwrap_or_else(|| DEFAULT_FILE.to_string());
        validate_file(&file)?;

        let max_points = match params.max.as_deref() {
            None => DEFAULT_MAX_POINTS,
            Some(raw) => parse_max(raw)?,
        };

        let options = SamplingOptions {
            max_points,
            method: SamplingMethod::from_param(params.method.as_deref()),
            preferred_weight: params.weight.clone().filter(|w| !w.is_empty()),
            min_weight: parse_bound("min_weight", params.min_weight.as_deref())?,
            max_weight: parse_bound("max_weight", params.max_weight.as_deref())?,
            seed: DEFAULT_SEED,
        };

        Ok(Self { file, options })
    }

    /// Resolves the requested file against `data_dir`.
    #[must_use]
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.file)
    }
}

fn invalid(message: String) -> SamplingError {
    SamplingError::InvalidRequest { message }
}

fn parse_max(raw: &str) -> Result<usize, SamplingError> {
    match raw.trim().parse::<usize>() {
        Ok(max) if max > 0 => Ok(max),
        _ => Err(invalid(format!("max must be a positive integer, got {raw:?}"))),
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<f64>, SamplingError> {
    raw.map(|raw| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| invalid(format!("{name} must be a number, got {raw:?}")))
    })
    .transpose()
}

/// Only plain relative paths are allowed, so lookups stay inside the data
/// directory.
fn validate_file(file: &str) -> Result<(), SamplingError> {
    if file.trim().is_empty() {
        return Err(invalid("file must not be empty".to_string()));
    }
    let plain = Path::new(file)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(invalid(format!(
            "file must be a relative path inside the data directory, got {file:?}"
        )));
    }
    Ok(())
}
