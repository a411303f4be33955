#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Bounded-size point samples from large `GeoJSON` feature collections.
//!
//! A sampling pass streams the `features` array of a file one feature at a
//! time, reduces each geometry to points, weighs them by a numeric
//! property, keeps a uniform sample of fixed size in a [`Reservoir`], and
//! finally rescales the weights to render-ready intensities.
//!
//! Every pass owns its reservoir and generator. The generator is seeded
//! from [`SamplingOptions::seed`], so repeating a request reproduces its
//! output exactly.
//!
//! # Usage
//!
//! ```rust,no_run
//! # fn example() -> Result<(), heat_map_sampling::SamplingError> {
//! use heat_map_sampling::{HeatPointsRequest, progress::null_progress, sample_file};
//! use heat_map_sampling_models::HeatPointsQueryParams;
//!
//! let request = HeatPointsRequest::from_params(&HeatPointsQueryParams::default())?;
//! let path = request.path_in(std::path::Path::new("static/data"));
//! let response = sample_file(&path, &request, &null_progress())?;
//! println!("{} of {} points", response.count, response.total);
//! # Ok(())
//! # }
//! ```

pub mod coords;
pub mod geometry;
pub mod normalize;
pub mod progress;
pub mod request;
pub mod reservoir;
pub mod source;
pub mod weight;

use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use heat_map_sampling_models::{HeatPointsResponse, SampledPoint};
use rand::SeedableRng;
use rand::rngs::StdRng;

pub use request::{HeatPointsRequest, SamplingOptions};
pub use reservoir::{Offer, Reservoir};
pub use source::{FeatureStream, RawFeature, open_features};

use progress::ProgressCallback;
use weight::WeightSelector;

/// Errors that can occur during a sampling pass.
#[derive(Debug, thiserror::Error)]
pub enum SamplingError {
    /// Query parameters failed validation.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the offending parameter.
        message: String,
    },

    /// The source file does not exist.
    #[error("File not found: {0}")]
    NotFound(String),

    /// The source document is malformed or truncated.
    #[error("Invalid GeoJSON: {message}")]
    InvalidInput {
        /// Description of what went wrong and where.
        message: String,
    },

    /// I/O error while reading the source file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`SamplingError`] for callers that map
/// failures to statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request parameters.
    InvalidRequest,
    /// Missing source file.
    NotFound,
    /// Malformed source document.
    InvalidInput,
    /// Environment or I/O failure.
    Internal,
}

impl SamplingError {
    /// Returns the class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Result of a pass before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    /// Sampled points in reservoir slot order.
    pub points: Vec<SampledPoint>,
    /// Points observed before the pass ended.
    pub total_seen: u64,
    /// Weight key resolved during the pass.
    pub weight_key: Option<String>,
}

/// Runs the sampling loop over a sequence of features.
///
/// The first error from `features` aborts the pass; no partial sample is
/// returned.
///
/// # Errors
///
/// Returns the first error yielded by `features`.
pub fn sample_features<I>(
    features: I,
    options: &SamplingOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<SampleOutcome, SamplingError>
where
    I: IntoIterator<Item = Result<RawFeature, SamplingError>>,
{
    let rng = StdRng::seed_from_u64(options.seed);
    let mut reservoir = Reservoir::new(options.max_points, options.method, rng);
    let mut selector = WeightSelector::new(options.preferred_weight.clone());

    for feature in features {
        let feature = feature?;
        progress.inc(1);

        selector.observe(&feature.properties);
        let mut weight = selector.weight_of(&feature.properties);

        if let (Some(min), Some(w)) = (options.min_weight, weight)
            && w < min
        {
            continue;
        }
        if let (Some(max), Some(w)) = (options.max_weight, weight)
            && w > max
        {
            weight = Some(max);
        }
        let weight = weight.filter(|w| w.is_finite()).unwrap_or(1.0);

        for point in geometry::reduce_geometry(&feature.geometry) {
            let offer = reservoir.offer(SampledPoint {
                lat: point.y(),
                lon: point.x(),
                weight,
            });
            match offer {
                Offer::Exhausted => break,
                Offer::Replaced(slot) => log::trace!("Replaced reservoir slot {slot}"),
                Offer::Appended | Offer::Discarded => {}
            }
        }

        if reservoir.is_exhausted() {
            log::debug!("Reservoir full after {} points, stopping", reservoir.total_seen());
            break;
        }
    }

    Ok(SampleOutcome {
        total_seen: reservoir.total_seen(),
        points: reservoir.into_points(),
        weight_key: selector.into_key(),
    })
}

/// Samples features read from `reader` and assembles the response.
///
/// # Errors
///
/// * [`SamplingError::InvalidInput`] if the document is malformed or ends
///   early
/// * [`SamplingError::Io`] if reading fails
pub fn sample_reader<R: BufRead>(
    reader: R,
    request: &HeatPointsRequest,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<HeatPointsResponse, SamplingError> {
    sample_stream(FeatureStream::new(reader), request, progress)
}

/// Samples the file at `path` and assembles the response.
///
/// `path` is normally [`HeatPointsRequest::path_in`] of the data directory.
///
/// # Errors
///
/// * [`SamplingError::NotFound`] if `path` is not an existing file
/// * [`SamplingError::InvalidInput`] if the document is malformed or ends
///   early
/// * [`SamplingError::Io`] if reading fails
pub fn sample_file(
    path: &Path,
    request: &HeatPointsRequest,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<HeatPointsResponse, SamplingError> {
    log::debug!("Opening {}", path.display());
    sample_stream(open_features(path)?, request, progress)
}

fn sample_stream<R: BufRead>(
    stream: FeatureStream<R>,
    request: &HeatPointsRequest,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<HeatPointsResponse, SamplingError> {
    let start = Instant::now();
    let options = &request.options;
    progress.set_message(format!("Sampling {}", request.file));

    let outcome = match sample_features(stream, options, progress) {
        Ok(outcome) => outcome,
        Err(e) => {
            progress.finish_and_clear();
            log::warn!("Sampling {} failed: {e}", request.file);
            return Err(e);
        }
    };

    progress.finish(format!(
        "Sampled {} of {} points",
        outcome.points.len(),
        outcome.total_seen
    ));
    log::info!(
        "Sampled {} of {} points from {} ({}, max {}) in {:.2?}",
        outcome.points.len(),
        outcome.total_seen,
        request.file,
        options.method,
        options.max_points,
        start.elapsed()
    );

    Ok(normalize::assemble(
        &outcome.points,
        outcome.total_seen,
        outcome.weight_key,
        &request.file,
        options.max_points,
        options.method,
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::path::PathBuf;

    use heat_map_sampling_models::{HeatPointsQueryParams, SamplingMethod};
    use serde_json::{Value, json};

    use super::*;
    use crate::progress::null_progress;

    fn request(max: usize, method: SamplingMethod) -> HeatPointsRequest {
        HeatPointsRequest {
            file: "test.geojson".to_string(),
            options: SamplingOptions {
                max_points: max,
                method,
                ..SamplingOptions::default()
            },
        }
    }

    fn point_feature(lon: f64, lat: f64, properties: &Value) -> Value {
        json!({
            "type": "Feature",
            "properties": properties,
            "geometry": {"type": "Point", "coordinates": [lon, lat]}
        })
    }

    fn collection(features: Vec<Value>) -> String {
        json!({"type": "FeatureCollection", "features": features}).to_string()
    }

    #[allow(clippy::cast_precision_loss)]
    fn grid(n: usize) -> String {
        collection(
            (0..n)
                .map(|i| point_feature(25.0 + i as f64 * 0.001, 54.0, &json!({"pop": i})))
                .collect(),
        )
    }

    fn run(doc: &str, request: &HeatPointsRequest) -> Result<HeatPointsResponse, SamplingError> {
        sample_reader(Cursor::new(doc.as_bytes().to_vec()), request, &null_progress())
    }

    /// A fixture file under a per-test directory in the system temp dir.
    fn fixture(name: &str, contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "heat_map_sampling_{}_{name}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("data.geojson");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn empty_collection_yields_empty_response() {
        let response = run(&collection(vec![]), &request(10, SamplingMethod::Reservoir)).unwrap();
        assert!(response.points.is_empty());
        assert_eq!(response.count, 0);
        assert_eq!(response.total, 0);
        assert_eq!(response.weight_key, None);
        assert_eq!(response.weight_min, None);
    }

    #[test]
    fn never_returns_more_than_max_or_total() {
        for max in [1, 7, 50, 500] {
            let response = run(&grid(120), &request(max, SamplingMethod::Reservoir)).unwrap();
            assert!(response.count <= max);
            assert!(response.count as u64 <= response.total);
            assert_eq!(response.total, 120);
        }
    }

    #[test]
    fn identical_requests_are_byte_identical() {
        let doc = grid(2_000);
        let req = request(100, SamplingMethod::Reservoir);
        let a = serde_json::to_string(&run(&doc, &req).unwrap()).unwrap();
        let b = serde_json::to_string(&run(&doc, &req).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn injected_seed_changes_sample() {
        let doc = grid(2_000);
        let a = run(&doc, &request(100, SamplingMethod::Reservoir)).unwrap();
        let mut req = request(100, SamplingMethod::Reservoir);
        req.options.seed = 7;
        let b = run(&doc, &req).unwrap();
        assert_ne!(a.points, b.points);
        assert_eq!(a.total, b.total);
    }

    #[test]
    fn first_method_stops_early() {
        let response = run(&grid(100), &request(10, SamplingMethod::First)).unwrap();
        assert_eq!(response.count, 10);
        // One point per feature: the scan ends as soon as the buffer fills.
        assert_eq!(response.total, 10);
        assert_eq!(response.method, SamplingMethod::First);
        let lons: Vec<f64> = response.points.iter().map(|p| p[1]).collect();
        assert!(lons.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn first_method_counts_overflow_point_within_a_feature() {
        let doc = collection(vec![json!({
            "properties": {},
            "geometry": {"type": "MultiPoint", "coordinates": [[1, 1], [2, 2], [3, 3], [4, 4]]}
        })]);
        let response = run(&doc, &request(2, SamplingMethod::First)).unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(response.total, 3);
    }

    #[test]
    fn min_weight_drops_features_entirely() {
        let doc = collection(vec![
            point_feature(25.0, 54.0, &json!({"pop": 5})),
            point_feature(26.0, 55.0, &json!({"pop": 50})),
            point_feature(27.0, 56.0, &json!({"pop": 500})),
        ]);
        let mut req = request(10, SamplingMethod::Reservoir);
        req.options.min_weight = Some(10.0);
        let response = run(&doc, &req).unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.count, 2);
        assert!(response.points.iter().all(|p| (p[0] - 54.0).abs() > 0.5));
    }

    #[test]
    fn max_weight_clamps_but_keeps_features() {
        let doc = collection(vec![
            point_feature(25.0, 54.0, &json!({"pop": 0})),
            point_feature(26.0, 55.0, &json!({"pop": 50})),
            point_feature(27.0, 56.0, &json!({"pop": 500})),
        ]);
        let mut req = request(10, SamplingMethod::Reservoir);
        req.options.max_weight = Some(100.0);
        let response = run(&doc, &req).unwrap();
        assert_eq!(response.count, 3);
        assert_eq!(response.weight_max, Some(100.0));
        let intensities: Vec<f64> = response.points.iter().map(|p| p[2]).collect();
        assert_eq!(intensities, vec![0.1, 0.5, 1.0]);
    }

    #[test]
    fn features_without_weight_default_to_one() {
        let doc = collection(vec![
            point_feature(25.0, 54.0, &json!({"pop": 3})),
            point_feature(26.0, 55.0, &json!({"name": "no weight"})),
        ]);
        let mut req = request(10, SamplingMethod::Reservoir);
        req.options.min_weight = Some(2.0);
        let response = run(&doc, &req).unwrap();
        // The unweighted feature is not subject to min_weight.
        assert_eq!(response.count, 2);
        assert_eq!(response.weight_key.as_deref(), Some("pop"));
        assert_eq!(response.weight_min, Some(1.0));
        assert_eq!(response.weight_max, Some(3.0));
    }

    #[test]
    fn preferred_weight_key_is_used() {
        let doc = collection(vec![point_feature(
            25.0,
            54.0,
            &json!({"population": 1, "density": 2}),
        )]);
        let mut req = request(10, SamplingMethod::Reservoir);
        req.options.preferred_weight = Some("density".to_string());
        let response = run(&doc, &req).unwrap();
        assert_eq!(response.weight_key.as_deref(), Some("density"));
    }

    #[test]
    fn polygons_contribute_centroids() {
        let doc = collection(vec![json!({
            "properties": {"value": 1},
            "geometry": {
                "type": "MultiPolygon",
                "coordinates": [
                    [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]],
                    [[[10, 10], [12, 10], [12, 12], [10, 12], [10, 10]]]
                ]
            }
        })]);
        let response = run(&doc, &request(10, SamplingMethod::Reservoir)).unwrap();
        assert_eq!(response.total, 2);
        assert_eq!(response.points[0], [2.0, 2.0, 1.0]);
    }

    #[test]
    fn malformed_features_contribute_nothing() {
        let doc = collection(vec![
            json!("not a feature"),
            json!({"properties": 5, "geometry": {"type": "Point", "coordinates": [1, 2]}}),
            json!({"properties": {}, "geometry": {"type": "LineString", "coordinates": [[1, 2]]}}),
            json!({"properties": {}}),
            point_feature(25.0, 54.0, &json!({"name": "kept"})),
        ]);
        let response = run(&doc, &request(10, SamplingMethod::Reservoir)).unwrap();
        assert_eq!(response.total, 1);
        assert_eq!(response.points, vec![[54.0, 25.0, 1.0]]);
        assert_eq!(response.weight_key, None);
    }

    #[test]
    fn truncated_document_fails_without_partial_result() {
        let doc = grid(50);
        let truncated = &doc[..doc.len() / 2];
        let err = run(truncated, &request(10, SamplingMethod::Reservoir)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn sample_file_reads_from_disk() {
        let path = fixture("reads_from_disk", &grid(30));
        let response = sample_file(
            &path,
            &request(5, SamplingMethod::Reservoir),
            &null_progress(),
        )
        .unwrap();
        assert_eq!(response.count, 5);
        assert_eq!(response.total, 30);
        assert_eq!(response.file, "test.geojson");
        assert_eq!(response.max, 5);
    }

    #[test]
    fn sample_file_missing_is_not_found() {
        let path = std::env::temp_dir().join("heat_map_sampling_does_not_exist.geojson");
        let err = sample_file(
            &path,
            &request(5, SamplingMethod::Reservoir),
            &null_progress(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn sample_file_truncated_is_invalid_input() {
        let doc = grid(30);
        let path = fixture("truncated", &doc[..doc.len() - 3]);
        let err = sample_file(
            &path,
            &request(5, SamplingMethod::Reservoir),
            &null_progress(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn request_validation_happens_before_io() {
        let params = HeatPointsQueryParams {
            file: Some("does-not-exist.geojson".to_string()),
            max: Some("zero".to_string()),
            ..HeatPointsQueryParams::default()
        };
        let err = HeatPointsRequest::from_params(&params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }
}
