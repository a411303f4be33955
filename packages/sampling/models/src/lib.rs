#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request, response and point types for heat map sampling.
//!
//! These types form the JSON contract between the sampling endpoint and the
//! browser heat layer. They carry no behavior beyond defaults and parsing
//! of the sampling method so they can be shared by the server, the CLI and
//! the sampling pipeline itself.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// File sampled when the request does not name one.
pub const DEFAULT_FILE: &str = "population_ltu_2019-07-01.geojson";

/// Default reservoir capacity.
pub const DEFAULT_MAX_POINTS: usize = 50_000;

/// Seed for the sampler's generator. Identical requests produce identical
/// samples.
pub const DEFAULT_SEED: u64 = 42;

/// Property names tried, in order, when no preferred weight key matches.
pub const WEIGHT_KEY_CANDIDATES: &[&str] = &["population", "pop", "density", "value", "count"];

/// How points are retained once the buffer is full.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SamplingMethod {
    /// Uniform online reservoir sampling over the whole stream.
    #[default]
    Reservoir,
    /// Keep the first `max` points and stop scanning.
    First,
}

impl SamplingMethod {
    /// Parses a query value, falling back to [`SamplingMethod::Reservoir`]
    /// for missing or unrecognized values.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        value
            .map(str::trim)
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }
}

/// A single point retained by the sampler, before intensity normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledPoint {
    /// Latitude in degrees, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub lon: f64,
    /// Raw weight of the feature the point came from (`1.0` when absent).
    pub weight: f64,
}

/// Raw query parameters for the heat points endpoint.
///
/// Every field is kept as an unparsed string so that validation errors can
/// be reported with a message of our own instead of the extractor's.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeatPointsQueryParams {
    /// File name relative to the data directory.
    pub file: Option<String>,
    /// Maximum number of points to return.
    pub max: Option<String>,
    /// `reservoir` or `first`.
    pub method: Option<String>,
    /// Preferred weight property.
    pub weight: Option<String>,
    /// Features with a weight below this are dropped.
    pub min_weight: Option<String>,
    /// Weights above this are clamped down to it.
    pub max_weight: Option<String>,
}

/// Response body of the heat points endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatPointsResponse {
    /// `[lat, lon, intensity]` triples in sample order.
    pub points: Vec<[f64; 3]>,
    /// Number of points returned.
    pub count: usize,
    /// Property used as the weight, if any was found.
    pub weight_key: Option<String>,
    /// Number of points observed across the scanned part of the file.
    pub total: u64,
    /// Lower weight bound used for normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_min: Option<f64>,
    /// Upper weight bound used for normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_max: Option<f64>,
    /// Requested file, echoed back.
    pub file: String,
    /// Requested capacity, echoed back.
    pub max: usize,
    /// Effective sampling method.
    pub method: SamplingMethod,
}

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
}

/// Error body returned for any failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Human-readable description of the failure.
    pub error: String,
}
