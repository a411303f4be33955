//! Intensity normalization and response assembly.
//!
//! Sampled weights are rescaled onto `[0, 1]` using the finite weights in
//! the sample as bounds, then floored at [`MIN_INTENSITY`]. When the bounds
//! collapse every point gets full intensity.

use heat_map_sampling_models::{HeatPointsResponse, SampledPoint, SamplingMethod};

/// Lowest intensity given to a point, so no point renders fully transparent.
pub const MIN_INTENSITY: f64 = 0.1;

/// Points with intensities and the bounds they were scaled against.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    /// `[lat, lon, intensity]` triples in input order.
    pub points: Vec<[f64; 3]>,
    /// Lower bound (`1.0` when no scaling was applied).
    pub weight_min: f64,
    /// Upper bound (`1.0` when no scaling was applied).
    pub weight_max: f64,
}

/// Rescales the weights of `points` to intensities.
///
/// Returns `None` for an empty sample. Non-finite weights are left out of
/// the bounds and always map to `1.0`.
#[must_use]
pub fn normalize_weights(points: &[SampledPoint]) -> Option<Normalized> {
    if points.is_empty() {
        return None;
    }

    let bounds = points
        .iter()
        .map(|p| p.weight)
        .filter(|w| w.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, w| match acc {
            None => Some((w, w)),
            Some((lo, hi)) => Some((lo.min(w), hi.max(w))),
        });

    let scale = bounds.filter(|(lo, hi)| lo.is_finite() && hi.is_finite() && lo < hi);

    let Some((weight_min, weight_max)) = scale else {
        return Some(Normalized {
            points: points.iter().map(|p| [p.lat, p.lon, 1.0]).collect(),
            weight_min: 1.0,
            weight_max: 1.0,
        });
    };

    let span = weight_max - weight_min;
    let points = points
        .iter()
        .map(|p| {
            let intensity = if p.weight.is_finite() {
                ((p.weight - weight_min) / span).clamp(MIN_INTENSITY, 1.0)
            } else {
                1.0
            };
            [p.lat, p.lon, intensity]
        })
        .collect();

    Some(Normalized {
        points,
        weight_min,
        weight_max,
    })
}

/// Builds the response for a finished pass.
#[must_use]
pub fn assemble(
    points: &[SampledPoint],
    total_seen: u64,
    weight_key: Option<String>,
    file: &str,
    max: usize,
    method: SamplingMethod,
) -> HeatPointsResponse {
    let (points, weight_min, weight_max) = match normalize_weights(points) {
        Some(n) => (n.points, Some(n.weight_min), Some(n.weight_max)),
        None => (Vec::new(), None, None),
    };

    HeatPointsResponse {
        count: points.len(),
        points,
        weight_key,
        total: total_seen,
        weight_min,
        weight_max,
        file: file.to_string(),
        max,
        method,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(weights: &[f64]) -> Vec<SampledPoint> {
        weights
            .iter()
            .map(|&weight| SampledPoint {
                lat: 54.0,
                lon: 25.0,
                weight,
            })
            .collect()
    }

    fn intensities(n: &Normalized) -> Vec<f64> {
        n.points.iter().map(|p| p[2]).collect()
    }

    #[test]
    fn scales_linearly_with_floor() {
        let n = normalize_weights(&weighted(&[10.0, 20.0, 30.0])).unwrap();
        let got = intensities(&n);
        assert!((got[0] - 0.1).abs() < 1e-12);
        assert!((got[1] - 0.5).abs() < 1e-12);
        assert!((got[2] - 1.0).abs() < 1e-12);
        assert!((n.weight_min - 10.0).abs() < f64::EPSILON);
        assert!((n.weight_max - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn equal_weights_get_full_intensity() {
        let n = normalize_weights(&weighted(&[5.0, 5.0, 5.0])).unwrap();
        assert_eq!(intensities(&n), vec![1.0, 1.0, 1.0]);
        assert!((n.weight_min - 1.0).abs() < f64::EPSILON);
        assert!((n.weight_max - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn non_finite_weights_are_excluded_from_bounds() {
        let n = normalize_weights(&weighted(&[0.0, f64::NAN, 100.0, f64::INFINITY])).unwrap();
        assert_eq!(intensities(&n), vec![0.1, 1.0, 1.0, 1.0]);
        assert!(n.weight_min.abs() < f64::EPSILON);
        assert!((n.weight_max - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn only_non_finite_weights_get_full_intensity() {
        let n = normalize_weights(&weighted(&[f64::NAN, f64::NEG_INFINITY])).unwrap();
        assert_eq!(intensities(&n), vec![1.0, 1.0]);
        assert!((n.weight_min - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn keeps_point_order_and_coordinates() {
        let points = vec![
            SampledPoint {
                lat: 1.0,
                lon: 2.0,
                weight: 3.0,
            },
            SampledPoint {
                lat: 4.0,
                lon: 5.0,
                weight: 6.0,
            },
        ];
        let n = normalize_weights(&points).unwrap();
        assert_eq!(n.points, vec![[1.0, 2.0, 0.1], [4.0, 5.0, 1.0]]);
    }

    #[test]
    fn empty_sample_has_no_bounds() {
        assert!(normalize_weights(&[]).is_none());

        let response = assemble(&[], 0, None, "empty.geojson", 100, SamplingMethod::First);
        assert_eq!(response.count, 0);
        assert!(response.points.is_empty());
        assert_eq!(response.total, 0);
        assert_eq!(response.weight_key, None);
        assert_eq!(response.weight_min, None);
        assert_eq!(response.weight_max, None);
        assert_eq!(response.method, SamplingMethod::First);
    }

    #[test]
    fn assembles_full_response() {
        let response = assemble(
            &weighted(&[1.0, 3.0]),
            7,
            Some("pop".to_string()),
            "a.geojson",
            2,
            SamplingMethod::Reservoir,
        );
        assert_eq!(response.count, 2);
        assert_eq!(response.total, 7);
        assert_eq!(response.weight_key.as_deref(), Some("pop"));
        assert_eq!(response.weight_min, Some(1.0));
        assert_eq!(response.weight_max, Some(3.0));
        assert_eq!(response.file, "a.geojson");
        assert_eq!(response.max, 2);
    }
}
