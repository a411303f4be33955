//! HTTP handler functions for the heat map API.

use actix_web::{HttpResponse, web};
use heat_map_sampling::progress::null_progress;
use heat_map_sampling::{ErrorKind, HeatPointsRequest, SamplingError, sample_file};
use heat_map_sampling_models::{ApiError, ApiHealth, HeatPointsQueryParams};

use crate::AppState;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /dev/heat-points`
///
/// Streams a `GeoJSON` file from the data directory and returns a bounded,
/// deterministic sample of its points with normalized intensities.
pub async fn heat_points(
    state: web::Data<AppState>,
    params: web::Query<HeatPointsQueryParams>,
) -> HttpResponse {
    let request = match HeatPointsRequest::from_params(&params) {
        Ok(request) => request,
        Err(e) => return error_response(&e),
    };

    let file = request.file.clone();
    let path = request.path_in(&state.data_dir);
    let result = web::block(move || sample_file(&path, &request, &null_progress())).await;

    match result {
        Ok(Ok(response)) => HttpResponse::Ok().json(response),
        Ok(Err(SamplingError::NotFound(_))) => HttpResponse::NotFound().json(ApiError {
            error: format!("File not found: {file}"),
        }),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            log::error!("Sampling task failed: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: format!("Failed to process file: {e}"),
            })
        }
    }
}

/// Maps a sampling failure to its HTTP status.
fn error_response(e: &SamplingError) -> HttpResponse {
    let body = ApiError {
        error: e.to_string(),
    };
    match e.kind() {
        ErrorKind::InvalidRequest | ErrorKind::InvalidInput => {
            log::warn!("Rejected heat points request: {e}");
            HttpResponse::BadRequest().json(body)
        }
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Internal => {
            log::error!("Failed to sample heat points: {e}");
            HttpResponse::InternalServerError().json(ApiError {
                error: format!("Failed to process file: {e}"),
            })
        }
    }
}
