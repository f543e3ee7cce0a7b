use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::*;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use crate::engine::{ReservationEngine, ReserveCommand};
use crate::store::SeatStore;

#[derive(Clone)]
pub struct AppState {
    pub engine: ReservationEngine,
}

#[derive(Debug, Deserialize)]
pub struct ReserveRequest {
    #[serde(default)]
    pub row: Option<CoordinateInput>,
    #[serde(default)]
    pub col: Option<CoordinateInput>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct ReserveResponse {
    pub message: String,
    pub seat: SeatView,
}

#[derive(Debug, Deserialize)]
pub struct LookupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct LookupResponse {
    pub message: String,
    pub seats: Vec<SeatView>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub message: String,
    pub reset: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub kind: &'static str,
    pub retryable: bool,
}

/// Reservation failure on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError(ReservationError);

impl From<ReservationError> for ApiError {
    fn from(err: ReservationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status = match &err {
            ReservationError::Validation(_) => StatusCode::BAD_REQUEST,
            ReservationError::NotFound(_) => StatusCode::NOT_FOUND,
            ReservationError::AlreadyReserved(_) => StatusCode::BAD_REQUEST,
            ReservationError::TransientFailure => StatusCode::CONFLICT,
            ReservationError::Store(e) => {
                tracing::error!("Seat store error: {:#}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = match &err {
            ReservationError::Store(_) => "seat store unavailable".to_string(),
            other => other.to_string(),
        };
        let body = ErrorResponse {
            message,
            kind: err.kind(),
            retryable: err.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn cors_layer(origin: Option<HeaderValue>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin {
        Some(origin) => cors.allow_origin(origin),
        None => cors.allow_origin(Any),
    }
}

pub fn create_router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/seats", get(list_seats))
        .route("/reserve", post(reserve_seat))
        .route("/lookup", post(lookup_reservations))
        .route("/admin/reset", post(reset_seats))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

pub async fn list_seats(State(state): State<AppState>) -> ApiResult<Vec<SeatView>> {
    let seats = state.engine.list_seats().await?;
    Ok(Json(seats))
}

pub async fn reserve_seat(
    State(state): State<AppState>,
    Json(request): Json<ReserveRequest>,
) -> ApiResult<ReserveResponse> {
    let command = ReserveCommand {
        row: request.row,
        col: request.col,
        name: request.name,
        phone: request.phone,
    };

    let seat = state.engine.reserve(command).await?;
    Ok(Json(ReserveResponse {
        message: "Reservation succeeded".to_string(),
        seat,
    }))
}

pub async fn lookup_reservations(
    State(state): State<AppState>,
    Json(request): Json<LookupRequest>,
) -> ApiResult<LookupResponse> {
    let seats = state
        .engine
        .lookup_reservations(&request.name, &request.phone)
        .await?;

    let message = if seats.is_empty() {
        "No reservations found"
    } else {
        "Reservations found"
    };
    Ok(Json(LookupResponse {
        message: message.to_string(),
        seats,
    }))
}

pub async fn reset_seats(State(state): State<AppState>) -> ApiResult<ResetResponse> {
    let reset = state.engine.reset_all().await?;
    Ok(Json(ResetResponse {
        message: format!("{} seats reset to available", reset),
        reset,
    }))
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.engine.store().count().await {
        Ok(seat_count) => (
            StatusCode::OK,
            Json(serde_json::json!({"status": "healthy", "seat_count": seat_count})),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {:#}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"status": "unhealthy", "error": e.to_string()})),
            )
        }
    }
}
