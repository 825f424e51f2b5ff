use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::PathRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    application::{error::HttpError, operations::OperationService},
    domain::entities::UserRecord,
    presentation::views::{IndexTemplate, IndexView, render_template_response},
};

use super::middleware::{log_responses, set_request_context};

const DEFAULT_PARAM: &str = "default";
const CACHE_CLEARED: &str = "Caché completamente limpiada";

#[derive(Clone)]
pub struct HttpState {
    pub operations: Arc<OperationService>,
}

impl HttpState {
    pub fn new(operations: Arc<OperationService>) -> Self {
        Self { operations }
    }
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/operation", get(operation))
        .route("/user/{id}", get(user))
        .route("/clear_cache", get(clear_cache))
        .route("/_health", get(health))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OperationQuery {
    param: Option<String>,
}

#[derive(Debug, Serialize)]
struct OperationResponse {
    result: String,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct UserResponse {
    data: UserRecord,
    source: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn index(State(state): State<HttpState>) -> Response {
    let view = IndexView::from(state.operations.config());
    render_template_response(IndexTemplate { view }, StatusCode::OK)
}

async fn operation(
    State(state): State<HttpState>,
    Query(query): Query<OperationQuery>,
) -> Response {
    let param = query.param.unwrap_or_else(|| DEFAULT_PARAM.to_string());

    match state.operations.heavy_operation(&param).await {
        Ok((result, source)) => Json(OperationResponse {
            result,
            source: source.label(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Ids are plain decimal digits: no sign, no whitespace.
fn parse_user_id(raw: &str) -> Result<u64, String> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("`{raw}` is not an unsigned decimal id"));
    }
    raw.parse::<u64>()
        .map_err(|err| format!("`{raw}` is out of range: {err}"))
}

async fn user(
    State(state): State<HttpState>,
    raw_id: Result<Path<String>, PathRejection>,
) -> Response {
    let parsed = match raw_id {
        Ok(Path(raw)) => parse_user_id(&raw),
        Err(rejection) => Err(rejection.body_text()),
    };
    let user_id = match parsed {
        Ok(user_id) => user_id,
        Err(detail) => {
            return HttpError::new(
                "infra::http::public::user",
                StatusCode::BAD_REQUEST,
                "User id must be an integer",
                detail,
            )
            .into_response();
        }
    };

    match state.operations.user_data(user_id).await {
        Ok((data, source)) => Json(UserResponse {
            data,
            source: source.label(),
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn clear_cache(State(state): State<HttpState>) -> Response {
    match state.operations.clear_cache().await {
        Ok(()) => Json(StatusResponse {
            status: CACHE_CLEARED,
        })
        .into_response(),
        Err(err) => err.into_response(),
    }
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_are_bare_digits() {
        assert_eq!(parse_user_id("42"), Ok(42));
        assert_eq!(parse_user_id("007"), Ok(7));
        assert!(parse_user_id("-5").is_err());
        assert!(parse_user_id("+5").is_err());
        assert!(parse_user_id(" 5").is_err());
        assert!(parse_user_id("").is_err());
        assert!(parse_user_id("99999999999999999999999").is_err());
    }
}
