//! HTTP server mode: REST API over the orchestrator

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{authenticate, Authenticator};
use crate::authz::RequestContext;
use crate::config::ServiceConfig;
use crate::database::DatabaseEngine;
use crate::error::{Error, ErrorKind, Result, ResultExt};
use crate::orchestrator::{
    CatalogRegistry, CertificateRequest, Orchestrator, TargetOfEvaluationRequest,
};
use crate::pagination::{ListRequest, Page};

/// App state shared across handlers
struct AppState {
    orchestrator: Arc<Orchestrator>,
}

/// Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// HTTP status for an error kind
pub fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        // Client closed request
        ErrorKind::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = if kind == ErrorKind::Internal {
            tracing::error!(error = %self, "Request failed");
            "internal error".to_string()
        } else {
            tracing::debug!(error = %self, "Request rejected");
            self.to_string()
        };

        (status_code(kind), Json(ApiResponse::<()>::error(message))).into_response()
    }
}

fn respond<T: Serialize>(status: StatusCode, data: T) -> Response {
    (status, Json(ApiResponse::success(data))).into_response()
}

/// `{ "<key>": [...], "next_page_token": "..." }`
fn page_response<T: Serialize>(key: &str, page: Page<T>) -> Result<Response> {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), serde_json::to_value(page.items)?);
    body.insert(
        "next_page_token".to_string(),
        Value::String(page.next_page_token),
    );
    Ok(respond(StatusCode::OK, Value::Object(body)))
}

// ============================================================================
// Setup
// ============================================================================

/// Build the router around an orchestrator
///
/// Everything below `/v1` requires authentication (when enabled);
/// `/health` does not.
pub fn build_router(orchestrator: Arc<Orchestrator>, authenticator: Arc<Authenticator>) -> Router {
    let state = Arc::new(AppState { orchestrator });

    // Build CORS layer - allow all origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route(
            "/v1/orchestrator/targets_of_evaluation",
            get(list_targets).post(create_target),
        )
        .route(
            "/v1/orchestrator/targets_of_evaluation/:id",
            get(get_target).put(update_target).delete(remove_target),
        )
        .route(
            "/v1/orchestrator/targets_of_evaluation/:id/certificates",
            get(list_target_certificates).post(create_certificate),
        )
        .route(
            "/v1/orchestrator/targets_of_evaluation/:id/certificates/:cert_id",
            get(get_certificate)
                .put(update_certificate)
                .delete(remove_certificate),
        )
        .route("/v1/orchestrator/certificates", get(list_certificates))
        .route("/v1/orchestrator/catalogs", get(list_catalogs))
        .route("/v1/orchestrator/catalogs/:id", get(get_catalog))
        .route_layer(middleware::from_fn_with_state(authenticator, authenticate));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Build the complete application from configuration
pub fn build_app(config: &ServiceConfig) -> Result<Router> {
    let db = Arc::new(DatabaseEngine::open(config.database.path.as_deref())?);
    let orchestrator = Orchestrator::new(
        db,
        config.authorization.build(),
        config.pagination,
        CatalogRegistry::new(config.catalogs.clone()),
    )?;

    if config.create_default_target {
        orchestrator.create_default_target()?;
    }

    let authenticator = Authenticator::new(
        &config.authentication,
        config.server.request_timeout(),
    )?;

    Ok(build_router(Arc::new(orchestrator), Arc::new(authenticator)))
}

/// Start the HTTP server
pub async fn serve(config: &ServiceConfig) -> Result<()> {
    let app = build_app(config)?;
    let port = config.server.port;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to port {port}"))?;

    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn list_targets(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(req): Query<ListRequest>,
) -> Result<Response> {
    let page = state
        .orchestrator
        .list_targets_of_evaluation(&ctx, &req)
        .await?;
    page_response("targets_of_evaluation", page)
}

async fn create_target(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Json(req): Json<TargetOfEvaluationRequest>,
) -> Result<Response> {
    let target = state
        .orchestrator
        .create_target_of_evaluation(&ctx, req)
        .await?;
    Ok(respond(StatusCode::CREATED, target))
}

async fn get_target(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    let target = state.orchestrator.get_target_of_evaluation(&ctx, &id).await?;
    Ok(respond(StatusCode::OK, target))
}

async fn update_target(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(req): Json<TargetOfEvaluationRequest>,
) -> Result<Response> {
    let target = state
        .orchestrator
        .update_target_of_evaluation(&ctx, &id, req)
        .await?;
    Ok(respond(StatusCode::OK, target))
}

async fn remove_target(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> Result<Response> {
    state
        .orchestrator
        .remove_target_of_evaluation(&ctx, &id)
        .await?;
    Ok(respond(StatusCode::OK, json!({ "deleted": id })))
}

async fn list_target_certificates(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(req): Query<ListRequest>,
) -> Result<Response> {
    let page = state
        .orchestrator
        .list_certificates(&ctx, Some(&id), &req)
        .await?;
    page_response("certificates", page)
}

async fn list_certificates(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Query(req): Query<ListRequest>,
) -> Result<Response> {
    let page = state
        .orchestrator
        .list_certificates(&ctx, None, &req)
        .await?;
    page_response("certificates", page)
}

async fn create_certificate(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(req): Json<CertificateRequest>,
) -> Result<Response> {
    let certificate = state
        .orchestrator
        .create_certificate(&ctx, &id, req)
        .await?;
    Ok(respond(StatusCode::CREATED, certificate))
}

async fn get_certificate(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, cert_id)): Path<(String, String)>,
) -> Result<Response> {
    let certificate = state
        .orchestrator
        .get_certificate(&ctx, &id, &cert_id)
        .await?;
    Ok(respond(StatusCode::OK, certificate))
}

async fn update_certificate(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, cert_id)): Path<(String, String)>,
    Json(req): Json<CertificateRequest>,
) -> Result<Response> {
    let certificate = state
        .orchestrator
        .update_certificate(&ctx, &id, &cert_id, req)
        .await?;
    Ok(respond(StatusCode::OK, certificate))
}

async fn remove_certificate(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, cert_id)): Path<(String, String)>,
) -> Result<Response> {
    state
        .orchestrator
        .remove_certificate(&ctx, &id, &cert_id)
        .await?;
    Ok(respond(StatusCode::OK, json!({ "deleted": cert_id })))
}

async fn list_catalogs(
    State(state): State<Arc<AppState>>,
    Query(req): Query<ListRequest>,
) -> Result<Response> {
    let page = state.orchestrator.list_catalogs(&req).await?;
    page_response("catalogs", page)
}

async fn get_catalog(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response> {
    let catalog = state.orchestrator.get_catalog(&id)?;
    Ok(respond(StatusCode::OK, catalog))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Error::malformed_token("x"), 400)]
    #[test_case(Error::invalid_order_column("x"), 400)]
    #[test_case(Error::PermissionDenied, 403)]
    #[test_case(Error::Unauthenticated, 401)]
    #[test_case(Error::not_found("certificate"), 404)]
    #[test_case(Error::DeadlineExceeded, 504)]
    #[test_case(Error::Cancelled, 499)]
    #[test_case(Error::store("boom"), 500)]
    fn test_error_status(err: Error, expected: u16) {
        assert_eq!(status_code(err.kind()).as_u16(), expected);
        assert_eq!(err.into_response().status().as_u16(), expected);
    }

    #[tokio::test]
    async fn test_serve_reports_port_in_use() {
        let taken = tokio::net::TcpListener::bind("0.0.0.0:0").await.unwrap();
        let mut config = ServiceConfig::default();
        config.server.port = taken.local_addr().unwrap().port();

        let err = serve(&config).await.unwrap_err();
        assert!(matches!(err, Error::Other(_)), "unexpected error: {err:?}");
        assert!(err
            .to_string()
            .starts_with(&format!("Failed to bind to port {}: IO error:", config.server.port)));
    }

    #[test]
    fn test_api_response_envelope() {
        let ok = serde_json::to_value(ApiResponse::success(json!({ "a": 1 }))).unwrap();
        assert_eq!(ok, json!({ "success": true, "data": { "a": 1 } }));

        let err = serde_json::to_value(ApiResponse::<()>::error("access denied")).unwrap();
        assert_eq!(err, json!({ "success": false, "error": "access denied" }));
    }
}
