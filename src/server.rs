//! HTTP surface for the admin UI.
//!
//! `POST /api/generate-image` takes the raw input as JSON or as a form post.
//! Replies use the `{ "success": bool, "data": ... }` envelope the admin
//! scripts expect.

use crate::{
    config::ServerConfig,
    error::{ErrorKind, HandlerError},
    handler::GenerationHandler,
    models::{CallerIdentity, Capability, ErrorResponse, RawInput},
};
use actix_web::{
    http::{header::AUTHORIZATION, StatusCode},
    web, App, Either, HttpRequest, HttpResponse, HttpServer, ResponseError,
};
use serde_json::json;
use std::collections::HashMap;

pub struct AppState {
    pub handler: GenerationHandler,
    pub server: ServerConfig,
}

impl ResponseError for HandlerError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
            ErrorKind::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::GenerationFailed => StatusCode::BAD_GATEWAY,
            ErrorKind::StorageFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "data": ErrorResponse::from(self),
        }))
    }
}

type RawBody = Either<web::Json<RawInput>, web::Form<HashMap<String, String>>>;

async fn generate_image(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: RawBody,
) -> Result<HttpResponse, HandlerError> {
    let caller = caller_from_request(&req, &state.server);
    let raw = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => RawInput::from(form.into_inner()),
    };

    let success = state.handler.handle(&caller, &raw).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "data": success })))
}

async fn health(state: web::Data<AppState>) -> HttpResponse {
    match state.handler.storage().health_check().await {
        Ok(true) => HttpResponse::Ok().json(json!({ "status": "ok" })),
        Ok(false) => HttpResponse::ServiceUnavailable().json(json!({ "status": "degraded" })),
        Err(e) => HttpResponse::ServiceUnavailable()
            .json(json!({ "status": "error", "message": e.to_string() })),
    }
}

/// A bearer token equal to the configured admin token grants upload rights.
pub fn caller_from_request(req: &HttpRequest, server: &ServerConfig) -> CallerIdentity {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);

    match token {
        Some(token) if server.token_matches(token) => {
            CallerIdentity::new("admin").with_capability(Capability::Upload)
        }
        _ => CallerIdentity::anonymous(),
    }
}

/// Bodies that are not a key-value bag get the same envelope as any other
/// invalid input.
fn malformed_body(reason: impl std::fmt::Display) -> actix_web::Error {
    log::warn!("⚠️  Rejected request body: {}", reason);
    HandlerError::InvalidInput.into()
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| malformed_body(err)))
        .app_data(web::FormConfig::default().error_handler(|err, _req| malformed_body(err)))
        .route("/api/generate-image", web::post().to(generate_image))
        .route("/health", web::get().to(health));
}

pub async fn run(state: AppState) -> std::io::Result<()> {
    let port = state.server.port();
    let data = web::Data::new(state);

    log::info!("🌐 Server will run on http://0.0.0.0:{}", port);

    HttpServer::new(move || App::new().app_data(data.clone()).configure(routes))
        .bind(("0.0.0.0", port))?
        .run()
        .await
}
