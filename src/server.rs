use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::Next;
use actix_web::{web, HttpResponse, Responder, ResponseError};
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::models::{ChatCompletionRequest, ModelEntry, ModelList};
use crate::util::{error_response, AppState};

const ROUTES: &[&str] = &["/status", "/metrics", "/v1/models", "/v1/chat/completions"];

/// Paths excluded from the per-request access log
const QUIET_PATHS: &[&str] = &["/metrics"];

/// Configure Actix-web routes with AppState.
pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(
        web::scope("")
            .route("/status", web::get().to(status))
            .route("/metrics", web::get().to(metrics))
            .route("/v1/models", web::get().to(list_models))
            .route("/v1/chat/completions", web::post().to(chat_completions)),
    );
}

/// Malformed JSON bodies get the same error envelope as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(16 * 1024 * 1024)
        .error_handler(|err, _req| {
            let resp = error_response(StatusCode::BAD_REQUEST, "Invalid request body");
            actix_web::error::InternalError::from_response(err, resp).into()
        })
}

/// Access log and request counter. Register with `middleware::from_fn`.
pub async fn observe_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, actix_web::Error> {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = req.path().to_string();
    let peer = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("-")
        .to_string();
    let state = req.app_data::<web::Data<AppState>>().cloned();

    let res = next.call(req).await?;

    // Label by route pattern so unmatched paths do not explode cardinality.
    let route = res
        .request()
        .match_pattern()
        .unwrap_or_else(|| "unmatched".to_string());
    if let Some(state) = state {
        state.metrics.observe_request(&method, &route);
    }
    if !QUIET_PATHS.contains(&path.as_str()) {
        info!(
            method = %method,
            path = %path,
            status = res.status().as_u16(),
            time = %format!("{}ms", start.elapsed().as_millis()),
            ip = %peer,
            "request"
        );
    }
    Ok(res)
}

/// Dispatch a chat completion through the model's fallback chain.
async fn chat_completions(
    state: web::Data<AppState>,
    body: web::Json<ChatCompletionRequest>,
) -> HttpResponse {
    let request = body.into_inner();

    // Cancelled on deadline, or when this handler is dropped (client gone).
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    if let Some(timeout) = state.request_timeout {
        let token = cancel.clone();
        actix_web::rt::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => token.cancel(),
                _ = token.cancelled() => {}
            }
        });
    }

    match state.dispatcher.dispatch(&cancel, &request).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => {
            error!(
                status = e.status_code().as_u16(),
                message = %e,
                model = %request.model,
                "Failed to execute request"
            );
            e.error_response()
        }
    }
}

/// OpenAI-style listing of the model catalog.
async fn list_models(state: web::Data<AppState>) -> impl Responder {
    let data = state
        .dispatcher
        .catalog()
        .iter()
        .map(|m| ModelEntry {
            id: m.id.clone(),
            object: "model".to_string(),
            owned_by: m.provider.clone(),
        })
        .collect();
    web::Json(ModelList {
        object: "list".to_string(),
        data,
    })
}

async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    match state.metrics.render() {
        Ok(text) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(text),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics")
        }
    }
}

/// Service status endpoint exposing version, routes and config summary.
async fn status(state: web::Data<AppState>) -> impl Responder {
    web::Json(serde_json::json!({
        "name": "llm-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "routes": ROUTES,
        "config": state.config_stats,
        "registered_providers": state.dispatcher.registry().len(),
    }))
}
