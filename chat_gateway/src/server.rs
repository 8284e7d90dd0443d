//! HTTP surface: routes, middleware and process lifecycle

use std::{io, sync::Arc};

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, Request as HttpRequest, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    app_context::AppContext,
    config::{ConfigError, GatewayConfig},
    routers::{
        diagnostics, ChatModality, ImageModality, KeyCheckModality, ModalityPipeline,
        ProviderCheckModality, TranscriptionModality,
    },
};

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },

    #[error("server error: {0}")]
    Serve(io::Error),
}

#[derive(Debug)]
struct Pipelines {
    chat: ModalityPipeline,
    image: ModalityPipeline,
    transcription: ModalityPipeline,
    key_check: ModalityPipeline,
    provider_check: ModalityPipeline,
}

#[derive(Clone, Debug)]
pub struct AppState {
    pub context: Arc<AppContext>,
    pipelines: Arc<Pipelines>,
}

impl AppState {
    pub fn new(context: Arc<AppContext>) -> Self {
        let pipelines = Pipelines {
            chat: ModalityPipeline::new(Arc::new(ChatModality), &context),
            image: ModalityPipeline::new(Arc::new(ImageModality), &context),
            transcription: ModalityPipeline::new(Arc::new(TranscriptionModality), &context),
            key_check: ModalityPipeline::new(Arc::new(KeyCheckModality), &context),
            provider_check: ModalityPipeline::new(
                Arc::new(ProviderCheckModality::new(&context.config.provider)),
                &context,
            ),
        };
        Self {
            context,
            pipelines: Arc::new(pipelines),
        }
    }
}

async fn chat(State(state): State<AppState>, request: Request) -> Response {
    state.pipelines.chat.execute(request).await
}

async fn image_chat(State(state): State<AppState>, request: Request) -> Response {
    state.pipelines.image.execute(request).await
}

async fn transcribe(State(state): State<AppState>, request: Request) -> Response {
    state.pipelines.transcription.execute(request).await
}

async fn key_check(State(state): State<AppState>, request: Request) -> Response {
    state.pipelines.key_check.execute(request).await
}

async fn provider_check(State(state): State<AppState>, request: Request) -> Response {
    state.pipelines.provider_check.execute(request).await
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Build the application router with all routes and middleware
pub fn build_app(state: AppState) -> Router {
    let config = &state.context.config;
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Body limit must stay outermost: CORS and timeout require a `Default` inner body.
    let middleware = ServiceBuilder::new()
        .layer(RequestBodyLimitLayer::new(config.max_payload_size))
        .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &HttpRequest<_>| {
                let request_id = req
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default();
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::new(request_id))
        .layer(cors_layer(&config.cors_allowed_origins))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout(),
        ));

    Router::new()
        .route("/chat", post(chat))
        .route("/image-chat", post(image_chat))
        .route("/transcribe", post(transcribe))
        .route("/diagnostics/key", get(key_check))
        .route("/diagnostics/provider", get(provider_check))
        .route(
            "/diagnostics/echo",
            get(diagnostics::echo_get).post(diagnostics::echo_post),
        )
        .route("/diagnostics/image", post(diagnostics::image_info))
        .route("/health", get(health))
        .layer(middleware)
        .with_state(state)
}

/// Validate the configuration, bind, and serve until a shutdown signal.
pub async fn startup(config: GatewayConfig) -> Result<(), StartupError> {
    config.validate()?;
    let addr = config.bind_address();

    info!(
        address = %addr,
        provider_base_url = %config.provider.base_url,
        chat_model = %config.provider.chat_model,
        stream_format = config.stream_format.as_str(),
        request_timeout_secs = config.request_timeout_secs,
        max_upload_bytes = ?config.max_upload_bytes,
        "Starting chat gateway"
    );

    let context = Arc::new(AppContext::new(config)?);
    let app = build_app(AppState::new(context));

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}
