//! Web server implementation

use axum::{
    body::Bytes,
    extract::{ConnectInfo, DefaultBodyLimit, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use netbeacon_common::api::{
    ErrorBody, HandshakePayload, ReceivedList, RegisterResponse, SendRequest, SendResponse,
};
use netbeacon_common::{AddressResolver, Error, InboundHandshake, PeerExchange};

use crate::access_log::{access_log, header_str, X_FORWARDED_FOR};
use crate::config::ServerConfig;

/// Shared request state
pub struct AppState {
    pub resolver: Arc<AddressResolver>,
    pub peers: PeerExchange,
}

/// Web server
#[derive(Clone)]
pub struct WebServer {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl WebServer {
    /// Create a server resolving addresses as `config` describes
    pub fn new(config: ServerConfig) -> anyhow::Result<Self> {
        let resolver = Arc::new(AddressResolver::from_config(&config.resolver)?);
        Self::with_resolver(config, resolver)
    }

    /// Create a server around an existing resolver
    pub fn with_resolver(config: ServerConfig, resolver: Arc<AddressResolver>) -> anyhow::Result<Self> {
        let peers = PeerExchange::new(resolver.clone(), config.peer.clone())?;
        Ok(Self {
            state: Arc::new(AppState { resolver, peers }),
            config,
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Create router
    pub fn router(&self) -> Router {
        let api = Router::new()
            .route("/api/health", get(health_handler))
            .route("/api/ip-info", get(ip_info_handler))
            .route("/api/peer/received", get(received_handler))
            .route("/api/peer/register", post(register_handler))
            .route("/api/peer/send", post(send_handler))
            .with_state(self.state.clone());

        let router = match &self.config.static_dir {
            Some(dir) => api.fallback_service(ServeDir::new(dir)),
            None => api.fallback(not_found_handler),
        };

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
                .layer(middleware::from_fn(access_log))
                .layer(DefaultBodyLimit::max(self.config.body_limit_bytes)),
        )
    }

    /// Start the web server, stopping on Ctrl-C
    pub async fn serve(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.config.listen).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve_with_shutdown<F>(
        self,
        listener: tokio::net::TcpListener,
        shutdown: F,
    ) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "NetBeacon listening on http://{} (peer port {})",
            listener.local_addr()?,
            self.config.peer.port
        );

        axum::serve(
            listener,
            self.router().into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

// ============================================================================
// Handlers
// ============================================================================

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "netbeacon-web",
        "version": netbeacon_common::VERSION,
    }))
}

async fn ip_info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.resolver.resolve_identity().await)
}

async fn received_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(ReceivedList::from(state.peers.list_received()))
}

async fn register_handler(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let payload: HandshakePayload = match body_or_default(&headers, &body) {
        Ok(payload) => payload,
        Err(rejection) => return rejection,
    };

    let registration = state.peers.register(InboundHandshake {
        from_private_ip: payload.from_private_ip,
        note: payload.note,
        client_address: connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()),
        forwarded_for: header_str(&headers, X_FORWARDED_FOR),
    });

    Json(RegisterResponse::from(registration)).into_response()
}

async fn send_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request: SendRequest = match body_or_default(&headers, &body) {
        Ok(request) => request,
        Err(rejection) => return rejection,
    };

    match state
        .peers
        .send_to(request.peer_host.as_deref(), request.note.as_deref())
        .await
    {
        Ok(receipt) => Json(SendResponse::from(receipt)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("not found")))
}

/// An empty body, or one without a JSON content type, carries no fields.
/// Anything else must parse as JSON; the extractor's rejection is returned
/// to the caller as-is.
fn body_or_default<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    body: &Bytes,
) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) || !has_json_content_type(headers) {
        return Ok(T::default());
    }

    Json::<T>::from_bytes(body)
        .map(|Json(value)| value)
        .map_err(IntoResponse::into_response)
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = header_str(headers, header::CONTENT_TYPE) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn error_status(err: &Error) -> StatusCode {
    match err {
        Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        Error::NoLocalAddress => StatusCode::INTERNAL_SERVER_ERROR,
        Error::PeerUnreachable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: Error) -> Response {
    let status = error_status(&err);
    warn!(status = status.as_u16(), "peer send failed: {}", err);
    (status, Json(ErrorBody::new(err))).into_response()
}
