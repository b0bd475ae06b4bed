use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{self, HeaderName, HeaderValue, Method, StatusCode, header, request::Parts},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use serde_json::{Value, json};
use time::OffsetDateTime;
use tinyauth_authn::{self as authn, AuthnError, Credentials};
use tinyauth_authz::{
    AuthzEngine, AuthzError, Decision, Permit, RequestContext, raise_on_deny, redirect_or_login,
    reject_or_401,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{config::AppConfig, guard};

pub(crate) const LOGIN_PATH: &str = "/login";

// Stand-in for the bundled frontend; real deployments put their own page
// (or SPA) in front and only keep the POST exchange.
const LOGIN_PAGE: &str = concat!(
    "<!doctype html><title>Sign in</title>",
    "<form method=\"post\" action=\"/login\">",
    "<input name=\"username\" placeholder=\"username\">",
    "<input name=\"password\" type=\"password\" placeholder=\"password\">",
    "<button>Sign in</button></form>",
);

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<AuthzEngine>,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "tinyauth server listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_credentials(true)
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::POST, Method::GET])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/", get(hello_handler))
        .route("/console", get(console_handler))
        .route("/api/status", get(status_handler))
        .route(LOGIN_PATH, get(login_page_handler).post(login_handler))
        .route("/logout", get(logout_handler))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Facts about the caller that every permission check forwards: the peer
/// address (when the transport knows it) and the raw headers in wire order.
struct ClientRequest(RequestContext);

impl<S> FromRequestParts<S> for ClientRequest
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let source_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip().to_string());
        Ok(Self(RequestContext { source_ip, headers }))
    }
}

async fn hello_handler(
    State(state): State<AppState>,
    ClientRequest(request): ClientRequest,
) -> Result<&'static str, Response> {
    guard::apply(reject_or_401(
        state
            .engine
            .authorize(Permit::new("HelloWorld"), &request)
            .await,
    ))?;
    Ok("Hello World!")
}

async fn console_handler(
    State(state): State<AppState>,
    ClientRequest(request): ClientRequest,
) -> Result<Html<&'static str>, Response> {
    guard::apply(redirect_or_login(
        state
            .engine
            .authorize(Permit::new("ViewConsole").resource("console", ""), &request)
            .await,
    ))?;
    Ok(Html("<h1>Console</h1>"))
}

async fn status_handler(
    State(state): State<AppState>,
    ClientRequest(request): ClientRequest,
) -> Result<Json<Decision>, Response> {
    let decision = guard::apply(raise_on_deny(
        state
            .engine
            .authorize(Permit::new("GetStatus"), &request)
            .await,
    ))?;
    Ok(Json(decision))
}

async fn login_page_handler() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(credentials): Json<Credentials>,
) -> Result<(CookieJar, Json<Value>), Response> {
    let tokens = authn::exchange(state.engine.client(), &credentials)
        .await
        .map_err(|err| match err {
            AuthnError::Rejected(body) => {
                (StatusCode::UNAUTHORIZED, Json(Value::Object(body))).into_response()
            }
            AuthnError::Transport(err) => HttpError::from(err).into_response(),
        })?;

    let (session, csrf) = authn::issue_cookies(&tokens, OffsetDateTime::now_utc());
    let mut jar = jar.add(session);
    if let Some(csrf) = csrf {
        jar = jar.add(csrf);
    }
    // Signal-only body; the cookies carry the state.
    Ok((jar, Json(json!({}))))
}

async fn logout_handler(jar: CookieJar) -> (CookieJar, Response) {
    let [session, csrf] = authn::clear_cookies();
    (jar.add(session).add(csrf), found(LOGIN_PATH))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

// axum's Redirect emits 303/307/308; the login contract is a plain 302.
pub(crate) fn found(location: &'static str) -> Response {
    (
        StatusCode::FOUND,
        [(header::LOCATION, HeaderValue::from_static(location))],
    )
        .into_response()
}

#[derive(Debug)]
pub(crate) struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
        }
    }
}

impl From<AuthzError> for HttpError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied(_) => Self::new(StatusCode::UNAUTHORIZED, "authorization denied"),
            AuthzError::Unreachable(_) | AuthzError::Malformed(_) => Self::new(
                StatusCode::BAD_GATEWAY,
                "authorization service unavailable",
            ),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
