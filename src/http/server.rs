//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, limits, request ID, sessions, headers)
//! - Bind server to listener
//! - Run the idle-session sweeper
//! - Shut down gracefully on signal

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::api;
use crate::config::BlogConfig;
use crate::db::{BlogStore, Database, MemoryDatabase};
use crate::http::files;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::observability::metrics;
use crate::security::{headers, limits};
use crate::session::{session_middleware, SessionStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: BlogStore,
    pub sessions: SessionStore,
    pub config: Arc<BlogConfig>,
}

/// HTTP server for the blog.
pub struct HttpServer {
    router: Router,
    config: Arc<BlogConfig>,
    sessions: SessionStore,
}

impl HttpServer {
    /// Create a server backed by an in-memory database.
    pub fn new(config: BlogConfig) -> Self {
        Self::with_database(config, Arc::new(MemoryDatabase::new()))
    }

    /// Create a server backed by the given database.
    pub fn with_database(config: BlogConfig, db: Arc<dyn Database>) -> Self {
        let config = Arc::new(config);
        let sessions = SessionStore::new(&config.session);

        let state = AppState {
            store: BlogStore::new(db),
            sessions: sessions.clone(),
            config: config.clone(),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            sessions,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &BlogConfig, state: AppState) -> Router {
        let app = api::routes()
            .route("/", get(files::index))
            .route("/{filename}", get(files::public_file))
            .route("/uploads/{filename}", get(files::upload_file))
            .fallback(files::not_found)
            .layer(middleware::from_fn_with_state(
                state.sessions.clone(),
                session_middleware,
            ))
            .with_state(state);

        let app = limits::with_body_limit(app, config.security.max_body_size);
        let app = if config.security.enable_headers {
            headers::with_security_headers(app)
        } else {
            app
        };

        app.layer(middleware::from_fn(metrics::track_requests))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::map_response(api::error::json_error_bodies))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for serving or for in-process requests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let sweeper = tokio::spawn(sweep_sessions(
            self.sessions.clone(),
            sweep_period(self.config.session.sweep_interval_secs),
        ));

        let result = axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        sweeper.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

/// `tokio::time::interval` panics on a zero period.
fn sweep_period(secs: u64) -> Duration {
    if secs == 0 {
        tracing::warn!("session.sweep_interval_secs is 0, sweeping every second");
    }
    Duration::from_secs(secs.max(1))
}

/// Periodically drop idle sessions.
async fn sweep_sessions(sessions: SessionStore, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let purged = sessions.purge_expired();
        if purged > 0 {
            tracing::debug!(purged, remaining = sessions.len(), "Idle sessions purged");
        }
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "Internal server error" })),
    )
        .into_response()
}
