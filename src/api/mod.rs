use crate::api::handlers::{auth, brands, content, dashboard, health, shoots, tasks};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{header, HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer,
    set_header::{SetRequestHeaderLayer, SetResponseHeaderLayer},
    trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod db;
pub mod handlers;

use handlers::auth::{AuthConfig, AuthState};

/// Build the application router with middleware and shared state attached.
///
/// Every response carries the hardening headers; protected routes enforce the
/// session guard themselves via the `RequireSession` extractor.
#[must_use]
pub fn app(pool: SqlitePool, auth_state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/health", get(health::health))
        .route("/setup", get(auth::setup_page).post(auth::setup))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route(
            "/change_password",
            get(auth::change_password_page).post(auth::change_password),
        )
        .route("/brands", get(brands::list).post(brands::create))
        .route("/brands/:id", get(brands::detail).post(brands::update))
        .route("/brands/:id/delete", axum::routing::post(brands::delete))
        .route("/tasks", get(tasks::board).post(tasks::create))
        .route("/tasks/:id", get(tasks::fetch))
        .route("/tasks/:id/update", axum::routing::post(tasks::update))
        .route(
            "/tasks/:id/update_status",
            axum::routing::post(tasks::update_status),
        )
        .route("/tasks/:id/delete", axum::routing::post(tasks::delete))
        .route("/shoots", get(shoots::list).post(shoots::create))
        .route("/shoots/:id", get(shoots::fetch))
        .route("/shoots/:id/update", axum::routing::post(shoots::update))
        .route("/shoots/:id/delete", axum::routing::post(shoots::delete))
        .route("/content_calendar", get(content::calendar))
        .route("/content", axum::routing::post(content::create))
        .route("/content/:id", get(content::fetch))
        .route("/content/:id/update", axum::routing::post(content::update))
        .route("/content/:id/delete", axum::routing::post(content::delete))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &Request<Body>| {
                        HeaderValue::from_str(Ulid::new().to_string().as_str()).ok()
                    },
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::X_XSS_PROTECTION,
                    HeaderValue::from_static("1; mode=block"),
                ))
                .layer(Extension(auth_state))
                .layer(Extension(pool)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, config: AuthConfig) -> Result<()> {
    let options = SqliteConnectOptions::from_str(&dsn)
        .context("Invalid database connection string")?
        .create_if_missing(true)
        .foreign_keys(true);

    // Connect to database
    let pool = SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    db::migrate(&pool).await?;

    let auth_state = Arc::new(AuthState::new(config));

    let app = app(pool, auth_state);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("Gracefully shutdown");
    })
    .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
