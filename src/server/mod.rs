//! HTTP API for factories and operators.
//!
//! Factories poll for work and report fulfillment over JSON. Read-only
//! listings expose the queue, recent requests and active factories.

mod handlers;
mod routes;

pub use routes::create_router;

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;

use crate::auth::PasswordVerifier;
use crate::config::Settings;
use crate::repository::util::redact_url_password;
use crate::repository::{DbContext, DieselFactoryRepository, DieselRequestRepository};
use crate::services::PollService;
use crate::work_queue::DbWorkQueue;

/// Shared state for the web server.
#[derive(Clone)]
pub struct AppState {
    pub poll: PollService,
    pub factories: DieselFactoryRepository,
    pub requests: DieselRequestRepository,
    pub lease: Duration,
}

impl AppState {
    pub fn new(ctx: &DbContext, settings: &Settings) -> Self {
        let lease = settings.lease();
        let queue = Arc::new(DbWorkQueue::new(ctx.requests(), lease));
        let poll = PollService::new(ctx, queue, Arc::new(PasswordVerifier))
            .with_release_on_browser_mismatch(settings.release_on_browser_mismatch);

        Self {
            poll,
            factories: ctx.factories(),
            requests: ctx.requests(),
            lease,
        }
    }
}

/// Start the web server.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    tracing::info!(
        "Using database {}",
        redact_url_password(&settings.database_url())
    );
    ctx.init_schema().await?;

    let app = create_router(AppState::new(&ctx, settings));

    let addr: SocketAddr = settings.bind_addr().parse()?;
    tracing::info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::Utc;
    use tempfile::tempdir;
    use tower::ServiceExt;

    use crate::auth::hash_password;
    use crate::models::{ColorDepth, NewBrowser, NewFactory, NewRequestGroup, ScreenSize};

    async fn setup_test_app() -> (axum::Router, DbContext, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let ctx = DbContext::from_sqlite_path(&dir.path().join("test.db"));
        ctx.init_schema().await.unwrap();

        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        let app = create_router(AppState::new(&ctx, &settings));
        (app, ctx, dir)
    }

    async fn add_factory(ctx: &DbContext, name: &str) {
        let factories = ctx.factories();
        let factory = factories
            .create(
                &NewFactory {
                    name: name.to_string(),
                    operating_system: "linux".to_string(),
                    password_hash: Some(hash_password("secret")),
                },
                Utc::now(),
            )
            .await
            .unwrap();
        factories
            .add_screen_size(factory.id, ScreenSize { width: 1024, height: 768 })
            .await
            .unwrap();
        factories
            .add_color_depth(factory.id, ColorDepth { bits_per_pixel: 24 })
            .await
            .unwrap();
        factories
            .add_browser(factory.id, &NewBrowser::new("Firefox", "2.0", 2, 0))
            .await
            .unwrap();
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _ctx, _dir) = setup_test_app().await;

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_poll_empty_queue() {
        let (app, ctx, _dir) = setup_test_app().await;
        add_factory(&ctx, "shot01").await;

        let response = app
            .oneshot(post_json(
                "/api/poll",
                serde_json::json!({"factory": "shot01", "credential": "secret"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["fault"], 204);
        assert_eq!(json["error"], "no_matching_request");
    }

    #[tokio::test]
    async fn test_poll_bad_credential() {
        let (app, ctx, _dir) = setup_test_app().await;
        add_factory(&ctx, "shot01").await;

        let response = app
            .oneshot(post_json(
                "/api/poll",
                serde_json::json!({"factory": "shot01", "credential": "wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["fault"], 401);
    }

    #[tokio::test]
    async fn test_poll_and_fulfill() {
        let (app, ctx, _dir) = setup_test_app().await;
        add_factory(&ctx, "shot01").await;
        let now = Utc::now();
        ctx.requests()
            .submit(
                &NewRequestGroup::new("http://example.com/", now + Duration::minutes(30))
                    .browser("Firefox".parse().unwrap()),
                0,
                now,
            )
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/poll",
                serde_json::json!({"factory": "shot01", "credential": "secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let assignment = body_json(response).await;
        assert_eq!(assignment["browser"], "Firefox");
        assert_eq!(assignment["width"], 1024);
        assert_eq!(assignment["bpp"], 24);

        let id = assignment["request"].as_i64().unwrap();
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/requests/{}/fulfill", id),
                serde_json::json!({"factory": "shot01", "credential": "secret"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/api/queue").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let stats = body_json(response).await;
        assert_eq!(stats["fulfilled"], 1);
        assert_eq!(stats["pending"], 0);

        let response = app
            .oneshot(Request::builder().uri("/api/factories").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let factories = body_json(response).await;
        assert_eq!(factories.as_array().unwrap().len(), 1);
        assert_eq!(factories[0]["name"], "shot01");
    }

    #[tokio::test]
    async fn test_recent_requests() {
        let (app, ctx, _dir) = setup_test_app().await;
        let now = Utc::now();
        ctx.requests()
            .submit(
                &NewRequestGroup::new("http://example.com/", now + Duration::minutes(30))
                    .browser("Firefox".parse().unwrap())
                    .browser("Opera:9".parse().unwrap()),
                0,
                now,
            )
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/requests?limit=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["status"], "pending");
        assert_eq!(json[0]["website"], "http://example.com/");
    }
}
