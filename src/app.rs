use axum::{
    http::{header, HeaderValue, Method},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, routes};

pub fn build_app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(auth::router(&state))
        .merge(routes::probes::probe_routes(&state))
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match config.cors_allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => base.allow_origin(origin),
        Err(e) => {
            tracing::warn!(error = %e, origin = %config.cors_allowed_origin, "invalid CORS origin; cross-origin requests disabled");
            base
        }
    }
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_demo_users;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use base64ct::{Base64, Encoding};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn seeded_app() -> Router {
        let state = AppState::fake();
        seed_demo_users(&state.users).await.unwrap();
        build_app(state)
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", Base64::encode_string(format!("{user}:{pass}").as_bytes()))
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str, auth: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_duplicate() {
        let app = seeded_app().await;
        let body = json!({"username": "alice", "password": "pw123", "email": "a@x.com"});

        let (status, json) = send(&app, post_json("/api/auth/register", body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "User registered successfully");
        assert_eq!(json["username"], "alice");

        let dup = json!({"username": "alice", "password": "other", "email": "b@x.com"});
        let (status, json) = send(&app, post_json("/api/auth/register", dup)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Username already exists");

        let dup_email = json!({"username": "bob", "password": "pw", "email": "a@x.com"});
        let (status, json) = send(&app, post_json("/api/auth/register", dup_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Email already exists");
    }

    #[tokio::test]
    async fn malformed_register_bodies_get_json_400() {
        let app = seeded_app().await;

        let missing_email = json!({"username": "alice", "password": "pw"});
        let (status, json) = send(&app, post_json("/api/auth/register", missing_email)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("email"));

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .body(Body::from(
                json!({"username": "alice", "password": "pw", "email": "a@x.com"}).to_string(),
            ))
            .unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn registered_user_can_log_in() {
        let app = seeded_app().await;
        let body = json!({"username": "alice", "password": "pw123", "email": "a@x.com"});
        send(&app, post_json("/api/auth/register", body)).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::AUTHORIZATION, basic("alice", "pw123"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Login successful");
        assert_eq!(json["role"], "USER");
    }

    #[tokio::test]
    async fn login_rejects_bad_password() {
        let app = seeded_app().await;
        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/login")
            .header(header::AUTHORIZATION, basic("testuser", "nope"))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn auth_test_endpoint_returns_plain_text() {
        let app = seeded_app().await;
        let res = app.oneshot(get("/api/auth/test", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"Auth endpoint is working!");
    }

    #[tokio::test]
    async fn probes_are_gated_by_role() {
        let app = seeded_app().await;

        let (status, json) = send(&app, get("/api/test/public", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "This is a public endpoint");

        let (status, _) = send(&app, get("/api/test/secured", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = Some(basic("testuser", "password123"));
        let (status, json) = send(&app, get("/api/test/secured", user.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "This is a secured endpoint");

        let (status, _) = send(&app, get("/api/test/admin", user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = Some(basic("admin", "admin123"));
        let (status, json) = send(&app, get("/api/test/admin", admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "This is an admin-only endpoint");
    }

    #[tokio::test]
    async fn user_listing_is_admin_only_and_hides_hashes() {
        let app = seeded_app().await;

        let (status, _) = send(
            &app,
            get("/api/auth/users", Some(basic("testuser", "password123"))),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) =
            send(&app, get("/api/auth/users", Some(basic("admin", "admin123")))).await;
        assert_eq!(status, StatusCode::OK);
        let users = json.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert!(users.iter().all(|u| u.get("password_hash").is_none()));
    }

    #[tokio::test]
    async fn create_admin_only_once() {
        let app = build_app(AppState::fake());

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/create-admin")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Admin user created successfully");

        let (status, _) = send(&app, get("/api/test/admin", Some(basic("admin", "admin123")))).await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::builder()
            .method("POST")
            .uri("/api/auth/create-admin")
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Admin user already exists");
    }
}
