use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, candidates, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Welcome to the talent catalog API" }))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .merge(users::router())
        .merge(candidates::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
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
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;

    async fn send(req: Request<Body>) -> axum::response::Response {
        build_app(AppState::fake()).oneshot(req).await.unwrap()
    }

    async fn detail(res: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["detail"].as_str().unwrap_or_default().to_string()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_and_root_answer() {
        let res = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = send(Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn me_without_token_is_unauthorized() {
        let res = send(Request::get("/me").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
    }

    #[tokio::test]
    async fn candidates_reject_garbage_token() {
        let req = Request::get("/candidates")
            .header(header::AUTHORIZATION, "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let res = send(req).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn candidates_reject_expired_token() {
        let state = AppState::fake();
        let token = JwtKeys::from_config(&state.config.jwt)
            .issue("ada@example.com", Some(time::Duration::minutes(-5)))
            .unwrap();
        let req = Request::delete("/candidates/1/purge")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn register_rejects_bad_email() {
        let res = send(post_json(
            "/users",
            serde_json::json!({ "name": "Ada", "email": "not-an-email", "password": "Secur3P@ss" }),
        ))
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(res).await, "Invalid email");
    }

    #[tokio::test]
    async fn register_rejects_short_password() {
        let res = send(post_json(
            "/users",
            serde_json::json!({ "name": "Ada", "email": "ada@example.com", "password": "short" }),
        ))
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(res).await, "Password too short");
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let res = send(Request::get("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
