use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, boards, categories, config::AppConfig, goals, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(boards::router())
                .merge(categories::router())
                .merge(goals::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
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
        http::{header, Method, Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn send(method: Method, uri: &str, body: Option<&str>) -> StatusCode {
        let mut req = Request::builder().method(method).uri(uri);
        if body.is_some() {
            req = req.header(header::CONTENT_TYPE, "application/json");
        }
        let req = req
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        build_app(AppState::fake()).oneshot(req).await.unwrap().status()
    }

    #[tokio::test]
    async fn health() {
        assert_eq!(send(Method::GET, "/api/v1/health", None).await, StatusCode::OK);
    }

    async fn send_authed(method: Method, uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        use axum::extract::FromRef;

        let state = AppState::fake();
        let token = auth::services::JwtKeys::from_ref(&state)
            .sign_access(uuid::Uuid::new_v4())
            .unwrap();
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn wrongly_typed_input_is_a_field_error() {
        let board = uuid::Uuid::new_v4();
        let cases = [
            (Method::POST, "/api/v1/goals/goal/create".to_string(), r#"{"title": 123}"#, "title"),
            (
                Method::POST,
                "/api/v1/goals/goal_category/create".to_string(),
                r#"{"title": ["Health"], "board": 1}"#,
                "title",
            ),
            (
                Method::PUT,
                format!("/api/v1/goals/board/{board}/participants"),
                r#"{"role": "admin"}"#,
                "role",
            ),
            (Method::GET, "/api/v1/goals/goal/list?limit=abc".to_string(), "", "limit"),
            (Method::GET, "/api/v1/goals/goal_category/list?offset=x".to_string(), "", "offset"),
        ];
        for (method, uri, body, field) in cases {
            let (status, json) = send_authed(method.clone(), &uri, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            assert!(json["fields"][field].is_array(), "{method} {uri}: {json}");
        }
    }

    #[tokio::test]
    async fn goal_and_category_endpoints_require_auth() {
        let id = uuid::Uuid::new_v4();
        let cases = [
            (Method::POST, "/api/v1/goals/goal_category/create".to_string(), Some(r#"{"title":"Health"}"#)),
            (Method::GET, "/api/v1/goals/goal_category/list".to_string(), None),
            (Method::GET, format!("/api/v1/goals/goal_category/{id}"), None),
            (Method::PATCH, format!("/api/v1/goals/goal_category/{id}"), Some(r#"{"title":"x"}"#)),
            (Method::DELETE, format!("/api/v1/goals/goal_category/{id}"), None),
            (Method::POST, "/api/v1/goals/goal/create".to_string(), Some(r#"{"title":"Run 5k"}"#)),
            (Method::GET, "/api/v1/goals/goal/list".to_string(), None),
            (Method::GET, format!("/api/v1/goals/goal/{id}"), None),
            (Method::PUT, format!("/api/v1/goals/goal/{id}"), Some(r#"{"title":"x"}"#)),
            (Method::DELETE, format!("/api/v1/goals/goal/{id}"), None),
            (Method::POST, "/api/v1/goals/board/create".to_string(), Some(r#"{"title":"Home"}"#)),
            (Method::DELETE, format!("/api/v1/goals/board/{id}"), None),
            (Method::GET, "/api/v1/me".to_string(), None),
        ];
        for (method, uri, body) in cases {
            assert_eq!(
                send(method.clone(), &uri, body).await,
                StatusCode::UNAUTHORIZED,
                "{method} {uri}"
            );
        }
    }
}
