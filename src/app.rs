use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{recipes, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .merge(users::router())
                .merge(recipes::router())
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

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let addr: SocketAddr = addr.parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    fn get_authed(uri: &str, token: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn signup_and_login(app: &Router, email: &str, password: &str) -> String {
        let res = send(
            app,
            post_json(
                "/api/user/create",
                None,
                json!({ "email": email, "password": password, "name": "Tester test" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);

        let res = send(
            app,
            post_json(
                "/api/user/token",
                None,
                json!({ "email": email, "password": password }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
        body_json(res).await["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let res = send(&app, Request::get("/api/health").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_user_success_hides_password() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let res = send(
            &app,
            post_json(
                "/api/user/create",
                None,
                json!({ "email": "test@example.com", "password": "testpass123", "name": "Tester test" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let body = body_json(res).await;
        assert_eq!(body["email"], "test@example.com");
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());

        assert!(state
            .identity
            .authenticate("test@example.com", "testpass123")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn create_user_with_existing_email_fails() {
        let app = build_app(AppState::fake());
        let payload = json!({ "email": "test@example.com", "password": "testpass123" });
        let first = send(&app, post_json("/api/user/create", None, payload.clone())).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let second = send(&app, post_json("/api/user/create", None, payload)).await;
        assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_name_is_a_client_error() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            post_json(
                "/api/user/create",
                None,
                json!({ "email": "long@example.com", "password": "testpass123", "name": "x".repeat(300) }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let token = signup_and_login(&app, "named@example.com", "testpass123").await;
        let req = Request::patch("/api/user/me")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(json!({ "name": "x".repeat(300) }).to_string()))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(res).await["error"]
            .as_str()
            .unwrap()
            .contains("name"));
    }

    #[tokio::test]
    async fn create_user_with_short_password_fails() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        let res = send(
            &app,
            post_json(
                "/api/user/create",
                None,
                json!({ "email": "test@example.com", "password": "123" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(state
            .identity
            .authenticate("test@example.com", "123")
            .await
            .is_err());
    }

    #[tokio::test]
    async fn token_with_bad_credentials_is_refused() {
        let app = build_app(AppState::fake());
        signup_and_login(&app, "user@example.com", "goodpass").await;

        let res = send(
            &app,
            post_json(
                "/api/user/token",
                None,
                json!({ "email": "user@example.com", "password": "badpass" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(res).await;
        assert!(body.get("token").is_none());
    }

    #[tokio::test]
    async fn profile_requires_auth_and_can_be_updated() {
        let app = build_app(AppState::fake());
        let res = send(&app, Request::get("/api/user/me").body(Body::empty()).unwrap()).await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let token = signup_and_login(&app, "me@example.com", "pass123").await;
        let res = send(&app, get_authed("/api/user/me", &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["email"], "me@example.com");
        assert_eq!(body["name"], "Tester test");
        assert!(body.get("password").is_none());

        let req = Request::patch("/api/user/me")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({ "name": "Updated", "password": "newpass123" }).to_string()))
            .unwrap();
        let res = send(&app, req).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_json(res).await["name"], "Updated");

        let res = send(
            &app,
            post_json(
                "/api/user/token",
                None,
                json!({ "email": "me@example.com", "password": "newpass123" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn recipes_require_auth() {
        let app = build_app(AppState::fake());
        let res = send(
            &app,
            Request::get("/api/recipe/recipes").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn recipe_create_list_and_retrieve() {
        let app = build_app(AppState::fake());
        let token = signup_and_login(&app, "tester@example.com", "pass123").await;

        let res = send(
            &app,
            post_json(
                "/api/recipe/recipes",
                Some(&token),
                json!({ "title": "Creation test recipe", "time_minutes": 10, "price": "20.40" }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let location = res.headers()[header::LOCATION].to_str().unwrap().to_string();
        let created = body_json(res).await;
        assert_eq!(created["title"], "Creation test recipe");
        assert_eq!(created["time_minutes"], 10);
        assert_eq!(created["price"], "20.40");
        let id = created["id"].as_i64().unwrap();
        assert_eq!(location, format!("/api/recipe/recipes/{id}"));

        send(
            &app,
            post_json(
                "/api/recipe/recipes",
                Some(&token),
                json!({ "title": "Second test recipe", "time_minutes": 5, "price": 3.5 }),
            ),
        )
        .await;

        let res = send(&app, get_authed("/api/recipe/recipes", &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let list = body_json(res).await;
        let titles: Vec<&str> = list
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Second test recipe", "Creation test recipe"]);
        assert!(list[0].get("description").is_none());

        let res = send(&app, get_authed("/api/recipe/recipes?order=asc", &token)).await;
        let list = body_json(res).await;
        assert_eq!(list[0]["title"], "Creation test recipe");

        let res = send(&app, get_authed(&location, &token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let detail = body_json(res).await;
        assert_eq!(detail["id"], id);
        assert_eq!(detail["description"], "");
    }

    #[tokio::test]
    async fn recipes_of_other_users_are_invisible() {
        let app = build_app(AppState::fake());
        let owner = signup_and_login(&app, "owner@example.com", "pass123").await;
        let other = signup_and_login(&app, "new_user@example.com", "pass123").await;

        let res = send(
            &app,
            post_json(
                "/api/recipe/recipes",
                Some(&owner),
                json!({ "title": "Private", "time_minutes": 10, "price": "20.10" }),
            ),
        )
        .await;
        let id = body_json(res).await["id"].as_i64().unwrap();

        let res = send(&app, get_authed("/api/recipe/recipes", &other)).await;
        assert_eq!(body_json(res).await, json!([]));

        let uri = format!("/api/recipe/recipes/{id}");
        let res = send(&app, get_authed(&uri, &other)).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);

        let req = Request::delete(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {other}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::NOT_FOUND);

        let req = Request::delete(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {owner}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn recipe_payload_cannot_choose_owner() {
        let app = build_app(AppState::fake());
        let token = signup_and_login(&app, "a@example.com", "pass123").await;
        let res = send(
            &app,
            post_json(
                "/api/recipe/recipes",
                Some(&token),
                json!({ "title": "Sneaky", "time_minutes": 1, "price": "1.00", "user_id": 99 }),
            ),
        )
        .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn admin_listing_is_staff_only() {
        let state = AppState::fake();
        let app = build_app(state.clone());
        state
            .identity
            .create_superuser("admin@example.com", "pass123")
            .await
            .unwrap();
        let user_token = signup_and_login(&app, "user@example.com", "pass234").await;

        let res = send(&app, get_authed("/api/admin/users", &user_token)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let res = send(
            &app,
            post_json(
                "/api/user/token",
                None,
                json!({ "email": "admin@example.com", "password": "pass123" }),
            ),
        )
        .await;
        let admin_token = body_json(res).await["token"].as_str().unwrap().to_string();

        let res = send(&app, get_authed("/api/admin/users", &admin_token)).await;
        assert_eq!(res.status(), StatusCode::OK);
        let users = body_json(res).await;
        assert_eq!(users[0]["email"], "admin@example.com");
        assert_eq!(users[0]["role"], "superuser");
        assert_eq!(users[1]["email"], "user@example.com");
        assert_eq!(users[1]["name"], "Tester test");
    }
}
