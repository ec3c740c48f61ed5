//! Route definitions for the Warden web server

use crate::{handlers, AppState};
use axum::{
    routing::{delete, get, post, put},
    Router,
};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Self-service authentication
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/password/change", post(handlers::auth::change_password))
        .route(
            "/auth/password/reset/request",
            post(handlers::auth::request_password_reset),
        )
        .route(
            "/auth/password/reset/confirm",
            post(handlers::auth::reset_password),
        )
        .route(
            "/auth/email/verify/request",
            post(handlers::auth::request_email_verification),
        )
        .route(
            "/auth/email/verify/confirm",
            post(handlers::auth::verify_email),
        )
        // User administration
        .route("/users", get(handlers::users::list))
        .route("/users", post(handlers::users::create))
        .route("/users/{id}", get(handlers::users::get))
        .route("/users/{id}", put(handlers::users::update))
        .route("/users/{id}", delete(handlers::users::delete))
        .route(
            "/users/{id}/roles/{role_id}",
            post(handlers::users::assign_role),
        )
        .route(
            "/users/{id}/roles/{role_id}",
            delete(handlers::users::remove_role),
        )
        // Role administration
        .route("/roles", get(handlers::roles::list))
        .route("/roles", post(handlers::roles::create))
        .route("/roles/{id}", get(handlers::roles::get))
        .route("/roles/{id}", put(handlers::roles::update))
        .route("/roles/{id}", delete(handlers::roles::delete))
        .route(
            "/roles/{id}/permissions/{permission_id}",
            post(handlers::roles::assign_permission),
        )
        .route(
            "/roles/{id}/permissions/{permission_id}",
            delete(handlers::roles::remove_permission),
        )
        // Permission administration
        .route("/permissions", get(handlers::permissions::list))
        .route("/permissions", post(handlers::permissions::create))
        .route("/permissions/{id}", get(handlers::permissions::get))
        .route("/permissions/{id}", put(handlers::permissions::update))
        .route("/permissions/{id}", delete(handlers::permissions::delete))
}

#[cfg(test)]
mod tests {
    use crate::{create_app, AppState};
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use warden_auth::NewUser;

    fn app() -> (Router, AppState) {
        let state = AppState::for_tests();
        (create_app(state.clone()), state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn json_request(method: Method, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn superuser_token(app: &Router, state: &AppState) -> String {
        state
            .users
            .create(&NewUser {
                username: "root".to_string(),
                email: "root@example.com".to_string(),
                password: "root-password-1".to_string(),
                full_name: None,
                is_active: true,
                is_superuser: true,
            })
            .await
            .unwrap();

        let (status, body) = send(
            app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "identifier": "root", "password": "root-password-1" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_check_works() {
        let (app, _) = app();
        let (status, body) = send(&app, get_request("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn health_identifies_caller_only_with_valid_token() {
        let (app, state) = app();

        // anonymous
        let (status, body) = send(&app, get_request("/api/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["authenticated_as"].is_null());

        // garbage token degrades to anonymous instead of failing
        let (status, body) = send(&app, get_request("/api/health", Some("not-a-token"))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["authenticated_as"].is_null());

        // valid token names the caller
        let token = superuser_token(&app, &state).await;
        let (status, body) = send(&app, get_request("/api/health", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated_as"], "root");
    }

    #[tokio::test]
    async fn me_requires_a_token() {
        let (app, _) = app();
        let (status, body) = send(&app, get_request("/api/auth/me", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_token");
    }

    #[tokio::test]
    async fn register_login_me_roundtrip() {
        let (app, _) = app();

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "alice-password-1"
                }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["username"], "alice");
        assert!(body.get("password_hash").is_none());

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "identifier": "alice", "password": "alice-password-1" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "bearer");
        let token = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get_request("/api/auth/me", Some(&token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["username"], "alice");
    }

    #[tokio::test]
    async fn bad_login_is_uniform_401() {
        let (app, _) = app();
        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "identifier": "ghost", "password": "whatever-123" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid_credentials");
    }

    #[tokio::test]
    async fn short_password_is_rejected() {
        let (app, _) = app();
        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({
                    "username": "bob",
                    "email": "bob@example.com",
                    "password": "short"
                }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let (app, state) = app();
        let token = superuser_token(&app, &state).await;

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/refresh",
                json!({ "refresh_token": token }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_api_enforces_permissions() {
        let (app, state) = app();

        // regular user without any roles
        send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({
                    "username": "carol",
                    "email": "carol@example.com",
                    "password": "carol-password-1"
                }),
                None,
            ),
        )
        .await;
        let (_, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "identifier": "carol", "password": "carol-password-1" }),
                None,
            ),
        )
        .await;
        let carol = body["access_token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, get_request("/api/users", Some(&carol))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "permission_denied");

        // superuser bypasses the permission check
        let root = superuser_token(&app, &state).await;
        let (status, _) = send(&app, get_request("/api/users", Some(&root))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn system_role_delete_is_forbidden_not_missing() {
        let (app, state) = app();
        let root = superuser_token(&app, &state).await;

        let (status, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/roles",
                json!({
                    "name": "admin",
                    "display_name": "Administrator",
                    "is_system": true
                }),
                Some(&root),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let role_id = body["id"].as_i64().unwrap();

        let (status, body) = send(
            &app,
            json_request(
                Method::DELETE,
                &format!("/api/roles/{}", role_id),
                json!({}),
                Some(&root),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "protected");

        let (status, body) = send(
            &app,
            json_request(Method::DELETE, "/api/roles/999", json!({}), Some(&root)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn duplicate_permission_conflicts() {
        let (app, state) = app();
        let root = superuser_token(&app, &state).await;

        let payload = json!({
            "name": "doc:read",
            "display_name": "Read documents",
            "resource": "doc",
            "action": "read"
        });
        let (status, _) = send(
            &app,
            json_request(Method::POST, "/api/permissions", payload.clone(), Some(&root)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            &app,
            json_request(Method::POST, "/api/permissions", payload, Some(&root)),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "conflict");
    }

    #[tokio::test]
    async fn password_reset_request_is_uniform() {
        let (app, _) = app();

        let (status, known) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/password/reset/request",
                json!({ "email": "nobody@example.com" }),
                None,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(known["message"].as_str().unwrap().contains("If the email"));
    }

    #[tokio::test]
    async fn role_grant_changes_effective_access() {
        let (app, state) = app();
        let root = superuser_token(&app, &state).await;

        // carol, initially without access to the user list
        send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/register",
                json!({
                    "username": "carol",
                    "email": "carol@example.com",
                    "password": "carol-password-1"
                }),
                None,
            ),
        )
        .await;
        let (_, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/auth/login",
                json!({ "identifier": "carol", "password": "carol-password-1" }),
                None,
            ),
        )
        .await;
        let carol_token = body["access_token"].as_str().unwrap().to_string();
        let carol_id = body["user"]["id"].as_i64().unwrap();

        let (status, _) = send(&app, get_request("/api/users", Some(&carol_token))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // grant a role carrying user:read
        let (_, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/permissions",
                json!({
                    "name": "user:read",
                    "display_name": "Read users",
                    "resource": "user",
                    "action": "read"
                }),
                Some(&root),
            ),
        )
        .await;
        let perm_id = body["id"].as_i64().unwrap();

        let (_, body) = send(
            &app,
            json_request(
                Method::POST,
                "/api/roles",
                json!({ "name": "auditor", "display_name": "Auditor" }),
                Some(&root),
            ),
        )
        .await;
        let role_id = body["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                &format!("/api/roles/{}/permissions/{}", role_id, perm_id),
                json!({}),
                Some(&root),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(
            &app,
            json_request(
                Method::POST,
                &format!("/api/users/{}/roles/{}", carol_id, role_id),
                json!({}),
                Some(&root),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // the grant is visible on the next request, no re-login needed
        let (status, _) = send(&app, get_request("/api/users", Some(&carol_token))).await;
        assert_eq!(status, StatusCode::OK);
    }
}
