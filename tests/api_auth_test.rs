//! Integration tests for the health and auth endpoints

mod test_utils;

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::util::ServiceExt;

    use crate::test_utils::{
        FRONTEND_ORIGIN, body_to_json, body_to_string, login, session_cookie, test_app,
        test_config,
    };

    /// Tests the health endpoint needs neither config nor session
    #[tokio::test]
    async fn it_reports_health() {
        let mut config = test_config("http://127.0.0.1:9");
        config.google_client_id = None;
        let app = test_app(config);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_to_json(response.into_body()).await, serde_json::json!({"ok": true}));
    }

    /// Tests the login route redirects to the consent screen
    #[tokio::test]
    async fn it_redirects_to_consent_screen() {
        let app = test_app(test_config("https://accounts.test"));

        let response = app
            .oneshot(Request::builder().uri("/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("https://accounts.test/o/oauth2/v2/auth?"));
        assert!(location.contains("client_id=test_client_id"));
        assert!(location.contains("access_type=offline"));
        assert!(location.contains("prompt=consent"));
    }

    /// Tests the login route reports missing configuration
    #[tokio::test]
    async fn it_returns_500_for_login_without_config() {
        let mut config = test_config("https://accounts.test");
        config.google_redirect_uri = None;
        config.session_password = None;
        let app = test_app(config);

        let response = app
            .oneshot(Request::builder().uri("/auth/google").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["error"], "Missing server configuration");
        assert_eq!(
            body["missing"],
            serde_json::json!(["GOOGLE_REDIRECT_URI", "SESSION_PASSWORD"])
        );
    }

    /// Tests the callback returns 400 when code is missing
    #[tokio::test]
    async fn it_returns_400_for_missing_code() {
        let mut server = mockito::Server::new_async().await;
        let token = server.mock("POST", "/token").expect(0).create();
        let app = test_app(test_config(&server.url()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_to_string(response.into_body()).await, "Missing code");
        token.assert();
    }

    /// Tests the callback exchanges the code and sets a session cookie
    #[tokio::test]
    async fn it_signs_in_through_the_callback() {
        let mut server = mockito::Server::new_async().await;
        let app = test_app(test_config(&server.url()));

        let _exchange = crate::test_utils::mock_code_exchange(&mut server, 3600);
        let _userinfo = crate::test_utils::mock_userinfo(&mut server);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback?code=test-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], FRONTEND_ORIGIN);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Max-Age=3600"));
        // Encrypted, so the token never shows up in the clear
        assert!(!set_cookie.contains("initial-access"));

        let cookie = session_cookie(&response).unwrap();
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_to_json(response.into_body()).await,
            serde_json::json!({"authenticated": true, "email": "me@example.com"})
        );
    }

    /// Tests a zero ttl leaves the session cookie without an expiry
    #[tokio::test]
    async fn it_sets_browser_session_cookie_without_ttl() {
        let mut server = mockito::Server::new_async().await;
        let mut config = test_config(&server.url());
        config.session_ttl_seconds = 0;
        let app = test_app(config);

        let _exchange = crate::test_utils::mock_code_exchange(&mut server, 3600);
        let _userinfo = crate::test_utils::mock_userinfo(&mut server);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback?code=test-code")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("calendar_session="));
        assert!(!set_cookie.contains("Max-Age"));
    }

    /// Tests a failed code exchange surfaces the provider error
    #[tokio::test]
    async fn it_returns_500_for_rejected_code() {
        let mut server = mockito::Server::new_async().await;
        let _token = server
            .mock("POST", "/token")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "invalid_grant", "error_description": "Bad Request"}"#)
            .create();
        let app = test_app(test_config(&server.url()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/google/callback?code=stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(session_cookie(&response).is_none());
        let body = body_to_json(response.into_body()).await;
        assert_eq!(body["error"], "invalid_grant: Bad Request");
    }

    /// Tests identity without a session
    #[tokio::test]
    async fn it_reports_unauthenticated_without_cookie() {
        let app = test_app(test_config("http://127.0.0.1:9"));

        let response = app
            .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_to_json(response.into_body()).await,
            serde_json::json!({"authenticated": false})
        );
    }

    /// Tests a cookie that doesn't decrypt is treated as no session
    #[tokio::test]
    async fn it_ignores_tampered_cookie() {
        let app = test_app(test_config("http://127.0.0.1:9"));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::COOKIE, "calendar_session=not-encrypted")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            body_to_json(response.into_body()).await,
            serde_json::json!({"authenticated": false})
        );
    }

    /// Tests a session from another secret is not accepted
    #[tokio::test]
    async fn it_rejects_cookie_from_other_secret() {
        let mut server = mockito::Server::new_async().await;
        let app = test_app(test_config(&server.url()));
        let cookie = login(&app, &mut server, 3600).await;

        let mut other = test_config(&server.url());
        other.session_password = Some(String::from("a-different-session-password-of-32-bytes"));
        let other_app = test_app(other);

        let response = other_app
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            body_to_json(response.into_body()).await,
            serde_json::json!({"authenticated": false})
        );
    }

    /// Tests logout clears the session cookie
    #[tokio::test]
    async fn it_logs_out() {
        let mut server = mockito::Server::new_async().await;
        let app = test_app(test_config(&server.url()));
        let cookie = login(&app, &mut server, 3600).await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/auth/logout")
                    .method("POST")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let removal = response.headers()[header::SET_COOKIE].to_str().unwrap().to_string();
        assert!(removal.starts_with("calendar_session=;"));
        assert!(removal.contains("Max-Age=0"));
        assert_eq!(
            body_to_json(response.into_body()).await,
            serde_json::json!({"ok": true})
        );
    }
}
