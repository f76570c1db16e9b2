mod helpers;

#[cfg(test)]
mod tests {
    use api::auth::CallerRole;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use db::models::qr_token::{Column as TokenCol, Entity as TokenEntity};
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use tower::ServiceExt;

    use crate::helpers::app::{bearer, make_test_app, read_json, seed_class};

    fn issue_req(session_id: i64, auth: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/qr/sessions/{session_id}/token"))
            .header("Content-Type", "application/json");
        if let Some(auth) = auth {
            builder = builder.header("Authorization", auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn revoke_req(secret: &str, auth: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/qr/tokens/{secret}/revoke"))
            .header("Authorization", auth)
            .header("Content-Type", "application/json")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn issue_token_as_teacher() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Teacher);

        let resp = app
            .clone()
            .oneshot(issue_req(seed.session.id, Some(&auth), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let json = read_json(resp).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["session_id"], seed.session.id);
        assert_eq!(json["data"]["revoked"], false);
        assert_eq!(json["data"]["secret"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn issue_token_requires_auth() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;

        let resp = app
            .clone()
            .oneshot(issue_req(seed.session.id, None, serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let json = read_json(resp).await;
        assert_eq!(json["error_kind"], "Unauthorized");
    }

    #[tokio::test]
    async fn issue_token_forbidden_for_student() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.students[0].id, CallerRole::Student);

        let resp = app
            .clone()
            .oneshot(issue_req(seed.session.id, Some(&auth), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = read_json(resp).await;
        assert_eq!(json["error_kind"], "Forbidden");
    }

    #[tokio::test]
    async fn issue_token_unknown_session() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Staff);

        let resp = app
            .clone()
            .oneshot(issue_req(9999, Some(&auth), serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let json = read_json(resp).await;
        assert_eq!(json["error_kind"], "NotFound");
    }

    #[tokio::test]
    async fn issue_token_rejects_out_of_range_ttl() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Teacher);

        let resp = app
            .clone()
            .oneshot(issue_req(
                seed.session.id,
                Some(&auth),
                serde_json::json!({ "ttl_seconds": 5 }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reissue_marks_previous_token_revoked() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Teacher);

        let first = read_json(
            app.clone()
                .oneshot(issue_req(seed.session.id, Some(&auth), serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;
        let second = read_json(
            app.clone()
                .oneshot(issue_req(seed.session.id, Some(&auth), serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;

        let first_secret = first["data"]["secret"].as_str().unwrap();
        assert_ne!(first_secret, second["data"]["secret"].as_str().unwrap());

        let stored = TokenEntity::find()
            .filter(TokenCol::Secret.eq(first_secret))
            .one(state.db())
            .await
            .unwrap()
            .expect("first token still stored");
        assert!(stored.revoked);
    }

    #[tokio::test]
    async fn revoke_token_is_idempotent() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Teacher);

        let issued = read_json(
            app.clone()
                .oneshot(issue_req(seed.session.id, Some(&auth), serde_json::json!({})))
                .await
                .unwrap(),
        )
        .await;
        let secret = issued["data"]["secret"].as_str().unwrap().to_string();

        let resp = app.clone().oneshot(revoke_req(&secret, &auth)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        assert_eq!(json["data"]["revoked"], true);

        // second revoke still acks
        let resp = app.clone().oneshot(revoke_req(&secret, &auth)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn revoke_unknown_token_not_found() {
        let (app, state) = make_test_app().await;
        let seed = seed_class(state.db(), 1, -5).await;
        let auth = bearer(seed.teacher.id, CallerRole::Teacher);

        let resp = app
            .clone()
            .oneshot(revoke_req("deadbeef", &auth))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
