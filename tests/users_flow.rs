mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn user_management_requires_admin() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;

    app.insert_user("Manager", "manager@example.com", "super-secret-1", "Manager", true)
        .await?;
    let token = app.login_token("manager@example.com", "super-secret-1").await?;

    let response = app.get("/api/users", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    app.cleanup().await
}

#[tokio::test]
async fn admin_creates_and_lists_users() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_multipart(
            "/api/users",
            &[
                ("name", "New Operator"),
                ("email", "Operator@Example.com"),
                ("password", "super-secret-2"),
                ("role", "User"),
            ],
            &[],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    // Emails are stored lowercased.
    assert_eq!(body["data"]["email"], json!("operator@example.com"));

    let response = app.get("/api/users?role=User", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Admin-created accounts are active immediately.
    let login = app
        .login_token("operator@example.com", "super-secret-2")
        .await?;
    assert!(!login.is_empty());

    app.cleanup().await
}

#[tokio::test]
async fn duplicate_email_is_rejected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let fields = [
        ("name", "Duped"),
        ("email", "dupe@example.com"),
        ("password", "super-secret-2"),
        ("role", "User"),
    ];
    let response = app.post_multipart("/api/users", &fields, &[], &token).await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.post_multipart("/api/users", &fields, &[], &token).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    app.cleanup().await
}

#[tokio::test]
async fn the_last_admin_cannot_be_deleted() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let admin_id = app
        .insert_user("Only Admin", "admin@example.com", "admin-pass-1", "Admin", true)
        .await?;
    let token = app.login_token("admin@example.com", "admin-pass-1").await?;

    let response = app
        .delete(&format!("/api/users/{admin_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // With a second admin present the delete goes through.
    let second_id = app
        .insert_user("Second Admin", "admin2@example.com", "admin-pass-2", "Admin", true)
        .await?;
    let response = app
        .delete(&format!("/api/users/{second_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    app.cleanup().await
}

#[tokio::test]
async fn approve_and_reject_toggle_account_state() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let pending_id = app
        .insert_user("Pending", "pending@example.com", "super-secret-2", "User", false)
        .await?;

    let response = app
        .post_json(
            &format!("/api/users/{pending_id}/approve"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let login = app.login_token("pending@example.com", "super-secret-2").await;
    assert!(login.is_ok());

    let response = app
        .post_json(
            &format!("/api/users/{pending_id}/reject"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let login = app.login_token("pending@example.com", "super-secret-2").await;
    assert!(login.is_err());

    app.cleanup().await
}

#[tokio::test]
async fn bulk_delete_is_best_effort() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let admin_id = app
        .insert_user("Only Admin", "admin@example.com", "admin-pass-1", "Admin", true)
        .await?;
    let token = app.login_token("admin@example.com", "admin-pass-1").await?;

    let user_id = app
        .insert_user("Expendable", "gone@example.com", "super-secret-2", "User", true)
        .await?;

    // The plain user is removed; the last admin is reported, not deleted.
    let response = app
        .post_json(
            "/api/users/bulk-delete",
            &json!({ "user_ids": [user_id, admin_id] }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["deleted_count"], json!(1));
    assert_eq!(body["data"]["failed_deletions"].as_array().unwrap().len(), 1);

    app.cleanup().await
}

#[tokio::test]
async fn reset_password_revokes_sessions() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let user_id = app
        .insert_user("Reset Me", "reset@example.com", "old-password-1", "User", true)
        .await?;

    let response = app
        .post_json(
            &format!("/api/users/{user_id}/reset-password"),
            &json!({ "new_password": "new-password-9" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(app.login_token("reset@example.com", "old-password-1").await.is_err());
    assert!(app.login_token("reset@example.com", "new-password-9").await.is_ok());

    app.cleanup().await
}

#[tokio::test]
async fn stats_break_users_down_by_role() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    app.insert_user("A Manager", "m@example.com", "super-secret-2", "Manager", true)
        .await?;
    app.insert_user("Inactive", "i@example.com", "super-secret-2", "User", false)
        .await?;

    let response = app.get("/api/users/stats", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["total_users"], json!(3));
    assert_eq!(body["data"]["active_users"], json!(2));
    assert_eq!(body["data"]["inactive_users"], json!(1));
    // by_role follows the User, Manager, Admin ordering.
    assert_eq!(body["data"]["by_role"][1]["role"], json!("Manager"));
    assert_eq!(body["data"]["by_role"][1]["count"], json!(1));
    assert_eq!(body["data"]["by_role"][2]["role"], json!("Admin"));
    assert_eq!(body["data"]["by_role"][2]["count"], json!(1));

    app.cleanup().await
}
