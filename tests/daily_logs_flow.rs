mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

async fn create_client(app: &TestApp, token: &str, name: &str) -> Result<String> {
    let response = app
        .post_multipart("/api/clients", &[("name", name)], &[], token)
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

async fn create_log(app: &TestApp, token: &str, client_id: &str) -> Result<serde_json::Value> {
    let response = app
        .post_multipart(
            "/api/daily-logs",
            &[
                ("client_id", client_id),
                ("field", "North Field"),
                ("well", "NW-12"),
                ("contract", "CT-2024-09"),
                ("job_no", "J-4411"),
                ("date", "2024-06-01"),
                (
                    "personnel",
                    r#"[{"name":"A. Crew","position":"Operator","hours":12}]"#,
                ),
            ],
            &[],
            token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn log_numbers_are_sequential() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Numbering Client").await?;

    let first = create_log(&app, &token, &client_id).await?;
    let second = create_log(&app, &token, &client_id).await?;

    assert_eq!(first["log_number"], json!("DSL-000001"));
    assert_eq!(second["log_number"], json!("DSL-000002"));

    app.cleanup().await
}

#[tokio::test]
async fn missing_required_fields_are_collected() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_multipart("/api/daily-logs", &[("field", "North Field")], &[], &token)
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_to_json(response.into_body()).await?;
    assert!(body["errors"]["well"].is_array());
    assert!(body["errors"]["client_id"].is_array());
    assert!(body["errors"]["date"].is_array());

    app.cleanup().await
}

#[tokio::test]
async fn generate_excel_stores_one_artifact_per_log() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Spreadsheet Client").await?;
    let log = create_log(&app, &token, &client_id).await?;
    let log_id = log["id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/api/daily-logs/{log_id}/generate-excel"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    let first_name = body["data"]["excel_file_name"].as_str().unwrap().to_string();
    assert!(first_name.starts_with("daily_service_log_DSL-000001"));
    assert_eq!(app.files().file_count().await, 1);

    // Regeneration replaces the stored spreadsheet instead of accumulating.
    let response = app
        .post_json(
            &format!("/api/daily-logs/{log_id}/generate-excel"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.files().file_count().await, 1);

    app.cleanup().await
}

#[tokio::test]
async fn public_download_serves_generated_spreadsheet() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Download Client").await?;
    let log = create_log(&app, &token, &client_id).await?;
    let log_id = log["id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/api/daily-logs/{log_id}/generate-excel"),
            &json!({}),
            Some(&token),
        )
        .await?;
    let body = body_to_json(response.into_body()).await?;
    let file_name = body["data"]["excel_file_name"].as_str().unwrap().to_string();

    // The link endpoint hands back a URL usable without a token.
    let response = app
        .get(&format!("/api/daily-logs/{log_id}/download/excel"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(
        body["data"]["download_url"],
        json!(format!("/api/daily-logs/public/download/{file_name}"))
    );

    let response = app
        .get(&format!("/api/daily-logs/public/download/{file_name}"), None)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get("/api/daily-logs/public/download/not-there.xlsx", None)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await
}

#[tokio::test]
async fn delete_log_removes_artifacts() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Cleanup Client").await?;
    let log = create_log(&app, &token, &client_id).await?;
    let log_id = log["id"].as_str().unwrap();

    let response = app
        .post_json(
            &format!("/api/daily-logs/{log_id}/generate-excel"),
            &json!({}),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.files().file_count().await, 1);

    let response = app
        .delete(&format!("/api/daily-logs/{log_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.files().file_count().await, 0);

    app.cleanup().await
}
