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

async fn create_log(app: &TestApp, token: &str, client_id: &str) -> Result<String> {
    let response = app
        .post_multipart(
            "/api/daily-logs",
            &[
                ("client_id", client_id),
                ("field", "South Field"),
                ("well", "SW-3"),
                ("contract", "CT-2024-02"),
                ("job_no", "J-9001"),
                ("date", "2024-05-20"),
            ],
            &[],
            token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn ticket_numbers_are_sequential() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Ticket Client").await?;

    let payload = json!({
        "client_id": client_id,
        "date": "2024-05-21",
        "status": "In Field to Sign",
        "amount": "1500.50",
    });

    let response = app
        .post_json("/api/service-tickets", &payload, Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["ticket_number"], json!("ST-000001"));

    let response = app
        .post_json("/api/service-tickets", &payload, Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["ticket_number"], json!("ST-000002"));

    app.cleanup().await
}

#[tokio::test]
async fn create_rejects_bad_status_and_amount() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Strict Client").await?;

    let response = app
        .post_json(
            "/api/service-tickets",
            &json!({
                "client_id": client_id,
                "date": "2024-05-21",
                "status": "Shipped",
                "amount": "-5",
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_to_json(response.into_body()).await?;
    assert!(body["errors"]["status"].is_array());
    assert!(body["errors"]["amount"].is_array());

    app.cleanup().await
}

#[tokio::test]
async fn generate_from_logs_requires_matching_client() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Log Owner").await?;
    let other_client_id = create_client(&app, &token, "Other Client").await?;
    let log_id = create_log(&app, &token, &client_id).await?;

    // Logs belonging to a different client are rejected.
    let response = app
        .post_json(
            "/api/service-tickets/generate",
            &json!({
                "client_id": other_client_id,
                "date": "2024-05-22",
                "status": "In Field to Sign",
                "amount": 250,
                "related_log_ids": [log_id],
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .post_json(
            "/api/service-tickets/generate",
            &json!({
                "client_id": client_id,
                "date": "2024-05-22",
                "status": "In Field to Sign",
                "amount": 250,
                "related_log_ids": [log_id],
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["ticket_number"], json!("ST-000001"));
    assert_eq!(body["data"]["related_log_ids"][0], json!(log_id));

    app.cleanup().await
}

#[tokio::test]
async fn issues_attach_to_a_ticket() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;
    let client_id = create_client(&app, &token, "Issue Client").await?;

    let response = app
        .post_json(
            "/api/service-tickets",
            &json!({
                "client_id": client_id,
                "date": "2024-05-23",
                "status": "Issue",
                "amount": "80.00",
            }),
            Some(&token),
        )
        .await?;
    let body = body_to_json(response.into_body()).await?;
    let ticket_id = body["data"]["id"].as_str().unwrap().to_string();

    let response = app
        .post_json(
            "/api/ticket-issues",
            &json!({
                "ticket_id": ticket_id,
                "description": "signature missing on page two",
                "date_reported": "2024-05-24",
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    let issue_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], json!("Open"));

    let response = app
        .put_json(
            &format!("/api/ticket-issues/{issue_id}"),
            &json!({ "status": "Resolved" }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["status"], json!("Resolved"));

    // The ticket detail includes its issues.
    let response = app
        .get(&format!("/api/service-tickets/{ticket_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["issues"].as_array().unwrap().len(), 1);

    app.cleanup().await
}
