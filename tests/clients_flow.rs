mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;

#[tokio::test]
async fn create_and_fetch_client_with_contacts() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let contacts = json!([
        { "name": "Sara Op", "email": "sara@client.example", "position": "Ops Lead" },
        { "name": "Jon Rig", "phone": "+1-555-0101" },
    ]);
    let response = app
        .post_multipart(
            "/api/clients",
            &[("name", "Desert Drilling Co"), ("contacts", &contacts.to_string())],
            &[],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_to_json(response.into_body()).await?;
    let client_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["name"], json!("Desert Drilling Co"));
    assert_eq!(body["data"]["contacts"].as_array().unwrap().len(), 2);

    let response = app
        .get(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["contacts"][0]["name"], json!("Sara Op"));

    app.cleanup().await
}

#[tokio::test]
async fn missing_name_fails_validation() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_multipart("/api/clients", &[("name", "  ")], &[], &token)
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["success"], json!(false));
    assert!(body["errors"]["name"].is_array());

    app.cleanup().await
}

#[tokio::test]
async fn list_supports_search_and_pagination() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    for name in ["Alpha Energy", "Beta Wells", "Alpha Services"] {
        let response = app
            .post_multipart("/api/clients", &[("name", name)], &[], &token)
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .get("/api/clients?search=Alpha&per_page=1&page=2", Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["pagination"]["total"], json!(2));
    assert_eq!(body["pagination"]["page"], json!(2));

    app.cleanup().await
}

#[tokio::test]
async fn list_sorts_by_the_requested_column() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    for name in ["Zulu Well Services", "Alpha Energy"] {
        let response = app
            .post_multipart("/api/clients", &[("name", name)], &[], &token)
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let first_name = |body: &serde_json::Value| {
        body["data"][0]["name"].as_str().unwrap().to_string()
    };

    let response = app
        .get("/api/clients?sort_by=name&sort_order=asc", Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(first_name(&body), "Alpha Energy");

    let response = app.get("/api/clients?sort_by=name", Some(&token)).await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(first_name(&body), "Zulu Well Services");

    // Unknown columns fall back to the default creation-time ordering.
    let response = app
        .get("/api/clients?sort_by=nonsense&sort_order=asc", Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(first_name(&body), "Zulu Well Services");

    app.cleanup().await
}

#[tokio::test]
async fn update_replaces_contact_list() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let contacts = json!([{ "name": "First Contact" }]);
    let response = app
        .post_multipart(
            "/api/clients",
            &[("name", "Gulf Ops"), ("contacts", &contacts.to_string())],
            &[],
            &token,
        )
        .await?;
    let body = body_to_json(response.into_body()).await?;
    let client_id = body["data"]["id"].as_str().unwrap().to_string();

    let replacement = json!([
        { "name": "Second Contact" },
        { "name": "Third Contact" },
    ]);
    let response = app
        .put_multipart(
            &format!("/api/clients/{client_id}"),
            &[("contacts", &replacement.to_string())],
            &[],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    let names: Vec<&str> = body["data"]["contacts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Second Contact"));
    assert!(!names.contains(&"First Contact"));

    app.cleanup().await
}

#[tokio::test]
async fn delete_removes_client_and_logo_file() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    // Minimal valid PNG so the upload passes the image sniff.
    let logo = png_bytes();
    let response = app
        .post_multipart(
            "/api/clients",
            &[("name", "Logo Client")],
            &[("logo", "logo.png", "image/png", &logo)],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    let client_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.files().file_count().await, 1);

    let response = app
        .delete(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.files().file_count().await, 0);

    let response = app
        .get(&format!("/api/clients/{client_id}"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await
}

// 1x1 transparent PNG.
fn png_bytes() -> Vec<u8> {
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x62, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];
    PNG.to_vec()
}
