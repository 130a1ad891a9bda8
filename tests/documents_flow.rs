mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, body_to_json, TestApp};
use serde_json::json;
use uuid::Uuid;

const PDF_BYTES: &[u8] = b"%PDF-1.4 minimal";

async fn upload(app: &TestApp, token: &str, title: &str, filename: &str) -> Result<serde_json::Value> {
    let response = app
        .post_multipart(
            "/api/documents",
            &[("title", title), ("category", "Report")],
            &[("file", filename, "application/pdf", PDF_BYTES)],
            token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_to_json(response.into_body()).await?;
    Ok(body["data"].clone())
}

#[tokio::test]
async fn upload_and_list_documents() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let doc = upload(&app, &token, "Well Report", "well-report.pdf").await?;
    assert_eq!(doc["title"], json!("Well Report"));
    assert_eq!(doc["category"], json!("Report"));
    assert_eq!(doc["file_name"], json!("well-report.pdf"));
    assert_eq!(doc["file_type"], json!("pdf"));
    assert_eq!(app.files().file_count().await, 1);

    let response = app.get("/api/documents?search=well", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    app.cleanup().await
}

#[tokio::test]
async fn upload_rejects_unknown_category_and_bad_extension() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_multipart(
            "/api/documents",
            &[("title", "Oddball"), ("category", "Memes")],
            &[("file", "script.exe", "application/octet-stream", b"MZ")],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_to_json(response.into_body()).await?;
    assert!(body["errors"]["category"].is_array());
    assert!(body["errors"]["file"].is_array());
    assert_eq!(app.files().file_count().await, 0);

    app.cleanup().await
}

#[tokio::test]
async fn replacing_the_file_drops_the_old_one() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let doc = upload(&app, &token, "Manual", "manual-v1.pdf").await?;
    let doc_id = doc["id"].as_str().unwrap();
    assert_eq!(app.files().file_count().await, 1);

    let response = app
        .put_multipart(
            &format!("/api/documents/{doc_id}"),
            &[("title", "Manual v2")],
            &[("file", "manual-v2.pdf", "application/pdf", PDF_BYTES)],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["title"], json!("Manual v2"));
    assert_eq!(body["data"]["file_name"], json!("manual-v2.pdf"));
    assert_eq!(app.files().file_count().await, 1);

    app.cleanup().await
}

#[tokio::test]
async fn bulk_delete_reports_missing_documents() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let first = upload(&app, &token, "Keep A", "a.pdf").await?;
    let second = upload(&app, &token, "Keep B", "b.pdf").await?;
    let missing = Uuid::new_v4();

    let response = app
        .post_json(
            "/api/documents/bulk-delete",
            &json!({
                "document_ids": [first["id"], second["id"], missing],
            }),
            Some(&token),
        )
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["deleted_count"], json!(2));
    assert_eq!(body["data"]["failed_deletions"].as_array().unwrap().len(), 1);
    assert_eq!(
        body["data"]["failed_deletions"][0]["document_id"],
        json!(missing.to_string())
    );
    assert_eq!(app.files().file_count().await, 0);

    app.cleanup().await
}

#[tokio::test]
async fn public_download_only_serves_public_documents() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let response = app
        .post_multipart(
            "/api/documents",
            &[
                ("title", "Public Notice"),
                ("category", "Other"),
                ("is_public", "1"),
            ],
            &[("file", "notice.pdf", "application/pdf", PDF_BYTES)],
            &token,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    upload(&app, &token, "Internal Report", "internal.pdf").await?;

    let response = app
        .get("/api/documents/public/download/notice.pdf", None)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get("/api/documents/public/download/internal.pdf", None)
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await
}

#[tokio::test]
async fn download_counts_increment() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    let doc = upload(&app, &token, "Counted", "counted.pdf").await?;
    let doc_id = doc["id"].as_str().unwrap();
    assert_eq!(doc["download_count"], json!(0));

    let response = app
        .get(&format!("/api/documents/{doc_id}/download-direct"), Some(&token))
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .get(&format!("/api/documents/{doc_id}"), Some(&token))
        .await?;
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["download_count"], json!(1));

    app.cleanup().await
}

#[tokio::test]
async fn stats_summarize_the_archive() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let app = TestApp::new().await?;
    let token = app.admin_token().await?;

    upload(&app, &token, "Stats A", "stats-a.pdf").await?;
    upload(&app, &token, "Stats B", "stats-b.pdf").await?;

    let response = app.get("/api/documents/stats", Some(&token)).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await?;
    assert_eq!(body["data"]["total_documents"], json!(2));
    assert_eq!(body["data"]["by_category"][0]["category"], json!("Report"));
    assert_eq!(body["data"]["by_category"][0]["count"], json!(2));
    assert_eq!(body["data"]["by_file_type"][0]["file_type"], json!("pdf"));
    assert_eq!(body["data"]["by_file_type"][0]["count"], json!(2));
    assert_eq!(body["data"]["recent_uploads"].as_array().unwrap().len(), 2);

    app.cleanup().await
}
