use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use bigdecimal::ToPrimitive;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::{AppError, AppResult, ValidationErrors},
    models::{Client, Document, NewDocument},
    schema::{clients, documents},
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::{FormData, UploadedFile},
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

use super::sub_agreements::optional_date;

pub const CATEGORIES: &[(&str, &str)] = &[
    ("Contract", "Contracts and Agreements"),
    ("Invoice", "Invoices and Billing"),
    ("Report", "Reports and Analytics"),
    ("Certificate", "Certificates and Licenses"),
    ("License", "Licenses and Permits"),
    ("Manual", "Manuals and Guides"),
    ("Procedure", "Procedures and Policies"),
    ("Policy", "Policies and Standards"),
    ("Form", "Forms and Templates"),
    ("Other", "Other Documents"),
];

const PREVIEWABLE_TYPES: &[&str] = &["pdf", "jpg", "jpeg", "png", "gif", "txt"];

#[derive(Serialize)]
pub struct DocumentResponse {
    #[serde(flatten)]
    pub document: Document,
    pub file_url: String,
}

#[derive(Deserialize)]
pub struct ListDocumentsParams {
    #[serde(flatten)]
    page: PageParams,
    category: Option<String>,
    client_id: Option<Uuid>,
    file_type: Option<String>,
    tag: Option<String>,
    search: Option<String>,
    public_only: Option<bool>,
    expired_only: Option<bool>,
    not_expired: Option<bool>,
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<ListDocumentsParams>,
) -> AppResult<Json<Envelope<Vec<DocumentResponse>>>> {
    let mut conn = state.db()?;
    let today = Utc::now().date_naive();

    let build = || {
        let mut query = documents::table.into_boxed();
        if let Some(category) = params.category.as_ref().filter(|s| !s.is_empty()) {
            query = query.filter(documents::category.eq(category.clone()));
        }
        if let Some(client_id) = params.client_id {
            query = query.filter(documents::client_id.eq(client_id));
        }
        if let Some(file_type) = params.file_type.as_ref().filter(|s| !s.is_empty()) {
            query = query.filter(documents::file_type.eq(file_type.to_lowercase()));
        }
        if let Some(tag) = params.tag.as_ref().filter(|s| !s.is_empty()) {
            query = query.filter(documents::tags.contains(json!([tag])));
        }
        if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
            let pattern = format!("%{}%", search.trim());
            query = query.filter(
                documents::title
                    .ilike(pattern.clone())
                    .or(documents::file_name.ilike(pattern.clone()))
                    .or(documents::description.ilike(pattern)),
            );
        }
        if params.public_only.unwrap_or(false) {
            query = query.filter(documents::is_public.eq(true));
        }
        if params.expired_only.unwrap_or(false) {
            query = query.filter(documents::expiry_date.lt(today));
        }
        if params.not_expired.unwrap_or(false) {
            query = query.filter(
                documents::expiry_date
                    .gt(today)
                    .or(documents::expiry_date.is_null()),
            );
        }
        query
    };

    let total: i64 = build().count().get_result(&mut conn)?;

    let mut query = build();
    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("title"), true) => query.order(documents::title.desc()),
        (Some("title"), false) => query.order(documents::title.asc()),
        (Some("file_name"), true) => query.order(documents::file_name.desc()),
        (Some("file_name"), false) => query.order(documents::file_name.asc()),
        (Some("file_size"), true) => query.order(documents::file_size.desc()),
        (Some("file_size"), false) => query.order(documents::file_size.asc()),
        (Some("download_count"), true) => query.order(documents::download_count.desc()),
        (Some("download_count"), false) => query.order(documents::download_count.asc()),
        (_, true) => query.order(documents::created_at.desc()),
        (_, false) => query.order(documents::created_at.asc()),
    };

    let rows: Vec<Document> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows.into_iter().map(|doc| to_response(&state, doc)).collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "documents retrieved successfully",
        pagination,
    ))
}

pub async fn list_categories(
    State(_state): State<AppState>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut categories = serde_json::Map::new();
    for (name, label) in CATEGORIES {
        categories.insert((*name).to_string(), json!(label));
    }
    Ok(response::ok(
        serde_json::Value::Object(categories),
        "document categories retrieved successfully",
    ))
}

pub async fn document_stats(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let today = Utc::now().date_naive();

    let total: i64 = documents::table.count().get_result(&mut conn)?;
    let total_size: i64 = documents::table
        .select(diesel::dsl::sum(documents::file_size))
        .first::<Option<bigdecimal::BigDecimal>>(&mut conn)?
        .and_then(|sum| sum.to_i64())
        .unwrap_or(0);
    let total_downloads: i64 = documents::table
        .select(diesel::dsl::sum(documents::download_count))
        .first::<Option<i64>>(&mut conn)?
        .unwrap_or(0);

    let by_category: Vec<(String, i64)> = documents::table
        .group_by(documents::category)
        .select((documents::category, diesel::dsl::count_star()))
        .load(&mut conn)?;
    let by_file_type: Vec<(String, i64)> = documents::table
        .group_by(documents::file_type)
        .select((documents::file_type, diesel::dsl::count_star()))
        .order(diesel::dsl::count_star().desc())
        .limit(10)
        .load(&mut conn)?;

    let recent: Vec<Document> = documents::table
        .order(documents::created_at.desc())
        .limit(5)
        .load(&mut conn)?;
    let recent_uploads: Vec<DocumentResponse> =
        recent.into_iter().map(|doc| to_response(&state, doc)).collect();

    let expired: i64 = documents::table
        .filter(documents::expiry_date.lt(today))
        .count()
        .get_result(&mut conn)?;
    let public_count: i64 = documents::table
        .filter(documents::is_public.eq(true))
        .count()
        .get_result(&mut conn)?;

    let average = if total > 0 {
        total_size as f64 / total as f64
    } else {
        0.0
    };

    let stats = json!({
        "total_documents": total,
        "total_size": total_size,
        "total_downloads": total_downloads,
        "by_category": by_category
            .into_iter()
            .map(|(category, count)| json!({ "category": category, "count": count }))
            .collect::<Vec<_>>(),
        "by_file_type": by_file_type
            .into_iter()
            .map(|(file_type, count)| json!({ "file_type": file_type, "count": count }))
            .collect::<Vec<_>>(),
        "recent_uploads": recent_uploads,
        "expired_documents": expired,
        "public_documents": public_count,
        "storage_usage": {
            "total_size_human": format_bytes(total_size as f64),
            "average_file_size": format_bytes(average),
        },
    });
    Ok(response::ok(stats, "document statistics retrieved successfully"))
}

pub async fn documents_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(client_id).first(&mut conn)?;

    let rows: Vec<Document> = documents::table
        .filter(documents::client_id.eq(client_id))
        .order(documents::created_at.desc())
        .load(&mut conn)?;
    let docs: Vec<DocumentResponse> = rows.into_iter().map(|doc| to_response(&state, doc)).collect();

    Ok(response::ok(
        json!({ "client": client, "documents": docs }),
        "client documents retrieved successfully",
    ))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<DocumentResponse>>> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, document),
        "document retrieved successfully",
    ))
}

pub async fn upload_document(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<DocumentResponse>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let title = form.value("title").unwrap_or_default().trim().to_string();
    if title.is_empty() {
        errors.add("title", "title is required");
    }
    let category = validate_category(form.value("category"), &mut errors);
    let client_id = parse_optional_client(&form, &mut errors);
    let tags = parse_tags(&form, &mut errors);
    let expiry_date = optional_date(&form, "expiry_date", &mut errors);
    let is_public = parse_bool(form.value("is_public"));

    let file = form.file("file");
    match file {
        None => errors.add("file", "a file is required"),
        Some(file) => {
            for problem in
                storage::check_upload(FileCategory::Library, &file.original_name, file.size())
            {
                errors.add("file", problem);
            }
        }
    }
    errors.into_result()?;
    let file = file.ok_or_else(|| AppError::bad_request("a file is required"))?;

    let mut conn = state.db()?;
    if let Some(client_id) = client_id {
        clients::table
            .find(client_id)
            .first::<Client>(&mut conn)
            .map_err(|_| AppError::not_found("client not found"))?;
    }

    let path = storage::build_storage_path(FileCategory::Library, &file.original_name, Utc::now());
    state.files.put(&path, file.bytes.clone()).await?;

    let new_document = build_record(
        file,
        path.clone(),
        NewDocumentFields {
            title,
            description: form.value("description").map(|s| s.to_string()),
            category,
            tags,
            client_id,
            uploaded_by: user.user_id,
            is_public,
            expiry_date,
        },
    );

    if let Err(err) = diesel::insert_into(documents::table)
        .values(&new_document)
        .execute(&mut conn)
    {
        let _ = state.files.delete(&path).await;
        return Err(err.into());
    }

    let document: Document = documents::table.find(new_document.id).first(&mut conn)?;
    tracing::info!(document_id = %document.id, category = %document.category, "document uploaded");
    Ok(response::created(
        to_response(&state, document),
        "document uploaded successfully",
    ))
}

/// All-or-nothing: the rows land in one transaction, so a database failure
/// rolls back the whole batch and the written files are removed.
pub async fn bulk_upload(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<serde_json::Value>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let category = validate_category(form.value("category"), &mut errors);
    let client_id = parse_optional_client(&form, &mut errors);
    let tags = parse_tags(&form, &mut errors);
    let is_public = parse_bool(form.value("is_public"));

    let files = form.files("files");
    if files.is_empty() {
        errors.add("files", "at least one file is required");
    }
    for file in files {
        for problem in
            storage::check_upload(FileCategory::Library, &file.original_name, file.size())
        {
            errors.add("files", format!("{}: {problem}", file.original_name));
        }
    }
    errors.into_result()?;

    let mut conn = state.db()?;
    if let Some(client_id) = client_id {
        clients::table
            .find(client_id)
            .first::<Client>(&mut conn)
            .map_err(|_| AppError::not_found("client not found"))?;
    }

    let mut stored: Vec<(String, &UploadedFile)> = Vec::with_capacity(files.len());
    for file in files {
        let path =
            storage::build_storage_path(FileCategory::Library, &file.original_name, Utc::now());
        if let Err(err) = state.files.put(&path, file.bytes.clone()).await {
            for (path, _) in &stored {
                let _ = state.files.delete(path).await;
            }
            return Err(err.into());
        }
        stored.push((path, file));
    }

    let records: Vec<NewDocument> = stored
        .iter()
        .map(|(path, file)| {
            build_record(
                file,
                path.clone(),
                NewDocumentFields {
                    title: file.original_name.clone(),
                    description: Some("Bulk uploaded document".to_string()),
                    category: category.clone(),
                    tags: tags.clone(),
                    client_id,
                    uploaded_by: user.user_id,
                    is_public,
                    expiry_date: None,
                },
            )
        })
        .collect();

    let inserted = conn.transaction::<_, AppError, _>(|conn| {
        diesel::insert_into(documents::table)
            .values(&records)
            .execute(conn)?;
        Ok(())
    });

    if let Err(err) = inserted {
        for (path, _) in &stored {
            let _ = state.files.delete(path).await;
        }
        return Err(err);
    }

    let ids: Vec<Uuid> = records.iter().map(|record| record.id).collect();
    let rows: Vec<Document> = documents::table
        .filter(documents::id.eq_any(&ids))
        .load(&mut conn)?;
    let uploaded: Vec<DocumentResponse> =
        rows.into_iter().map(|doc| to_response(&state, doc)).collect();
    let count = uploaded.len();

    tracing::info!(count, "bulk document upload completed");
    Ok(response::created(
        json!({ "uploaded": uploaded, "failed": [] }),
        format!("bulk upload completed, {count} documents uploaded successfully"),
    ))
}

pub async fn update_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<DocumentResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: Document = documents::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let title = match form.value("title") {
        Some(value) if value.trim().is_empty() => {
            errors.add("title", "title cannot be empty");
            existing.title.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.title.clone(),
    };
    let category = match form.value("category") {
        Some(_) => validate_category(form.value("category"), &mut errors),
        None => existing.category.clone(),
    };
    let tags = if form.has_value("tags") {
        parse_tags(&form, &mut errors)
    } else {
        existing.tags.clone()
    };
    let expiry_date = match form.value("expiry_date") {
        Some(raw) if raw.trim().is_empty() => None,
        Some(_) => optional_date(&form, "expiry_date", &mut errors),
        None => existing.expiry_date,
    };
    let is_public = match form.value("is_public") {
        Some(raw) => matches!(raw, "1" | "true"),
        None => existing.is_public,
    };

    let file = form.file("file");
    if let Some(file) = file {
        for problem in
            storage::check_upload(FileCategory::Library, &file.original_name, file.size())
        {
            errors.add("file", problem);
        }
    }
    errors.into_result()?;

    // File replacement writes the new binary first; the superseded one is
    // only removed after the row points at the replacement.
    let mut replacement = None;
    if let Some(file) = file {
        let path =
            storage::build_storage_path(FileCategory::Library, &file.original_name, Utc::now());
        state.files.put(&path, file.bytes.clone()).await?;
        replacement = Some((path, file));
    }

    let description = match form.value("description") {
        Some(value) => Some(value.to_string()),
        None => existing.description.clone(),
    };

    let (file_name, file_path, file_size, file_type, mime_type) = match &replacement {
        Some((path, file)) => (
            file.original_name.clone(),
            path.clone(),
            file.size() as i64,
            storage::file_extension(&file.original_name),
            guess_mime(file),
        ),
        None => (
            existing.file_name.clone(),
            existing.file_path.clone(),
            existing.file_size,
            existing.file_type.clone(),
            existing.mime_type.clone(),
        ),
    };

    let updated = diesel::update(documents::table.find(id))
        .set((
            documents::title.eq(&title),
            documents::description.eq(&description),
            documents::file_name.eq(&file_name),
            documents::file_path.eq(&file_path),
            documents::file_size.eq(file_size),
            documents::file_type.eq(&file_type),
            documents::mime_type.eq(&mime_type),
            documents::category.eq(&category),
            documents::tags.eq(&tags),
            documents::is_public.eq(is_public),
            documents::expiry_date.eq(expiry_date),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if replacement.is_some() {
                let _ = state.files.delete(&existing.file_path).await;
            }
        }
        Err(err) => {
            if let Some((path, _)) = &replacement {
                let _ = state.files.delete(path).await;
            }
            return Err(err.into());
        }
    }

    let document: Document = documents::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, document),
        "document updated successfully",
    ))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(id).first(&mut conn)?;

    diesel::delete(documents::table.find(id)).execute(&mut conn)?;
    let _ = state.files.delete(&document.file_path).await;

    tracing::info!(document_id = %id, "document deleted");
    Ok(response::message_only("document deleted successfully"))
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub document_ids: Vec<Uuid>,
}

/// Row deletion is transactional; ids that match no document are reported in
/// the failed list without aborting the batch. Binaries are removed after
/// the transaction commits.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(payload): Json<BulkDeleteRequest>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    if payload.document_ids.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.add("document_ids", "at least one document id is required");
        errors.into_result()?;
    }

    let mut conn = state.db()?;
    let found: Vec<Document> = documents::table
        .filter(documents::id.eq_any(&payload.document_ids))
        .load(&mut conn)?;
    let found_ids: Vec<Uuid> = found.iter().map(|doc| doc.id).collect();
    let failed: Vec<serde_json::Value> = payload
        .document_ids
        .iter()
        .filter(|id| !found_ids.contains(id))
        .map(|id| json!({ "document_id": id, "error": "document not found" }))
        .collect();

    conn.transaction::<_, AppError, _>(|conn| {
        diesel::delete(documents::table.filter(documents::id.eq_any(&found_ids)))
            .execute(conn)?;
        Ok(())
    })?;

    for document in &found {
        let _ = state.files.delete(&document.file_path).await;
    }

    let deleted_count = found_ids.len();
    tracing::info!(deleted_count, "bulk document deletion completed");
    Ok(response::ok(
        json!({ "deleted_count": deleted_count, "failed_deletions": failed }),
        format!("bulk deletion completed, {deleted_count} documents deleted successfully"),
    ))
}

pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(id).first(&mut conn)?;

    if !state.files.exists(&document.file_path).await.unwrap_or(false) {
        return Err(AppError::not_found("file not found"));
    }

    increment_downloads(&mut conn, id)?;

    Ok(response::ok(
        json!({
            "download_url": state.config.public_file_url(&document.file_path),
            "file_name": document.file_name,
            "file_size": format_bytes(document.file_size as f64),
            "mime_type": document.mime_type,
        }),
        "download URL generated successfully",
    ))
}

pub async fn download_document_direct(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(id).first(&mut conn)?;

    let bytes = state
        .files
        .get(&document.file_path)
        .await
        .map_err(|_| AppError::not_found("file not found"))?;
    increment_downloads(&mut conn, id)?;

    super::file_response(&document.file_name, &document.mime_type, bytes, false)
}

pub async fn preview_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let mut conn = state.db()?;
    let document: Document = documents::table.find(id).first(&mut conn)?;

    if !PREVIEWABLE_TYPES.contains(&document.file_type.to_lowercase().as_str()) {
        return Err(AppError::bad_request("file type not supported for preview"));
    }

    let bytes = state
        .files
        .get(&document.file_path)
        .await
        .map_err(|_| AppError::not_found("file not found"))?;

    super::file_response(&document.file_name, &document.mime_type, bytes, true)
}

/// Unauthenticated download, keyed by the original filename and restricted
/// to documents explicitly flagged public.
pub async fn public_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let mut conn = state.db()?;
    let document: Document = documents::table
        .filter(documents::file_name.eq(&filename))
        .filter(documents::is_public.eq(true))
        .first(&mut conn)
        .map_err(|_| AppError::not_found("document not found or not public"))?;

    let bytes = state
        .files
        .get(&document.file_path)
        .await
        .map_err(|_| AppError::not_found("file not found"))?;
    increment_downloads(&mut conn, document.id)?;

    super::file_response(&document.file_name, &document.mime_type, bytes, false)
}

struct NewDocumentFields {
    title: String,
    description: Option<String>,
    category: String,
    tags: Option<serde_json::Value>,
    client_id: Option<Uuid>,
    uploaded_by: Uuid,
    is_public: bool,
    expiry_date: Option<chrono::NaiveDate>,
}

fn build_record(file: &UploadedFile, path: String, fields: NewDocumentFields) -> NewDocument {
    NewDocument {
        id: Uuid::new_v4(),
        title: fields.title,
        description: fields.description,
        file_name: file.original_name.clone(),
        file_path: path,
        file_size: file.size() as i64,
        file_type: storage::file_extension(&file.original_name),
        mime_type: guess_mime(file),
        category: fields.category,
        tags: fields.tags,
        client_id: fields.client_id,
        uploaded_by: fields.uploaded_by,
        is_public: fields.is_public,
        expiry_date: fields.expiry_date,
    }
}

fn guess_mime(file: &UploadedFile) -> String {
    file.content_type.clone().unwrap_or_else(|| {
        mime_guess::from_path(&file.original_name)
            .first_or_octet_stream()
            .to_string()
    })
}

fn validate_category(raw: Option<&str>, errors: &mut ValidationErrors) -> String {
    match raw {
        None => {
            errors.add("category", "category is required");
            String::new()
        }
        Some(value) if CATEGORIES.iter().any(|(name, _)| *name == value) => value.to_string(),
        Some(value) => {
            errors.add("category", format!("unknown category {value}"));
            String::new()
        }
    }
}

fn parse_optional_client(form: &FormData, errors: &mut ValidationErrors) -> Option<Uuid> {
    let raw = form.value("client_id")?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add("client_id", "client_id must be a valid UUID");
            None
        }
    }
}

fn parse_tags(form: &FormData, errors: &mut ValidationErrors) -> Option<serde_json::Value> {
    let raw = match form.json_value("tags") {
        Ok(raw) => raw?,
        Err(err) => {
            errors.add("tags", err.to_string());
            return None;
        }
    };
    match &raw {
        serde_json::Value::Array(items) if items.iter().all(|item| item.is_string()) => Some(raw),
        _ => {
            errors.add("tags", "tags must be an array of strings");
            None
        }
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(raw, Some("1") | Some("true"))
}

fn increment_downloads(conn: &mut diesel::PgConnection, id: Uuid) -> AppResult<()> {
    diesel::update(documents::table.find(id))
        .set(documents::download_count.eq(documents::download_count + 1))
        .execute(conn)?;
    Ok(())
}

fn to_response(state: &AppState, document: Document) -> DocumentResponse {
    let file_url = state.config.public_file_url(&document.file_path);
    DocumentResponse { document, file_url }
}

fn format_bytes(bytes: f64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes;
    let mut unit = 0;
    while value > 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
