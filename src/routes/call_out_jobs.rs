use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{CallOutJob, Client, NewCallOutJob},
    numbering::is_unique_violation,
    schema::{call_out_jobs, clients},
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::{FormData, UploadedFile},
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

use super::sub_agreements::{optional_date, required_date, required_uuid};

pub const JOB_STATUSES: &[&str] = &["scheduled", "in_progress", "completed", "cancelled"];
pub const JOB_PRIORITIES: &[&str] = &["low", "medium", "high"];

#[derive(Serialize)]
pub struct JobResponse {
    #[serde(flatten)]
    pub job: CallOutJob,
    pub document_urls: Vec<String>,
}

#[derive(Deserialize)]
pub struct ListJobsParams {
    #[serde(flatten)]
    page: PageParams,
    client_id: Option<Uuid>,
    status: Option<String>,
    search: Option<String>,
    start_date_from: Option<chrono::NaiveDate>,
    start_date_to: Option<chrono::NaiveDate>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsParams>,
) -> AppResult<Json<Envelope<Vec<JobResponse>>>> {
    let mut conn = state.db()?;

    let mut count_query = call_out_jobs::table.into_boxed();
    let mut query = call_out_jobs::table.into_boxed();
    if let Some(client_id) = params.client_id {
        count_query = count_query.filter(call_out_jobs::client_id.eq(client_id));
        query = query.filter(call_out_jobs::client_id.eq(client_id));
    }
    if let Some(status) = params.status.as_ref().filter(|s| !s.is_empty()) {
        count_query = count_query.filter(call_out_jobs::status.eq(status.clone()));
        query = query.filter(call_out_jobs::status.eq(status.clone()));
    }
    if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        count_query = count_query.filter(
            call_out_jobs::job_name
                .ilike(pattern.clone())
                .or(call_out_jobs::work_order_number.ilike(pattern.clone())),
        );
        query = query.filter(
            call_out_jobs::job_name
                .ilike(pattern.clone())
                .or(call_out_jobs::work_order_number.ilike(pattern)),
        );
    }
    if let Some(from) = params.start_date_from {
        count_query = count_query.filter(call_out_jobs::start_date.ge(from));
        query = query.filter(call_out_jobs::start_date.ge(from));
    }
    if let Some(to) = params.start_date_to {
        count_query = count_query.filter(call_out_jobs::start_date.le(to));
        query = query.filter(call_out_jobs::start_date.le(to));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("job_name"), true) => query.order(call_out_jobs::job_name.desc()),
        (Some("job_name"), false) => query.order(call_out_jobs::job_name.asc()),
        (Some("work_order_number"), true) => query.order(call_out_jobs::work_order_number.desc()),
        (Some("work_order_number"), false) => query.order(call_out_jobs::work_order_number.asc()),
        (Some("start_date"), true) => query.order(call_out_jobs::start_date.desc()),
        (Some("start_date"), false) => query.order(call_out_jobs::start_date.asc()),
        (Some("status"), true) => query.order(call_out_jobs::status.desc()),
        (Some("status"), false) => query.order(call_out_jobs::status.asc()),
        (_, true) => query.order(call_out_jobs::created_at.desc()),
        (_, false) => query.order(call_out_jobs::created_at.asc()),
    };

    let rows: Vec<CallOutJob> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows.into_iter().map(|job| to_response(&state, job)).collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "call-out jobs retrieved successfully",
        pagination,
    ))
}

pub async fn job_stats(State(state): State<AppState>) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let now = Utc::now();
    let today = now.date_naive();
    let month_start = today.with_day(1).unwrap_or(today);

    let total: i64 = call_out_jobs::table.count().get_result(&mut conn)?;
    let count_status = |conn: &mut diesel::PgConnection, status: &str| -> AppResult<i64> {
        Ok(call_out_jobs::table
            .filter(call_out_jobs::status.eq(status))
            .count()
            .get_result(conn)?)
    };
    let pending = count_status(&mut conn, "scheduled")?;
    let in_progress = count_status(&mut conn, "in_progress")?;
    let completed = count_status(&mut conn, "completed")?;
    let cancelled = count_status(&mut conn, "cancelled")?;
    let this_month: i64 = call_out_jobs::table
        .filter(call_out_jobs::start_date.ge(month_start))
        .count()
        .get_result(&mut conn)?;
    let overdue: i64 = call_out_jobs::table
        .filter(call_out_jobs::end_date.lt(today))
        .filter(call_out_jobs::status.eq_any(["scheduled", "in_progress"]))
        .count()
        .get_result(&mut conn)?;

    let stats = json!({
        "total_jobs": total,
        "pending_jobs": pending,
        "in_progress_jobs": in_progress,
        "completed_jobs": completed,
        "cancelled_jobs": cancelled,
        "jobs_this_month": this_month,
        "overdue_jobs": overdue,
    });
    Ok(response::ok(stats, "call-out job statistics retrieved successfully"))
}

pub async fn jobs_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(client_id).first(&mut conn)?;

    let rows: Vec<CallOutJob> = call_out_jobs::table
        .filter(call_out_jobs::client_id.eq(client_id))
        .order(call_out_jobs::created_at.desc())
        .load(&mut conn)?;
    let jobs: Vec<JobResponse> = rows.into_iter().map(|job| to_response(&state, job)).collect();

    Ok(response::ok(
        json!({ "client": client, "call_out_jobs": jobs }),
        "client call-out jobs retrieved successfully",
    ))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<JobResponse>>> {
    let mut conn = state.db()?;
    let job: CallOutJob = call_out_jobs::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, job),
        "call-out job retrieved successfully",
    ))
}

pub async fn create_job(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<JobResponse>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let client_id = required_uuid(&form, "client_id", &mut errors);
    let job_name = form.value("job_name").unwrap_or_default().trim().to_string();
    if job_name.is_empty() {
        errors.add("job_name", "job name is required");
    }
    let work_order_number = form
        .value("work_order_number")
        .unwrap_or_default()
        .trim()
        .to_string();
    if work_order_number.is_empty() {
        errors.add("work_order_number", "work order number is required");
    }
    let status = enum_field(&form, "status", JOB_STATUSES, "scheduled", &mut errors);
    let priority = enum_field(&form, "priority", JOB_PRIORITIES, "medium", &mut errors);
    let start_date = required_date(&form, "start_date", &mut errors);
    let end_date = optional_date(&form, "end_date", &mut errors);
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end <= start {
            errors.add("end_date", "end date must be after the start date");
        }
    }
    let uploads = form.files("documents");
    validate_job_documents(uploads, &mut errors);
    errors.into_result()?;

    let mut conn = state.db()?;
    let client_id = client_id.ok_or_else(|| AppError::bad_request("client_id missing"))?;
    clients::table
        .find(client_id)
        .first::<Client>(&mut conn)
        .map_err(|_| AppError::not_found("client not found"))?;

    let stored_paths = store_job_documents(&state, uploads).await?;

    let new_job = NewCallOutJob {
        id: Uuid::new_v4(),
        client_id,
        job_name,
        work_order_number,
        description: form.value("description").map(|s| s.to_string()),
        status,
        priority,
        start_date: start_date.ok_or_else(|| AppError::bad_request("start_date missing"))?,
        end_date,
        documents: paths_to_json(&stored_paths),
    };

    let inserted = diesel::insert_into(call_out_jobs::table)
        .values(&new_job)
        .execute(&mut conn);
    match inserted {
        Ok(_) => {}
        Err(err) => {
            for path in &stored_paths {
                let _ = state.files.delete(path).await;
            }
            if is_unique_violation(&err) {
                return Err(AppError::bad_request("work order number already exists"));
            }
            return Err(err.into());
        }
    }

    let job: CallOutJob = call_out_jobs::table.find(new_job.id).first(&mut conn)?;
    tracing::info!(job_id = %job.id, client_id = %client_id, "call-out job created");
    Ok(response::created(
        to_response(&state, job),
        "call-out job created successfully",
    ))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<JobResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: CallOutJob = call_out_jobs::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let job_name = match form.value("job_name") {
        Some(value) if value.trim().is_empty() => {
            errors.add("job_name", "job name cannot be empty");
            existing.job_name.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.job_name.clone(),
    };
    let work_order_number = match form.value("work_order_number") {
        Some(value) if value.trim().is_empty() => {
            errors.add("work_order_number", "work order number cannot be empty");
            existing.work_order_number.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.work_order_number.clone(),
    };
    let status = enum_field(&form, "status", JOB_STATUSES, &existing.status, &mut errors);
    let priority = enum_field(&form, "priority", JOB_PRIORITIES, &existing.priority, &mut errors);
    let start_date = optional_date(&form, "start_date", &mut errors).unwrap_or(existing.start_date);
    let end_date = match form.value("end_date") {
        Some(raw) if raw.trim().is_empty() => None,
        Some(_) => optional_date(&form, "end_date", &mut errors),
        None => existing.end_date,
    };
    if let Some(end) = end_date {
        if end <= start_date {
            errors.add("end_date", "end date must be after the start date");
        }
    }
    let uploads = form.files("documents");
    validate_job_documents(uploads, &mut errors);
    errors.into_result()?;

    // A fresh document set replaces the stored one wholesale; new files are
    // written first and the old set removed only after the row update lands.
    let stored_paths = store_job_documents(&state, uploads).await?;
    let documents_for_row = if stored_paths.is_empty() {
        existing.documents.clone()
    } else {
        paths_to_json(&stored_paths)
    };

    let description = match form.value("description") {
        Some(value) => Some(value.to_string()),
        None => existing.description.clone(),
    };

    let updated = diesel::update(call_out_jobs::table.find(id))
        .set((
            call_out_jobs::job_name.eq(&job_name),
            call_out_jobs::work_order_number.eq(&work_order_number),
            call_out_jobs::description.eq(&description),
            call_out_jobs::status.eq(&status),
            call_out_jobs::priority.eq(&priority),
            call_out_jobs::start_date.eq(start_date),
            call_out_jobs::end_date.eq(end_date),
            call_out_jobs::documents.eq(&documents_for_row),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if !stored_paths.is_empty() {
                for old in json_to_paths(existing.documents.as_ref()) {
                    let _ = state.files.delete(&old).await;
                }
            }
        }
        Err(err) => {
            for path in &stored_paths {
                let _ = state.files.delete(path).await;
            }
            if is_unique_violation(&err) {
                return Err(AppError::bad_request("work order number already exists"));
            }
            return Err(err.into());
        }
    }

    let job: CallOutJob = call_out_jobs::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, job),
        "call-out job updated successfully",
    ))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

pub async fn update_job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<Envelope<JobResponse>>> {
    if !JOB_STATUSES.contains(&payload.status.as_str()) {
        let mut errors = ValidationErrors::new();
        errors.add(
            "status",
            format!("status must be one of: {}", JOB_STATUSES.join(", ")),
        );
        errors.into_result()?;
    }

    let mut conn = state.db()?;
    let affected = diesel::update(call_out_jobs::table.find(id))
        .set(call_out_jobs::status.eq(&payload.status))
        .execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::not_found("call-out job not found"));
    }

    let job: CallOutJob = call_out_jobs::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, job),
        "job status updated successfully",
    ))
}

pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let job: CallOutJob = call_out_jobs::table.find(id).first(&mut conn)?;

    diesel::delete(call_out_jobs::table.find(id)).execute(&mut conn)?;

    for path in json_to_paths(job.documents.as_ref()) {
        let _ = state.files.delete(&path).await;
    }

    tracing::info!(job_id = %id, "call-out job deleted");
    Ok(response::message_only("call-out job deleted successfully"))
}

fn validate_job_documents(uploads: &[UploadedFile], errors: &mut ValidationErrors) {
    for file in uploads {
        for problem in storage::check_upload(
            FileCategory::JobDocuments,
            &file.original_name,
            file.size(),
        ) {
            errors.add("documents", format!("{}: {problem}", file.original_name));
        }
    }
}

async fn store_job_documents(
    state: &AppState,
    uploads: &[UploadedFile],
) -> AppResult<Vec<String>> {
    let mut stored: Vec<String> = Vec::with_capacity(uploads.len());
    for file in uploads {
        let path = storage::build_storage_path(
            FileCategory::JobDocuments,
            &file.original_name,
            Utc::now(),
        );
        if let Err(err) = state.files.put(&path, file.bytes.clone()).await {
            for path in &stored {
                let _ = state.files.delete(path).await;
            }
            return Err(err.into());
        }
        stored.push(path);
    }
    Ok(stored)
}

pub(crate) fn paths_to_json(paths: &[String]) -> Option<serde_json::Value> {
    if paths.is_empty() {
        None
    } else {
        Some(json!(paths))
    }
}

pub(crate) fn json_to_paths(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|array| {
            array
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn enum_field(
    form: &FormData,
    field: &str,
    allowed: &[&str],
    default: &str,
    errors: &mut ValidationErrors,
) -> String {
    match form.value(field) {
        None => default.to_string(),
        Some(raw) if allowed.contains(&raw) => raw.to_string(),
        Some(raw) => {
            errors.add(
                field,
                format!("{field} must be one of: {} (got {raw})", allowed.join(", ")),
            );
            default.to_string()
        }
    }
}

fn to_response(state: &AppState, job: CallOutJob) -> JobResponse {
    let document_urls = json_to_paths(job.documents.as_ref())
        .into_iter()
        .map(|path| state.config.public_file_url(&path))
        .collect();
    JobResponse { job, document_urls }
}
