use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{CallOutJob, Client, DailyServiceLog, NewDailyServiceLog},
    numbering::{self, DAILY_LOG_PREFIX, MAX_NUMBERING_ATTEMPTS},
    report::daily_log,
    schema::{call_out_jobs, clients, daily_service_logs},
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::{FormData, UploadedFile},
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

use super::sub_agreements::{required_date, required_uuid};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const PDF_MIME: &str = "application/pdf";

const SECTION_FIELDS: &[&str] = &[
    "personnel",
    "equipment_used",
    "company_rep",
    "approval_1",
    "approval_2",
];

#[derive(Serialize)]
pub struct LogResponse {
    #[serde(flatten)]
    pub log: DailyServiceLog,
    pub excel_file_url: Option<String>,
    pub pdf_file_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ListLogsParams {
    #[serde(flatten)]
    page: PageParams,
    client_id: Option<Uuid>,
    search: Option<String>,
    date_from: Option<chrono::NaiveDate>,
    date_to: Option<chrono::NaiveDate>,
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<ListLogsParams>,
) -> AppResult<Json<Envelope<Vec<LogResponse>>>> {
    let mut conn = state.db()?;

    let mut count_query = daily_service_logs::table.into_boxed();
    let mut query = daily_service_logs::table.into_boxed();
    if let Some(client_id) = params.client_id {
        count_query = count_query.filter(daily_service_logs::client_id.eq(client_id));
        query = query.filter(daily_service_logs::client_id.eq(client_id));
    }
    if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        count_query = count_query.filter(
            daily_service_logs::log_number
                .ilike(pattern.clone())
                .or(daily_service_logs::field.ilike(pattern.clone()))
                .or(daily_service_logs::well.ilike(pattern.clone())),
        );
        query = query.filter(
            daily_service_logs::log_number
                .ilike(pattern.clone())
                .or(daily_service_logs::field.ilike(pattern.clone()))
                .or(daily_service_logs::well.ilike(pattern)),
        );
    }
    if let Some(from) = params.date_from {
        count_query = count_query.filter(daily_service_logs::date.ge(from));
        query = query.filter(daily_service_logs::date.ge(from));
    }
    if let Some(to) = params.date_to {
        count_query = count_query.filter(daily_service_logs::date.le(to));
        query = query.filter(daily_service_logs::date.le(to));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("date"), true) => query.order(daily_service_logs::date.desc()),
        (Some("date"), false) => query.order(daily_service_logs::date.asc()),
        (Some("created_at"), true) => query.order(daily_service_logs::created_at.desc()),
        (Some("created_at"), false) => query.order(daily_service_logs::created_at.asc()),
        (_, true) => query.order(daily_service_logs::log_number.desc()),
        (_, false) => query.order(daily_service_logs::log_number.asc()),
    };

    let rows: Vec<DailyServiceLog> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows.into_iter().map(|log| to_response(&state, log)).collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "daily service logs retrieved successfully",
        pagination,
    ))
}

pub async fn logs_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(client_id).first(&mut conn)?;

    let rows: Vec<DailyServiceLog> = daily_service_logs::table
        .filter(daily_service_logs::client_id.eq(client_id))
        .order(daily_service_logs::log_number.desc())
        .load(&mut conn)?;
    let logs: Vec<LogResponse> = rows.into_iter().map(|log| to_response(&state, log)).collect();

    Ok(response::ok(
        json!({ "client": client, "daily_service_logs": logs }),
        "client daily service logs retrieved successfully",
    ))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<LogResponse>>> {
    let mut conn = state.db()?;
    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, log),
        "daily service log retrieved successfully",
    ))
}

pub async fn create_log(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<LogResponse>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let client_id = required_uuid(&form, "client_id", &mut errors);
    let field = required_text(&form, "field", &mut errors);
    let well = required_text(&form, "well", &mut errors);
    let contract = required_text(&form, "contract", &mut errors);
    let job_no = required_text(&form, "job_no", &mut errors);
    let date = required_date(&form, "date", &mut errors);
    let linked_job_id = optional_uuid(&form, "linked_job_id", &mut errors);
    let sections = parse_sections(&form, &mut errors);
    let excel_upload = validated_artifact(&form, "excel_file", FileCategory::DailyLogExcel, &mut errors);
    let pdf_upload = validated_artifact(&form, "pdf_file", FileCategory::DailyLogPdf, &mut errors);
    errors.into_result()?;

    let mut conn = state.db()?;
    let client_id = client_id.ok_or_else(|| AppError::bad_request("client_id missing"))?;
    clients::table
        .find(client_id)
        .first::<Client>(&mut conn)
        .map_err(|_| AppError::not_found("client not found"))?;
    if let Some(job_id) = linked_job_id {
        call_out_jobs::table
            .find(job_id)
            .first::<CallOutJob>(&mut conn)
            .map_err(|_| AppError::not_found("linked call-out job not found"))?;
    }

    let excel = store_artifact(&state, excel_upload, FileCategory::DailyLogExcel).await?;
    let pdf = match store_artifact(&state, pdf_upload, FileCategory::DailyLogPdf).await {
        Ok(pdf) => pdf,
        Err(err) => {
            if let Some((path, _)) = &excel {
                let _ = state.files.delete(path).await;
            }
            return Err(err);
        }
    };
    let stored_paths: Vec<String> = [excel.as_ref(), pdf.as_ref()]
        .into_iter()
        .flatten()
        .map(|(path, _)| path.clone())
        .collect();

    let [personnel, equipment_used, company_rep, approval_1, approval_2] = sections;
    let mut log_id = None;
    for _attempt in 0..MAX_NUMBERING_ATTEMPTS {
        let last: Option<String> = daily_service_logs::table
            .select(daily_service_logs::log_number)
            .filter(daily_service_logs::log_number.like(format!("{DAILY_LOG_PREFIX}%")))
            .order(daily_service_logs::log_number.desc())
            .first(&mut conn)
            .optional()?;
        let log_number = numbering::next_number(DAILY_LOG_PREFIX, last.as_deref());

        let new_log = NewDailyServiceLog {
            id: Uuid::new_v4(),
            log_number,
            client_id,
            field: field.clone(),
            well: well.clone(),
            contract: contract.clone(),
            job_no: job_no.clone(),
            date: date.ok_or_else(|| AppError::bad_request("date missing"))?,
            linked_job_id,
            personnel: personnel.clone(),
            equipment_used: equipment_used.clone(),
            company_rep: company_rep.clone(),
            approval_1: approval_1.clone(),
            approval_2: approval_2.clone(),
            excel_file_path: excel.as_ref().map(|(path, _)| path.clone()),
            excel_file_name: excel.as_ref().map(|(_, name)| name.clone()),
            pdf_file_path: pdf.as_ref().map(|(path, _)| path.clone()),
            pdf_file_name: pdf.as_ref().map(|(_, name)| name.clone()),
        };

        match diesel::insert_into(daily_service_logs::table)
            .values(&new_log)
            .execute(&mut conn)
        {
            Ok(_) => {
                log_id = Some(new_log.id);
                break;
            }
            // A concurrent create took the number; recompute and try again.
            Err(err) if numbering::is_unique_violation(&err) => continue,
            Err(err) => {
                for path in &stored_paths {
                    let _ = state.files.delete(path).await;
                }
                return Err(err.into());
            }
        }
    }

    let Some(log_id) = log_id else {
        for path in &stored_paths {
            let _ = state.files.delete(path).await;
        }
        return Err(AppError::conflict("could not allocate a log number, try again"));
    };

    let log: DailyServiceLog = daily_service_logs::table.find(log_id).first(&mut conn)?;
    tracing::info!(log_id = %log.id, log_number = %log.log_number, "daily service log created");
    Ok(response::created(
        to_response(&state, log),
        "daily service log created successfully",
    ))
}

pub async fn update_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<LogResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let field = updated_text(&form, "field", &existing.field, &mut errors);
    let well = updated_text(&form, "well", &existing.well, &mut errors);
    let contract = updated_text(&form, "contract", &existing.contract, &mut errors);
    let job_no = updated_text(&form, "job_no", &existing.job_no, &mut errors);
    let date = match form.value("date") {
        Some(_) => required_date(&form, "date", &mut errors).unwrap_or(existing.date),
        None => existing.date,
    };
    let linked_job_id = match form.value("linked_job_id") {
        Some(raw) if raw.trim().is_empty() => None,
        Some(_) => optional_uuid(&form, "linked_job_id", &mut errors),
        None => existing.linked_job_id,
    };
    let excel_upload = validated_artifact(&form, "excel_file", FileCategory::DailyLogExcel, &mut errors);
    let pdf_upload = validated_artifact(&form, "pdf_file", FileCategory::DailyLogPdf, &mut errors);
    errors.into_result()?;

    if let Some(job_id) = linked_job_id {
        call_out_jobs::table
            .find(job_id)
            .first::<CallOutJob>(&mut conn)
            .map_err(|_| AppError::not_found("linked call-out job not found"))?;
    }

    let sections = section_updates(&form, &existing)?;

    // Artifact replacement: new file first, row second, old file last.
    let excel = store_artifact(&state, excel_upload, FileCategory::DailyLogExcel).await?;
    let pdf = match store_artifact(&state, pdf_upload, FileCategory::DailyLogPdf).await {
        Ok(pdf) => pdf,
        Err(err) => {
            if let Some((path, _)) = &excel {
                let _ = state.files.delete(path).await;
            }
            return Err(err);
        }
    };

    let excel_path = excel
        .as_ref()
        .map(|(path, _)| path.clone())
        .or_else(|| existing.excel_file_path.clone());
    let excel_name = excel
        .as_ref()
        .map(|(_, name)| name.clone())
        .or_else(|| existing.excel_file_name.clone());
    let pdf_path = pdf
        .as_ref()
        .map(|(path, _)| path.clone())
        .or_else(|| existing.pdf_file_path.clone());
    let pdf_name = pdf
        .as_ref()
        .map(|(_, name)| name.clone())
        .or_else(|| existing.pdf_file_name.clone());

    let [personnel, equipment_used, company_rep, approval_1, approval_2] = sections;
    let updated = diesel::update(daily_service_logs::table.find(id))
        .set((
            daily_service_logs::field.eq(&field),
            daily_service_logs::well.eq(&well),
            daily_service_logs::contract.eq(&contract),
            daily_service_logs::job_no.eq(&job_no),
            daily_service_logs::date.eq(date),
            daily_service_logs::linked_job_id.eq(linked_job_id),
            daily_service_logs::personnel.eq(&personnel),
            daily_service_logs::equipment_used.eq(&equipment_used),
            daily_service_logs::company_rep.eq(&company_rep),
            daily_service_logs::approval_1.eq(&approval_1),
            daily_service_logs::approval_2.eq(&approval_2),
            daily_service_logs::excel_file_path.eq(&excel_path),
            daily_service_logs::excel_file_name.eq(&excel_name),
            daily_service_logs::pdf_file_path.eq(&pdf_path),
            daily_service_logs::pdf_file_name.eq(&pdf_name),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if excel.is_some() {
                if let Some(old) = &existing.excel_file_path {
                    let _ = state.files.delete(old).await;
                }
            }
            if pdf.is_some() {
                if let Some(old) = &existing.pdf_file_path {
                    let _ = state.files.delete(old).await;
                }
            }
        }
        Err(err) => {
            if let Some((path, _)) = &excel {
                let _ = state.files.delete(path).await;
            }
            if let Some((path, _)) = &pdf {
                let _ = state.files.delete(path).await;
            }
            return Err(err.into());
        }
    }

    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, log),
        "daily service log updated successfully",
    ))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;

    diesel::delete(daily_service_logs::table.find(id)).execute(&mut conn)?;

    if let Some(path) = &log.excel_file_path {
        let _ = state.files.delete(path).await;
    }
    if let Some(path) = &log.pdf_file_path {
        let _ = state.files.delete(path).await;
    }

    tracing::info!(log_id = %id, log_number = %log.log_number, "daily service log deleted");
    Ok(response::message_only("daily service log deleted successfully"))
}

/// Renders the log as a spreadsheet and stores it under the excel artifact
/// directory. A previously generated spreadsheet is removed once the row
/// points at the new one.
pub async fn generate_excel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<LogResponse>>> {
    let mut conn = state.db()?;
    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    let client: Client = clients::table.find(log.client_id).first(&mut conn)?;

    let bytes = daily_log::render(&log, &client.name)
        .map_err(|err| AppError::internal(format!("failed to render spreadsheet: {err}")))?;

    let now = Utc::now();
    let file_name = daily_log::spreadsheet_filename(&log.log_number, now);
    let path = format!("{}/{}", FileCategory::DailyLogExcel.directory(now), file_name);
    state.files.put(&path, bytes).await?;

    let updated = diesel::update(daily_service_logs::table.find(id))
        .set((
            daily_service_logs::excel_file_path.eq(&path),
            daily_service_logs::excel_file_name.eq(&file_name),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if let Some(old) = &log.excel_file_path {
                if old != &path {
                    let _ = state.files.delete(old).await;
                }
            }
        }
        Err(err) => {
            let _ = state.files.delete(&path).await;
            return Err(err.into());
        }
    }

    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    tracing::info!(log_id = %id, file = %file_name, "daily log spreadsheet generated");
    Ok(response::ok(
        to_response(&state, log),
        "excel file generated successfully",
    ))
}

/// Hands the client a URL it can fetch without an Authorization header,
/// suitable for `window.open` style downloads.
pub async fn download_file(
    State(state): State<AppState>,
    Path((id, file_type)): Path<(Uuid, String)>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    let (_, file_name) = artifact_for(&log, &file_type)?;

    let download_url = format!("/api/daily-logs/public/download/{file_name}");
    Ok(response::ok(
        json!({ "download_url": download_url, "file_name": file_name }),
        "download link generated successfully",
    ))
}

pub async fn download_file_direct(
    State(state): State<AppState>,
    Path((id, file_type)): Path<(Uuid, String)>,
) -> AppResult<Response> {
    let mut conn = state.db()?;
    let log: DailyServiceLog = daily_service_logs::table.find(id).first(&mut conn)?;
    let (path, file_name) = artifact_for(&log, &file_type)?;

    let bytes = state.files.get(&path).await.map_err(|_| {
        AppError::not_found("stored file is missing")
    })?;
    let mime = if file_type == "pdf" { PDF_MIME } else { XLSX_MIME };
    super::file_response(&file_name, mime, bytes, false)
}

/// Unauthenticated download keyed by the stored artifact filename. Both
/// artifact directories are searched; nothing outside them is reachable.
pub async fn public_download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    if filename.contains('/') || filename.contains('\\') {
        return Err(AppError::not_found("file not found"));
    }

    let now = Utc::now();
    for category in [FileCategory::DailyLogExcel, FileCategory::DailyLogPdf] {
        let path = format!("{}/{}", category.directory(now), filename);
        if state.files.exists(&path).await.unwrap_or(false) {
            let bytes = state
                .files
                .get(&path)
                .await
                .map_err(|_| AppError::not_found("file not found"))?;
            let mime = if category == FileCategory::DailyLogPdf {
                PDF_MIME
            } else {
                XLSX_MIME
            };
            return super::file_response(&filename, mime, bytes, false);
        }
    }

    Err(AppError::not_found("file not found"))
}

fn artifact_for(log: &DailyServiceLog, file_type: &str) -> AppResult<(String, String)> {
    let pair = match file_type {
        "excel" => log
            .excel_file_path
            .clone()
            .zip(log.excel_file_name.clone()),
        "pdf" => log.pdf_file_path.clone().zip(log.pdf_file_name.clone()),
        other => {
            return Err(AppError::bad_request(format!(
                "unknown file type {other}, expected excel or pdf"
            )))
        }
    };
    pair.ok_or_else(|| AppError::not_found(format!("no {file_type} file for this log")))
}

fn required_text(form: &FormData, field: &str, errors: &mut ValidationErrors) -> String {
    let value = form.value(field).unwrap_or_default().trim().to_string();
    if value.is_empty() {
        errors.add(field, format!("{field} is required"));
    }
    value
}

fn updated_text(
    form: &FormData,
    field: &str,
    current: &str,
    errors: &mut ValidationErrors,
) -> String {
    match form.value(field) {
        Some(value) if value.trim().is_empty() => {
            errors.add(field, format!("{field} cannot be empty"));
            current.to_string()
        }
        Some(value) => value.trim().to_string(),
        None => current.to_string(),
    }
}

fn optional_uuid(form: &FormData, field: &str, errors: &mut ValidationErrors) -> Option<Uuid> {
    let raw = form.value(field)?;
    match raw.trim().parse() {
        Ok(id) => Some(id),
        Err(_) => {
            errors.add(field, format!("{field} must be a valid UUID"));
            None
        }
    }
}

fn parse_sections(
    form: &FormData,
    errors: &mut ValidationErrors,
) -> [Option<serde_json::Value>; 5] {
    let mut out: [Option<serde_json::Value>; 5] = Default::default();
    for (slot, field) in out.iter_mut().zip(SECTION_FIELDS) {
        match form.json_value(field) {
            Ok(value) => *slot = value,
            Err(err) => errors.add(*field, err.to_string()),
        }
    }
    out
}

fn section_updates(
    form: &FormData,
    existing: &DailyServiceLog,
) -> AppResult<[Option<serde_json::Value>; 5]> {
    let current = [
        existing.personnel.clone(),
        existing.equipment_used.clone(),
        existing.company_rep.clone(),
        existing.approval_1.clone(),
        existing.approval_2.clone(),
    ];
    let mut out = current;
    for (slot, field) in out.iter_mut().zip(SECTION_FIELDS) {
        if form.has_value(field) {
            *slot = form.json_value(field)?;
        }
    }
    Ok(out)
}

fn validated_artifact<'a>(
    form: &'a FormData,
    field: &str,
    category: FileCategory,
    errors: &mut ValidationErrors,
) -> Option<&'a UploadedFile> {
    let file = form.file(field)?;
    for problem in storage::check_upload(category, &file.original_name, file.size()) {
        errors.add(field, problem);
    }
    Some(file)
}

async fn store_artifact(
    state: &AppState,
    upload: Option<&UploadedFile>,
    category: FileCategory,
) -> AppResult<Option<(String, String)>> {
    let Some(file) = upload else {
        return Ok(None);
    };
    let path = storage::build_storage_path(category, &file.original_name, Utc::now());
    state.files.put(&path, file.bytes.clone()).await?;
    let stored_name = path
        .rsplit('/')
        .next()
        .unwrap_or(&file.original_name)
        .to_string();
    Ok(Some((path, stored_name)))
}

fn to_response(state: &AppState, log: DailyServiceLog) -> LogResponse {
    let excel_file_url = log
        .excel_file_path
        .as_deref()
        .map(|path| state.config.public_file_url(path));
    let pdf_file_url = log
        .pdf_file_path
        .as_deref()
        .map(|path| state.config.public_file_url(path));
    LogResponse {
        log,
        excel_file_url,
        pdf_file_url,
    }
}
