use std::str::FromStr;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bigdecimal::BigDecimal;
use chrono::{NaiveDate, Utc};
use diesel::dsl::sum;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{Client, NewSubAgreement, SubAgreement},
    schema::{clients, sub_agreements},
    state::AppState,
    storage::{self, FileCategory},
    utils::{
        multipart::FormData,
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

#[derive(Serialize)]
pub struct AgreementResponse {
    #[serde(flatten)]
    pub agreement: SubAgreement,
    pub document_url: Option<String>,
}

#[derive(Deserialize)]
pub struct ListAgreementsParams {
    #[serde(flatten)]
    page: PageParams,
    client_id: Option<Uuid>,
    search: Option<String>,
}

pub async fn list_agreements(
    State(state): State<AppState>,
    Query(params): Query<ListAgreementsParams>,
) -> AppResult<Json<Envelope<Vec<AgreementResponse>>>> {
    let mut conn = state.db()?;

    let mut count_query = sub_agreements::table.into_boxed();
    let mut query = sub_agreements::table.into_boxed();
    if let Some(client_id) = params.client_id {
        count_query = count_query.filter(sub_agreements::client_id.eq(client_id));
        query = query.filter(sub_agreements::client_id.eq(client_id));
    }
    if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        count_query = count_query.filter(sub_agreements::name.ilike(pattern.clone()));
        query = query.filter(sub_agreements::name.ilike(pattern));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("name"), true) => query.order(sub_agreements::name.desc()),
        (Some("name"), false) => query.order(sub_agreements::name.asc()),
        (Some("amount"), true) => query.order(sub_agreements::amount.desc()),
        (Some("amount"), false) => query.order(sub_agreements::amount.asc()),
        (Some("balance"), true) => query.order(sub_agreements::balance.desc()),
        (Some("balance"), false) => query.order(sub_agreements::balance.asc()),
        (Some("start_date"), true) => query.order(sub_agreements::start_date.desc()),
        (Some("start_date"), false) => query.order(sub_agreements::start_date.asc()),
        (Some("end_date"), true) => query.order(sub_agreements::end_date.desc()),
        (Some("end_date"), false) => query.order(sub_agreements::end_date.asc()),
        (_, true) => query.order(sub_agreements::created_at.desc()),
        (_, false) => query.order(sub_agreements::created_at.asc()),
    };

    let rows: Vec<SubAgreement> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows
        .into_iter()
        .map(|agreement| to_response(&state, agreement))
        .collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "sub-agreements retrieved successfully",
        pagination,
    ))
}

pub async fn agreement_stats(
    State(state): State<AppState>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let today = Utc::now().date_naive();

    let total: i64 = sub_agreements::table.count().get_result(&mut conn)?;
    let total_amount: Option<BigDecimal> = sub_agreements::table
        .select(sum(sub_agreements::amount))
        .first(&mut conn)?;
    let total_balance: Option<BigDecimal> = sub_agreements::table
        .select(sum(sub_agreements::balance))
        .first(&mut conn)?;
    let active: i64 = sub_agreements::table
        .filter(sub_agreements::end_date.ge(today))
        .count()
        .get_result(&mut conn)?;
    let expired: i64 = sub_agreements::table
        .filter(sub_agreements::end_date.lt(today))
        .count()
        .get_result(&mut conn)?;

    let stats = json!({
        "total_agreements": total,
        "total_amount": total_amount.unwrap_or_default(),
        "total_balance": total_balance.unwrap_or_default(),
        "active_agreements": active,
        "expired_agreements": expired,
    });
    Ok(response::ok(stats, "sub-agreement statistics retrieved successfully"))
}

pub async fn agreements_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(client_id).first(&mut conn)?;

    let rows: Vec<SubAgreement> = sub_agreements::table
        .filter(sub_agreements::client_id.eq(client_id))
        .order(sub_agreements::created_at.desc())
        .load(&mut conn)?;
    let agreements: Vec<AgreementResponse> = rows
        .into_iter()
        .map(|agreement| to_response(&state, agreement))
        .collect();

    Ok(response::ok(
        json!({ "client": client, "sub_agreements": agreements }),
        "client sub-agreements retrieved successfully",
    ))
}

pub async fn get_agreement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<AgreementResponse>>> {
    let mut conn = state.db()?;
    let agreement: SubAgreement = sub_agreements::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, agreement),
        "sub-agreement retrieved successfully",
    ))
}

pub async fn create_agreement(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Envelope<AgreementResponse>>)> {
    let form = FormData::read(&mut multipart).await?;

    let mut errors = ValidationErrors::new();
    let client_id = required_uuid(&form, "client_id", &mut errors);
    let name = form.value("name").unwrap_or_default().trim().to_string();
    if name.is_empty() {
        errors.add("name", "name is required");
    }
    let amount = required_money(&form, "amount", &mut errors);
    let balance = required_money(&form, "balance", &mut errors);
    let start_date = required_date(&form, "start_date", &mut errors);
    let end_date = required_date(&form, "end_date", &mut errors);
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if end <= start {
            errors.add("end_date", "end date must be after the start date");
        }
    }

    let document = form.file("document");
    if let Some(file) = document {
        for problem in storage::check_upload(
            FileCategory::AgreementDocuments,
            &file.original_name,
            file.size(),
        ) {
            errors.add("document", problem);
        }
    }
    errors.into_result()?;

    let mut conn = state.db()?;
    let client_id = client_id.ok_or_else(|| AppError::bad_request("client_id missing"))?;
    // Referencing a missing client is a validation problem, not a 500.
    clients::table
        .find(client_id)
        .first::<Client>(&mut conn)
        .map_err(|_| AppError::not_found("client not found"))?;

    let mut document_path = None;
    let mut document_name = None;
    if let Some(file) = document {
        let path = storage::build_storage_path(
            FileCategory::AgreementDocuments,
            &file.original_name,
            Utc::now(),
        );
        state.files.put(&path, file.bytes.clone()).await?;
        document_path = Some(path);
        document_name = Some(file.original_name.clone());
    }

    let new_agreement = NewSubAgreement {
        id: Uuid::new_v4(),
        client_id,
        name,
        amount: amount.ok_or_else(|| AppError::bad_request("amount missing"))?,
        balance: balance.ok_or_else(|| AppError::bad_request("balance missing"))?,
        start_date: start_date.ok_or_else(|| AppError::bad_request("start_date missing"))?,
        end_date: end_date.ok_or_else(|| AppError::bad_request("end_date missing"))?,
        document_path: document_path.clone(),
        document_name,
    };

    let inserted = diesel::insert_into(sub_agreements::table)
        .values(&new_agreement)
        .execute(&mut conn);
    if let Err(err) = inserted {
        if let Some(path) = document_path {
            let _ = state.files.delete(&path).await;
        }
        return Err(err.into());
    }

    let agreement: SubAgreement = sub_agreements::table
        .find(new_agreement.id)
        .first(&mut conn)?;
    tracing::info!(agreement_id = %agreement.id, client_id = %client_id, "sub-agreement created");
    Ok(response::created(
        to_response(&state, agreement),
        "sub-agreement created successfully",
    ))
}

pub async fn update_agreement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> AppResult<Json<Envelope<AgreementResponse>>> {
    let form = FormData::read(&mut multipart).await?;

    let mut conn = state.db()?;
    let existing: SubAgreement = sub_agreements::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let name = match form.value("name") {
        Some(value) if value.trim().is_empty() => {
            errors.add("name", "name cannot be empty");
            existing.name.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.name.clone(),
    };
    let amount = optional_money(&form, "amount", &mut errors).unwrap_or(existing.amount.clone());
    let balance = optional_money(&form, "balance", &mut errors).unwrap_or(existing.balance.clone());
    let start_date = optional_date(&form, "start_date", &mut errors).unwrap_or(existing.start_date);
    let end_date = optional_date(&form, "end_date", &mut errors).unwrap_or(existing.end_date);
    if end_date <= start_date {
        errors.add("end_date", "end date must be after the start date");
    }

    let document = form.file("document");
    if let Some(file) = document {
        for problem in storage::check_upload(
            FileCategory::AgreementDocuments,
            &file.original_name,
            file.size(),
        ) {
            errors.add("document", problem);
        }
    }
    errors.into_result()?;

    let mut new_path = None;
    let mut new_name = existing.document_name.clone();
    if let Some(file) = document {
        let path = storage::build_storage_path(
            FileCategory::AgreementDocuments,
            &file.original_name,
            Utc::now(),
        );
        state.files.put(&path, file.bytes.clone()).await?;
        new_path = Some(path);
        new_name = Some(file.original_name.clone());
    }

    let path_for_row = new_path.clone().or_else(|| existing.document_path.clone());
    let updated = diesel::update(sub_agreements::table.find(id))
        .set((
            sub_agreements::name.eq(&name),
            sub_agreements::amount.eq(&amount),
            sub_agreements::balance.eq(&balance),
            sub_agreements::start_date.eq(start_date),
            sub_agreements::end_date.eq(end_date),
            sub_agreements::document_path.eq(&path_for_row),
            sub_agreements::document_name.eq(&new_name),
        ))
        .execute(&mut conn);

    match updated {
        Ok(_) => {
            if new_path.is_some() {
                if let Some(old) = existing.document_path {
                    let _ = state.files.delete(&old).await;
                }
            }
        }
        Err(err) => {
            if let Some(path) = new_path {
                let _ = state.files.delete(&path).await;
            }
            return Err(err.into());
        }
    }

    let agreement: SubAgreement = sub_agreements::table.find(id).first(&mut conn)?;
    Ok(response::ok(
        to_response(&state, agreement),
        "sub-agreement updated successfully",
    ))
}

pub async fn delete_agreement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let agreement: SubAgreement = sub_agreements::table.find(id).first(&mut conn)?;

    diesel::delete(sub_agreements::table.find(id)).execute(&mut conn)?;

    if let Some(path) = agreement.document_path {
        let _ = state.files.delete(&path).await;
    }

    tracing::info!(agreement_id = %id, "sub-agreement deleted");
    Ok(response::message_only("sub-agreement deleted successfully"))
}

fn to_response(state: &AppState, agreement: SubAgreement) -> AgreementResponse {
    let document_url = agreement
        .document_path
        .as_deref()
        .map(|path| state.config.public_file_url(path));
    AgreementResponse {
        agreement,
        document_url,
    }
}

pub(crate) fn required_uuid(
    form: &FormData,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<Uuid> {
    match form.value(field) {
        None => {
            errors.add(field, format!("{field} is required"));
            None
        }
        Some(raw) => match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                errors.add(field, format!("{field} must be a valid UUID"));
                None
            }
        },
    }
}

pub(crate) fn required_date(
    form: &FormData,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
    match form.value(field) {
        None => {
            errors.add(field, format!("{field} is required"));
            None
        }
        Some(raw) => parse_date(raw, field, errors),
    }
}

pub(crate) fn optional_date(
    form: &FormData,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<NaiveDate> {
    form.value(field)
        .and_then(|raw| parse_date(raw, field, errors))
}

fn parse_date(raw: &str, field: &str, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add(field, format!("{field} must be a YYYY-MM-DD date"));
            None
        }
    }
}

fn required_money(
    form: &FormData,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<BigDecimal> {
    match form.value(field) {
        None => {
            errors.add(field, format!("{field} is required"));
            None
        }
        Some(raw) => parse_money(raw, field, errors),
    }
}

fn optional_money(
    form: &FormData,
    field: &str,
    errors: &mut ValidationErrors,
) -> Option<BigDecimal> {
    form.value(field)
        .and_then(|raw| parse_money(raw, field, errors))
}

fn parse_money(raw: &str, field: &str, errors: &mut ValidationErrors) -> Option<BigDecimal> {
    match BigDecimal::from_str(raw.trim()) {
        Ok(value) if value >= BigDecimal::from(0) => Some(value),
        Ok(_) => {
            errors.add(field, format!("{field} must not be negative"));
            None
        }
        Err(_) => {
            errors.add(field, format!("{field} must be a decimal number"));
            None
        }
    }
}
