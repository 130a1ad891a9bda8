use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{
        CallOutJob, Client, DailyServiceLog, NewServiceTicket, ServiceTicket, SubAgreement,
        TicketIssue,
    },
    numbering::{self, MAX_NUMBERING_ATTEMPTS, SERVICE_TICKET_PREFIX},
    schema::{call_out_jobs, clients, daily_service_logs, service_tickets, sub_agreements, ticket_issues},
    state::AppState,
    utils::{
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

pub const TICKET_STATUSES: &[&str] = &["In Field to Sign", "Issue", "Delivered", "Invoiced"];

#[derive(Serialize)]
pub struct TicketResponse {
    #[serde(flatten)]
    pub ticket: ServiceTicket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<TicketIssue>>,
}

#[derive(Deserialize)]
pub struct ListTicketsParams {
    #[serde(flatten)]
    page: PageParams,
    client_id: Option<Uuid>,
    status: Option<String>,
    search: Option<String>,
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<ListTicketsParams>,
) -> AppResult<Json<Envelope<Vec<TicketResponse>>>> {
    let mut conn = state.db()?;

    let mut count_query = service_tickets::table.into_boxed();
    let mut query = service_tickets::table.into_boxed();
    if let Some(client_id) = params.client_id {
        count_query = count_query.filter(service_tickets::client_id.eq(client_id));
        query = query.filter(service_tickets::client_id.eq(client_id));
    }
    if let Some(status) = params.status.as_ref().filter(|s| !s.is_empty()) {
        count_query = count_query.filter(service_tickets::status.eq(status.clone()));
        query = query.filter(service_tickets::status.eq(status.clone()));
    }
    if let Some(search) = params.search.as_ref().filter(|s| !s.trim().is_empty()) {
        let pattern = format!("%{}%", search.trim());
        count_query = count_query.filter(service_tickets::ticket_number.ilike(pattern.clone()));
        query = query.filter(service_tickets::ticket_number.ilike(pattern));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("date"), true) => query.order(service_tickets::date.desc()),
        (Some("date"), false) => query.order(service_tickets::date.asc()),
        (Some("amount"), true) => query.order(service_tickets::amount.desc()),
        (Some("amount"), false) => query.order(service_tickets::amount.asc()),
        (Some("status"), true) => query.order(service_tickets::status.desc()),
        (Some("status"), false) => query.order(service_tickets::status.asc()),
        (Some("created_at"), true) => query.order(service_tickets::created_at.desc()),
        (Some("created_at"), false) => query.order(service_tickets::created_at.asc()),
        (_, true) => query.order(service_tickets::ticket_number.desc()),
        (_, false) => query.order(service_tickets::ticket_number.asc()),
    };

    let rows: Vec<ServiceTicket> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let data = rows
        .into_iter()
        .map(|ticket| TicketResponse { ticket, issues: None })
        .collect();
    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        data,
        "service tickets retrieved successfully",
        pagination,
    ))
}

pub async fn tickets_by_client(
    State(state): State<AppState>,
    Path(client_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let client: Client = clients::table.find(client_id).first(&mut conn)?;

    let tickets: Vec<ServiceTicket> = service_tickets::table
        .filter(service_tickets::client_id.eq(client_id))
        .order(service_tickets::created_at.desc())
        .load(&mut conn)?;

    Ok(response::ok(
        json!({ "client": client, "service_tickets": tickets }),
        "client service tickets retrieved successfully",
    ))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<TicketResponse>>> {
    let mut conn = state.db()?;
    let ticket: ServiceTicket = service_tickets::table.find(id).first(&mut conn)?;
    let issues: Vec<TicketIssue> = ticket_issues::table
        .filter(ticket_issues::ticket_id.eq(id))
        .order(ticket_issues::date_reported.desc())
        .load(&mut conn)?;

    Ok(response::ok(
        TicketResponse {
            ticket,
            issues: Some(issues),
        },
        "service ticket retrieved successfully",
    ))
}

#[derive(Deserialize)]
pub struct TicketPayload {
    pub client_id: Option<Uuid>,
    pub sub_agreement_id: Option<Uuid>,
    pub call_out_job_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub amount: Option<serde_json::Value>,
    pub related_log_ids: Option<Vec<Uuid>>,
    pub documents: Option<Vec<String>>,
}

pub async fn create_ticket(
    State(state): State<AppState>,
    Json(payload): Json<TicketPayload>,
) -> AppResult<(StatusCode, Json<Envelope<TicketResponse>>)> {
    let mut conn = state.db()?;
    let fields = validate_ticket_payload(&mut conn, &payload, false)?;

    let ticket = insert_with_fresh_number(&mut conn, fields)?;
    tracing::info!(ticket_id = %ticket.id, ticket_number = %ticket.ticket_number, "service ticket created");
    Ok(response::created(
        TicketResponse { ticket, issues: None },
        "service ticket created successfully",
    ))
}

/// Builds a billing ticket covering one or more daily logs. The logs must
/// exist and belong to the named client.
pub async fn generate_from_logs(
    State(state): State<AppState>,
    Json(payload): Json<TicketPayload>,
) -> AppResult<(StatusCode, Json<Envelope<TicketResponse>>)> {
    let mut conn = state.db()?;
    let fields = validate_ticket_payload(&mut conn, &payload, true)?;

    let ticket = insert_with_fresh_number(&mut conn, fields)?;
    tracing::info!(
        ticket_id = %ticket.id,
        ticket_number = %ticket.ticket_number,
        "service ticket generated from logs"
    );
    Ok(response::created(
        TicketResponse { ticket, issues: None },
        "service ticket generated from logs successfully",
    ))
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TicketPayload>,
) -> AppResult<Json<Envelope<TicketResponse>>> {
    let mut conn = state.db()?;
    let existing: ServiceTicket = service_tickets::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let status = match payload.status.as_deref() {
        None => existing.status.clone(),
        Some(raw) if TICKET_STATUSES.contains(&raw) => raw.to_string(),
        Some(raw) => {
            errors.add(
                "status",
                format!("status must be one of: {} (got {raw})", TICKET_STATUSES.join(", ")),
            );
            existing.status.clone()
        }
    };
    let amount = match payload.amount.as_ref() {
        None => existing.amount.clone(),
        Some(raw) => match parse_money(raw) {
            Some(amount) if amount >= BigDecimal::zero() => amount,
            Some(_) => {
                errors.add("amount", "amount must not be negative");
                existing.amount.clone()
            }
            None => {
                errors.add("amount", "amount must be a decimal number");
                existing.amount.clone()
            }
        },
    };
    errors.into_result()?;

    if let Some(agreement_id) = payload.sub_agreement_id {
        sub_agreements::table
            .find(agreement_id)
            .first::<SubAgreement>(&mut conn)
            .map_err(|_| AppError::not_found("sub-agreement not found"))?;
    }
    if let Some(job_id) = payload.call_out_job_id {
        call_out_jobs::table
            .find(job_id)
            .first::<CallOutJob>(&mut conn)
            .map_err(|_| AppError::not_found("call-out job not found"))?;
    }
    if let Some(log_ids) = payload.related_log_ids.as_ref() {
        check_logs_exist(&mut conn, log_ids, existing.client_id)?;
    }

    let related_log_ids = payload
        .related_log_ids
        .as_ref()
        .map(|ids| json!(ids))
        .or_else(|| existing.related_log_ids.clone());
    let documents = payload
        .documents
        .as_ref()
        .map(|docs| json!(docs))
        .or_else(|| existing.documents.clone());

    diesel::update(service_tickets::table.find(id))
        .set((
            service_tickets::sub_agreement_id
                .eq(payload.sub_agreement_id.or(existing.sub_agreement_id)),
            service_tickets::call_out_job_id
                .eq(payload.call_out_job_id.or(existing.call_out_job_id)),
            service_tickets::date.eq(payload.date.unwrap_or(existing.date)),
            service_tickets::status.eq(&status),
            service_tickets::amount.eq(&amount),
            service_tickets::related_log_ids.eq(&related_log_ids),
            service_tickets::documents.eq(&documents),
        ))
        .execute(&mut conn)?;

    let ticket: ServiceTicket = service_tickets::table.find(id).first(&mut conn)?;
    let issues: Vec<TicketIssue> = ticket_issues::table
        .filter(ticket_issues::ticket_id.eq(id))
        .order(ticket_issues::date_reported.desc())
        .load(&mut conn)?;
    Ok(response::ok(
        TicketResponse {
            ticket,
            issues: Some(issues),
        },
        "service ticket updated successfully",
    ))
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let affected = diesel::delete(service_tickets::table.find(id)).execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::not_found("service ticket not found"));
    }
    tracing::info!(ticket_id = %id, "service ticket deleted");
    Ok(response::message_only("service ticket deleted successfully"))
}

struct TicketFields {
    client_id: Uuid,
    sub_agreement_id: Option<Uuid>,
    call_out_job_id: Option<Uuid>,
    date: NaiveDate,
    status: String,
    amount: BigDecimal,
    related_log_ids: Option<serde_json::Value>,
    documents: Option<serde_json::Value>,
}

fn validate_ticket_payload(
    conn: &mut diesel::PgConnection,
    payload: &TicketPayload,
    logs_required: bool,
) -> AppResult<TicketFields> {
    let mut errors = ValidationErrors::new();

    if payload.client_id.is_none() {
        errors.add("client_id", "client_id is required");
    }
    if payload.date.is_none() {
        errors.add("date", "date is required");
    }
    let status = match payload.status.as_deref() {
        None => {
            errors.add("status", "status is required");
            String::new()
        }
        Some(raw) if TICKET_STATUSES.contains(&raw) => raw.to_string(),
        Some(raw) => {
            errors.add(
                "status",
                format!("status must be one of: {} (got {raw})", TICKET_STATUSES.join(", ")),
            );
            String::new()
        }
    };
    let amount = match payload.amount.as_ref() {
        None => {
            errors.add("amount", "amount is required");
            None
        }
        Some(raw) => match parse_money(raw) {
            Some(amount) if amount >= BigDecimal::zero() => Some(amount),
            Some(_) => {
                errors.add("amount", "amount must not be negative");
                None
            }
            None => {
                errors.add("amount", "amount must be a decimal number");
                None
            }
        },
    };
    if logs_required && payload.related_log_ids.as_ref().map_or(true, Vec::is_empty) {
        errors.add("log_ids", "at least one daily log is required");
    }
    errors.into_result()?;

    let client_id = payload
        .client_id
        .ok_or_else(|| AppError::bad_request("client_id missing"))?;
    clients::table
        .find(client_id)
        .first::<Client>(conn)
        .map_err(|_| AppError::not_found("client not found"))?;
    if let Some(agreement_id) = payload.sub_agreement_id {
        sub_agreements::table
            .find(agreement_id)
            .first::<SubAgreement>(conn)
            .map_err(|_| AppError::not_found("sub-agreement not found"))?;
    }
    if let Some(job_id) = payload.call_out_job_id {
        call_out_jobs::table
            .find(job_id)
            .first::<CallOutJob>(conn)
            .map_err(|_| AppError::not_found("call-out job not found"))?;
    }
    if let Some(log_ids) = payload.related_log_ids.as_ref() {
        check_logs_exist(conn, log_ids, client_id)?;
    }

    Ok(TicketFields {
        client_id,
        sub_agreement_id: payload.sub_agreement_id,
        call_out_job_id: payload.call_out_job_id,
        date: payload.date.ok_or_else(|| AppError::bad_request("date missing"))?,
        status,
        amount: amount.ok_or_else(|| AppError::bad_request("amount missing"))?,
        related_log_ids: payload.related_log_ids.as_ref().map(|ids| json!(ids)),
        documents: payload.documents.as_ref().map(|docs| json!(docs)),
    })
}

fn check_logs_exist(
    conn: &mut diesel::PgConnection,
    log_ids: &[Uuid],
    client_id: Uuid,
) -> AppResult<()> {
    for log_id in log_ids {
        let log: DailyServiceLog = daily_service_logs::table
            .find(log_id)
            .first(conn)
            .map_err(|_| AppError::not_found(format!("daily log {log_id} not found")))?;
        if log.client_id != client_id {
            return Err(AppError::bad_request(format!(
                "daily log {log_id} belongs to a different client"
            )));
        }
    }
    Ok(())
}

fn insert_with_fresh_number(
    conn: &mut diesel::PgConnection,
    fields: TicketFields,
) -> AppResult<ServiceTicket> {
    for _attempt in 0..MAX_NUMBERING_ATTEMPTS {
        let last: Option<String> = service_tickets::table
            .select(service_tickets::ticket_number)
            .filter(service_tickets::ticket_number.like(format!("{SERVICE_TICKET_PREFIX}%")))
            .order(service_tickets::ticket_number.desc())
            .first(conn)
            .optional()?;
        let ticket_number = numbering::next_number(SERVICE_TICKET_PREFIX, last.as_deref());

        let new_ticket = NewServiceTicket {
            id: Uuid::new_v4(),
            ticket_number,
            client_id: fields.client_id,
            sub_agreement_id: fields.sub_agreement_id,
            call_out_job_id: fields.call_out_job_id,
            date: fields.date,
            status: fields.status.clone(),
            amount: fields.amount.clone(),
            related_log_ids: fields.related_log_ids.clone(),
            documents: fields.documents.clone(),
        };

        match diesel::insert_into(service_tickets::table)
            .values(&new_ticket)
            .execute(conn)
        {
            Ok(_) => {
                return Ok(service_tickets::table.find(new_ticket.id).first(conn)?);
            }
            // Lost the numbering race; recompute from the fresh maximum.
            Err(err) if numbering::is_unique_violation(&err) => continue,
            Err(err) => return Err(err.into()),
        }
    }
    Err(AppError::conflict("could not allocate a ticket number, try again"))
}

/// Amounts arrive either as JSON numbers or as strings, both are accepted.
fn parse_money(value: &serde_json::Value) -> Option<BigDecimal> {
    match value {
        serde_json::Value::String(raw) => BigDecimal::from_str(raw.trim()).ok(),
        serde_json::Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_accepts_strings_and_numbers() {
        assert_eq!(
            parse_money(&json!("1250.50")),
            BigDecimal::from_str("1250.50").ok()
        );
        assert_eq!(parse_money(&json!(99)), BigDecimal::from_str("99").ok());
        assert!(parse_money(&json!(null)).is_none());
        assert!(parse_money(&json!("not a number")).is_none());
    }
}
