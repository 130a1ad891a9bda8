use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ValidationErrors},
    models::{NewTicketIssue, ServiceTicket, TicketIssue},
    schema::{service_tickets, ticket_issues},
    state::AppState,
    utils::{
        pagination::{PageParams, Pagination},
        response::{self, Envelope},
    },
};

pub const ISSUE_STATUSES: &[&str] = &["Open", "In Progress", "Resolved"];

#[derive(Deserialize)]
pub struct ListIssuesParams {
    #[serde(flatten)]
    page: PageParams,
    ticket_id: Option<Uuid>,
    status: Option<String>,
}

pub async fn list_issues(
    State(state): State<AppState>,
    Query(params): Query<ListIssuesParams>,
) -> AppResult<Json<Envelope<Vec<TicketIssue>>>> {
    let mut conn = state.db()?;

    let mut count_query = ticket_issues::table.into_boxed();
    let mut query = ticket_issues::table.into_boxed();
    if let Some(ticket_id) = params.ticket_id {
        count_query = count_query.filter(ticket_issues::ticket_id.eq(ticket_id));
        query = query.filter(ticket_issues::ticket_id.eq(ticket_id));
    }
    if let Some(status) = params.status.as_ref().filter(|s| !s.is_empty()) {
        count_query = count_query.filter(ticket_issues::status.eq(status.clone()));
        query = query.filter(ticket_issues::status.eq(status.clone()));
    }

    let total: i64 = count_query.count().get_result(&mut conn)?;

    query = match (params.page.sort_column(), params.page.descending()) {
        (Some("status"), true) => query.order(ticket_issues::status.desc()),
        (Some("status"), false) => query.order(ticket_issues::status.asc()),
        (Some("created_at"), true) => query.order(ticket_issues::created_at.desc()),
        (Some("created_at"), false) => query.order(ticket_issues::created_at.asc()),
        (_, true) => query.order(ticket_issues::date_reported.desc()),
        (_, false) => query.order(ticket_issues::date_reported.asc()),
    };

    let rows: Vec<TicketIssue> = query
        .offset(params.page.offset())
        .limit(params.page.per_page())
        .load(&mut conn)?;

    let pagination = Pagination::new(params.page.page(), params.page.per_page(), total);
    Ok(response::ok_paginated(
        rows,
        "ticket issues retrieved successfully",
        pagination,
    ))
}

pub async fn issues_by_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let ticket: ServiceTicket = service_tickets::table.find(ticket_id).first(&mut conn)?;

    let issues: Vec<TicketIssue> = ticket_issues::table
        .filter(ticket_issues::ticket_id.eq(ticket_id))
        .order(ticket_issues::date_reported.desc())
        .load(&mut conn)?;

    Ok(response::ok(
        json!({ "ticket": ticket, "issues": issues }),
        "ticket issues retrieved successfully",
    ))
}

pub async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<TicketIssue>>> {
    let mut conn = state.db()?;
    let issue: TicketIssue = ticket_issues::table.find(id).first(&mut conn)?;
    Ok(response::ok(issue, "ticket issue retrieved successfully"))
}

#[derive(Deserialize)]
pub struct IssuePayload {
    pub ticket_id: Option<Uuid>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub remarks: Option<String>,
    pub date_reported: Option<NaiveDate>,
}

pub async fn create_issue(
    State(state): State<AppState>,
    Json(payload): Json<IssuePayload>,
) -> AppResult<(StatusCode, Json<Envelope<TicketIssue>>)> {
    let mut errors = ValidationErrors::new();
    if payload.ticket_id.is_none() {
        errors.add("ticket_id", "ticket_id is required");
    }
    let description = payload.description.as_deref().unwrap_or("").trim().to_string();
    if description.is_empty() {
        errors.add("description", "description is required");
    }
    let status = validate_status(payload.status.as_deref(), None, &mut errors);
    if payload.date_reported.is_none() {
        errors.add("date_reported", "date_reported is required");
    }
    errors.into_result()?;

    let mut conn = state.db()?;
    let ticket_id = payload
        .ticket_id
        .ok_or_else(|| AppError::bad_request("ticket_id missing"))?;
    service_tickets::table
        .find(ticket_id)
        .first::<ServiceTicket>(&mut conn)
        .map_err(|_| AppError::not_found("service ticket not found"))?;

    let new_issue = NewTicketIssue {
        id: Uuid::new_v4(),
        ticket_id,
        description,
        status,
        remarks: payload.remarks.clone(),
        date_reported: payload
            .date_reported
            .ok_or_else(|| AppError::bad_request("date_reported missing"))?,
    };

    diesel::insert_into(ticket_issues::table)
        .values(&new_issue)
        .execute(&mut conn)?;

    let issue: TicketIssue = ticket_issues::table.find(new_issue.id).first(&mut conn)?;
    tracing::info!(issue_id = %issue.id, ticket_id = %ticket_id, "ticket issue created");
    Ok(response::created(issue, "ticket issue created successfully"))
}

pub async fn update_issue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<IssuePayload>,
) -> AppResult<Json<Envelope<TicketIssue>>> {
    let mut conn = state.db()?;
    let existing: TicketIssue = ticket_issues::table.find(id).first(&mut conn)?;

    let mut errors = ValidationErrors::new();
    let description = match payload.description.as_deref() {
        Some(value) if value.trim().is_empty() => {
            errors.add("description", "description cannot be empty");
            existing.description.clone()
        }
        Some(value) => value.trim().to_string(),
        None => existing.description.clone(),
    };
    let status = validate_status(payload.status.as_deref(), Some(&existing.status), &mut errors);
    errors.into_result()?;

    let remarks = payload.remarks.clone().or_else(|| existing.remarks.clone());
    diesel::update(ticket_issues::table.find(id))
        .set((
            ticket_issues::description.eq(&description),
            ticket_issues::status.eq(&status),
            ticket_issues::remarks.eq(&remarks),
            ticket_issues::date_reported
                .eq(payload.date_reported.unwrap_or(existing.date_reported)),
        ))
        .execute(&mut conn)?;

    let issue: TicketIssue = ticket_issues::table.find(id).first(&mut conn)?;
    Ok(response::ok(issue, "ticket issue updated successfully"))
}

pub async fn delete_issue(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Envelope<()>>> {
    let mut conn = state.db()?;
    let affected = diesel::delete(ticket_issues::table.find(id)).execute(&mut conn)?;
    if affected == 0 {
        return Err(AppError::not_found("ticket issue not found"));
    }
    tracing::info!(issue_id = %id, "ticket issue deleted");
    Ok(response::message_only("ticket issue deleted successfully"))
}

fn validate_status(
    raw: Option<&str>,
    current: Option<&str>,
    errors: &mut ValidationErrors,
) -> String {
    match raw {
        None => current.unwrap_or("Open").to_string(),
        Some(value) if ISSUE_STATUSES.contains(&value) => value.to_string(),
        Some(value) => {
            errors.add(
                "status",
                format!("status must be one of: {} (got {value})", ISSUE_STATUSES.join(", ")),
            );
            current.unwrap_or("Open").to_string()
        }
    }
}
