use axum::{extract::State, Json};
use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use serde_json::json;

use crate::{
    error::AppResult,
    schema::{call_out_jobs, clients, daily_service_logs, service_tickets, sub_agreements},
    state::AppState,
    utils::response::{self, Envelope},
};

pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Envelope<serde_json::Value>>> {
    let mut conn = state.db()?;
    let today = Utc::now().date_naive();

    let clients_count: i64 = clients::table.count().get_result(&mut conn)?;
    let sub_agreements_count: i64 = sub_agreements::table.count().get_result(&mut conn)?;
    let call_out_jobs_count: i64 = call_out_jobs::table.count().get_result(&mut conn)?;
    let service_tickets_count: i64 = service_tickets::table.count().get_result(&mut conn)?;
    let daily_logs_count: i64 = daily_service_logs::table.count().get_result(&mut conn)?;

    let total_amount: Option<BigDecimal> = sub_agreements::table
        .select(diesel::dsl::sum(sub_agreements::amount))
        .first(&mut conn)?;
    let total_balance: Option<BigDecimal> = sub_agreements::table
        .select(diesel::dsl::sum(sub_agreements::balance))
        .first(&mut conn)?;

    let active_agreements: i64 = sub_agreements::table
        .filter(sub_agreements::end_date.ge(today))
        .count()
        .get_result(&mut conn)?;
    let expired_agreements: i64 = sub_agreements::table
        .filter(sub_agreements::end_date.lt(today))
        .count()
        .get_result(&mut conn)?;

    let stats = json!({
        "clients_count": clients_count,
        "sub_agreements_count": sub_agreements_count,
        "call_out_jobs_count": call_out_jobs_count,
        "service_tickets_count": service_tickets_count,
        "daily_logs_count": daily_logs_count,
        "total_agreements_amount": total_amount.map(|v| v.to_string()),
        "total_agreements_balance": total_balance.map(|v| v.to_string()),
        "active_agreements": active_agreements,
        "expired_agreements": expired_agreements,
    });
    Ok(response::ok(stats, "dashboard statistics retrieved successfully"))
}
