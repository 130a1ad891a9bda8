use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub avatar_path: Option<String>,
    pub role: String,
    pub approved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_path: Option<String>,
    pub role: String,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = refresh_tokens)]
#[diesel(belongs_to(User))]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = clients)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub logo_path: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = clients)]
pub struct NewClient {
    pub id: Uuid,
    pub name: String,
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = contact_people)]
#[diesel(belongs_to(Client))]
pub struct ContactPerson {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = contact_people)]
pub struct NewContactPerson {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = sub_agreements)]
#[diesel(belongs_to(Client))]
pub struct SubAgreement {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub balance: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub document_path: Option<String>,
    pub document_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = sub_agreements)]
pub struct NewSubAgreement {
    pub id: Uuid,
    pub client_id: Uuid,
    pub name: String,
    pub amount: BigDecimal,
    pub balance: BigDecimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub document_path: Option<String>,
    pub document_name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = call_out_jobs)]
#[diesel(belongs_to(Client))]
pub struct CallOutJob {
    pub id: Uuid,
    pub client_id: Uuid,
    pub job_name: String,
    pub work_order_number: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub documents: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = call_out_jobs)]
pub struct NewCallOutJob {
    pub id: Uuid,
    pub client_id: Uuid,
    pub job_name: String,
    pub work_order_number: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub documents: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = daily_service_logs)]
#[diesel(belongs_to(Client))]
pub struct DailyServiceLog {
    pub id: Uuid,
    pub log_number: String,
    pub client_id: Uuid,
    pub field: String,
    pub well: String,
    pub contract: String,
    pub job_no: String,
    pub date: NaiveDate,
    pub linked_job_id: Option<Uuid>,
    pub personnel: Option<serde_json::Value>,
    pub equipment_used: Option<serde_json::Value>,
    pub company_rep: Option<serde_json::Value>,
    pub approval_1: Option<serde_json::Value>,
    pub approval_2: Option<serde_json::Value>,
    pub excel_file_path: Option<String>,
    pub excel_file_name: Option<String>,
    pub pdf_file_path: Option<String>,
    pub pdf_file_name: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = daily_service_logs)]
pub struct NewDailyServiceLog {
    pub id: Uuid,
    pub log_number: String,
    pub client_id: Uuid,
    pub field: String,
    pub well: String,
    pub contract: String,
    pub job_no: String,
    pub date: NaiveDate,
    pub linked_job_id: Option<Uuid>,
    pub personnel: Option<serde_json::Value>,
    pub equipment_used: Option<serde_json::Value>,
    pub company_rep: Option<serde_json::Value>,
    pub approval_1: Option<serde_json::Value>,
    pub approval_2: Option<serde_json::Value>,
    pub excel_file_path: Option<String>,
    pub excel_file_name: Option<String>,
    pub pdf_file_path: Option<String>,
    pub pdf_file_name: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = service_tickets)]
#[diesel(belongs_to(Client))]
pub struct ServiceTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub client_id: Uuid,
    pub sub_agreement_id: Option<Uuid>,
    pub call_out_job_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: String,
    pub amount: BigDecimal,
    pub related_log_ids: Option<serde_json::Value>,
    pub documents: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = service_tickets)]
pub struct NewServiceTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub client_id: Uuid,
    pub sub_agreement_id: Option<Uuid>,
    pub call_out_job_id: Option<Uuid>,
    pub date: NaiveDate,
    pub status: String,
    pub amount: BigDecimal,
    pub related_log_ids: Option<serde_json::Value>,
    pub documents: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = ticket_issues)]
#[diesel(belongs_to(ServiceTicket, foreign_key = ticket_id))]
pub struct TicketIssue {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub description: String,
    pub status: String,
    pub remarks: Option<String>,
    pub date_reported: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ticket_issues)]
pub struct NewTicketIssue {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub description: String,
    pub status: String,
    pub remarks: Option<String>,
    pub date_reported: NaiveDate,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Serialize)]
#[diesel(table_name = documents)]
#[diesel(belongs_to(Client))]
pub struct Document {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub mime_type: String,
    pub category: String,
    pub tags: Option<serde_json::Value>,
    pub client_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub is_public: bool,
    pub download_count: i32,
    pub expiry_date: Option<NaiveDate>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = documents)]
pub struct NewDocument {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub file_type: String,
    pub mime_type: String,
    pub category: String,
    pub tags: Option<serde_json::Value>,
    pub client_id: Option<Uuid>,
    pub uploaded_by: Uuid,
    pub is_public: bool,
    pub expiry_date: Option<NaiveDate>,
}
