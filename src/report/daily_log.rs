//! Lays out the daily service log report worksheet.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::DailyServiceLog;

use super::xlsx::{build_workbook, Sheet, XlsxError};

/// First worksheet row available to the tabular sections under the header
/// block. The first populated section always starts here; later sections
/// start two rows below the first free row after the previous one.
const FIRST_SECTION_ROW: u32 = 12;

pub fn spreadsheet_filename(log_number: &str, now: DateTime<Utc>) -> String {
    format!(
        "daily_service_log_{}_{}.xlsx",
        log_number,
        now.format("%Y-%m-%d_%H-%M-%S")
    )
}

pub fn render(log: &DailyServiceLog, client_name: &str) -> Result<Vec<u8>, XlsxError> {
    let sheet = layout(log, client_name);
    build_workbook(&log.log_number, &sheet)
}

pub fn layout(log: &DailyServiceLog, client_name: &str) -> Sheet {
    let mut sheet = Sheet::new();

    sheet.set(1, 1, "Daily Service Log");
    sheet.set(2, 1, format!("Log Number: {}", log.log_number));
    sheet.set(3, 1, format!("Date: {}", log.date.format("%Y-%m-%d")));

    sheet.set(5, 1, "Client:");
    sheet.set(5, 2, client_name);
    sheet.set(6, 1, "Field:");
    sheet.set(6, 2, log.field.clone());
    sheet.set(7, 1, "Well:");
    sheet.set(7, 2, log.well.clone());
    sheet.set(8, 1, "Contract:");
    sheet.set(8, 2, log.contract.clone());
    sheet.set(9, 1, "Job No:");
    sheet.set(9, 2, log.job_no.clone());

    if let Some(linked_job_id) = log.linked_job_id {
        sheet.set(10, 1, "Linked Job ID:");
        sheet.set(10, 2, linked_job_id.to_string());
    }

    // Tracks the first free row after the previous section, if any section
    // has been written yet.
    let mut next_free: Option<u32> = None;

    if let Some(people) = non_empty_array(log.personnel.as_ref()) {
        let start = section_start(next_free);
        sheet.set(start, 1, "Personnel:");
        sheet.set(start + 1, 1, "Name");
        sheet.set(start + 1, 2, "Position");
        sheet.set(start + 1, 3, "Hours");
        let mut row = start + 2;
        for person in people {
            sheet.set(row, 1, field_text(person, "name"));
            sheet.set(row, 2, field_text(person, "position"));
            sheet.set(row, 3, field_text(person, "hours"));
            row += 1;
        }
        next_free = Some(row);
    }

    if let Some(equipment) = non_empty_array(log.equipment_used.as_ref()) {
        let start = section_start(next_free);
        sheet.set(start, 1, "Equipment Used:");
        sheet.set(start + 1, 1, "Name");
        sheet.set(start + 1, 2, "Hours");
        let mut row = start + 2;
        for item in equipment {
            sheet.set(row, 1, field_text(item, "name"));
            sheet.set(row, 2, field_text(item, "hours"));
            row += 1;
        }
        next_free = Some(row);
    }

    if let Some(reps) = non_empty_array(log.company_rep.as_ref()) {
        let start = section_start(next_free);
        sheet.set(start, 1, "Company Representatives:");
        sheet.set(start + 1, 1, "Name");
        sheet.set(start + 1, 2, "Position");
        let mut row = start + 2;
        for rep in reps {
            sheet.set(row, 1, field_text(rep, "name"));
            sheet.set(row, 2, field_text(rep, "position"));
            row += 1;
        }
        next_free = Some(row);
    }

    let approval_1 = log.approval_1.as_ref().filter(|v| !v.is_null());
    let approval_2 = log.approval_2.as_ref().filter(|v| !v.is_null());
    if approval_1.is_some() || approval_2.is_some() {
        let start = section_start(next_free);
        sheet.set(start, 1, "Approvals:");
        if let Some(approval) = approval_1 {
            sheet.set(start + 1, 1, "Approval 1:");
            sheet.set(start + 1, 2, field_text(approval, "name"));
            sheet.set(start + 1, 3, field_text(approval, "date"));
        }
        if let Some(approval) = approval_2 {
            sheet.set(start + 2, 1, "Approval 2:");
            sheet.set(start + 2, 2, field_text(approval, "name"));
            sheet.set(start + 2, 3, field_text(approval, "date"));
        }
    }

    sheet
}

fn section_start(next_free: Option<u32>) -> u32 {
    match next_free {
        Some(row) => row + 2,
        None => FIRST_SECTION_ROW,
    }
}

fn non_empty_array(value: Option<&Value>) -> Option<&Vec<Value>> {
    value.and_then(Value::as_array).filter(|arr| !arr.is_empty())
}

fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}
