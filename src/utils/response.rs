use axum::{http::StatusCode, Json};
use serde::Serialize;

use super::pagination::Pagination;

/// Success envelope shared by every JSON endpoint.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

pub fn ok<T: Serialize>(data: T, message: impl Into<String>) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        message: message.into(),
        pagination: None,
    })
}

pub fn ok_paginated<T: Serialize>(
    data: T,
    message: impl Into<String>,
    pagination: Pagination,
) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        data: Some(data),
        message: message.into(),
        pagination: Some(pagination),
    })
}

pub fn created<T: Serialize>(
    data: T,
    message: impl Into<String>,
) -> (StatusCode, Json<Envelope<T>>) {
    (StatusCode::CREATED, ok(data, message))
}

pub fn message_only(message: impl Into<String>) -> Json<Envelope<()>> {
    Json(Envelope {
        success: true,
        data: None,
        message: message.into(),
        pagination: None,
    })
}
