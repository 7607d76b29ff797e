//! Success envelope shared by every handler

use axum::{Json, http::StatusCode};
use serde::Serialize;

/// `{success: true, data: ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

/// 200 with the payload wrapped in the success envelope
pub fn ok<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::OK, Json(ApiResponse { success: true, data }))
}

/// 201 with the payload wrapped in the success envelope
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse { success: true, data }))
}

/// Plain acknowledgement body, used for deletes
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
