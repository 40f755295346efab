//! DTOs for the API the client talks to.
//!
//! # Design
//! Every payload the server returns is wrapped in `{code, message, data}`,
//! and the server reports some failures through `code` while still
//! answering HTTP 200. `ApiEnvelope::into_data` turns those into
//! `ApiError::Rejected` so callers handle one error path.
//!
//! These types mirror the mock-server's schema but are defined independently.
//! Integration tests catch any drift between the two crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// The `{code, message, data}` wrapper around every API payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// `data` when `code` is 2xx, `Rejected` otherwise.
    pub fn into_data(self) -> Result<Option<T>, ApiError> {
        if self.is_success() {
            Ok(self.data)
        } else {
            Err(ApiError::Rejected {
                code: self.code,
                message: self.message,
            })
        }
    }
}

/// Envelope for list endpoints, with pagination alongside the data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageEnvelope<T> {
    pub code: i64,
    pub message: String,
    pub data: Option<T>,
    pub page: PageInfo,
}

impl<T> PageEnvelope<T> {
    pub fn into_parts(self) -> Result<(Option<T>, PageInfo), ApiError> {
        if (200..300).contains(&self.code) {
            Ok((self.data, self.page))
        } else {
            Err(ApiError::Rejected {
                code: self.code,
                message: self.message,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageInfo {
    pub current: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_page: u32,
}

/// Credentials posted to `/auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: Option<UserInfo>,
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub avatar: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. Only present fields are sent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}
