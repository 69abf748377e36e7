//! Success response bodies

use axum::Json;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::core::extractors::TOKEN_COOKIE;

/// `{ "success": true, "data": ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }

    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Self::ok(data))
    }
}

/// `{ "success": true, "count": n, "data": [...] }` without pagination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountedResponse<T> {
    pub success: bool,
    pub count: usize,
    pub data: Vec<T>,
}

impl<T: Serialize> CountedResponse<T> {
    pub fn ok(data: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            count: data.len(),
            data,
        })
    }
}

/// `{ "success": true, "token": ... }` plus the session cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub success: bool,
    pub token: String,
    #[serde(skip)]
    cookie: Option<String>,
}

impl TokenResponse {
    pub fn new(token: String, cookie_days: i64, secure: bool) -> Self {
        let mut cookie = format!(
            "{}={}; HttpOnly; Path=/; Max-Age={}",
            TOKEN_COOKIE,
            token,
            cookie_days.max(0) * 24 * 60 * 60
        );
        if secure {
            cookie.push_str("; Secure");
        }
        Self {
            success: true,
            token,
            cookie: Some(cookie),
        }
    }
}

impl IntoResponse for TokenResponse {
    fn into_response(self) -> Response {
        let cookie = self
            .cookie
            .as_deref()
            .and_then(|c| HeaderValue::from_str(c).ok());
        let mut response = Json(&self).into_response();
        if let Some(cookie) = cookie {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
        response
    }
}

/// Overwrites the session cookie so the client drops it
pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("token=none; HttpOnly; Path=/; Max-Age=10")
}
