//! Admission outcomes.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;

use crate::error::StoreError;

// == Rejection ==
/// Structured metadata of a quota-exceeded decision.
///
/// Not an error: it is a successful decision that the HTTP layer turns
/// into a `429 Too Many Requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    /// Policy limit for the window
    pub limit: u64,
    /// Counter value observed at check time
    pub current: u64,
    /// Seconds until the window resets
    pub retry_after_secs: u64,
    /// Earliest moment a retry can be admitted
    pub next_valid_request_time: DateTime<Utc>,
}

impl Rejection {
    pub fn new(limit: u64, current: u64, retry_after_secs: u64) -> Self {
        Self {
            limit,
            current,
            retry_after_secs,
            next_valid_request_time: Utc::now()
                + ChronoDuration::seconds(retry_after_secs as i64),
        }
    }

    /// Always zero once rejected.
    pub fn remaining_requests(&self) -> u64 {
        0
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RejectionBody<'a> {
    status_code: u16,
    error: &'static str,
    message: String,
    limit: u64,
    current: u64,
    remaining_requests: u64,
    next_valid_request_time: &'a DateTime<Utc>,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = StatusCode::TOO_MANY_REQUESTS;
        let body = RejectionBody {
            status_code: status.as_u16(),
            error: "Too Many Requests",
            message: format!(
                "Rate limit exceeded, retry in {} seconds",
                self.retry_after_secs
            ),
            limit: self.limit,
            current: self.current,
            remaining_requests: self.remaining_requests(),
            next_valid_request_time: &self.next_valid_request_time,
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::RETRY_AFTER, HeaderValue::from(self.retry_after_secs));
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(0u64));
        response
    }
}

// == Decision ==
/// What the HTTP layer sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Rejected(Rejection),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

// == Admission ==
/// Auditable outcome, distinguishing a fail-open pass from a real one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Under quota, or no policy attached
    Allowed,
    /// Quota exhausted for this window
    Rejected(Rejection),
    /// The store failed; the request is let through
    Degraded(StoreError),
}

impl From<Admission> for Decision {
    fn from(admission: Admission) -> Self {
        match admission {
            Admission::Allowed | Admission::Degraded(_) => Decision::Allowed,
            Admission::Rejected(rejection) => Decision::Rejected(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_collapses_to_allowed() {
        let admission = Admission::Degraded(StoreError::Unavailable("down".to_string()));
        assert_eq!(Decision::from(admission), Decision::Allowed);
    }

    #[test]
    fn test_next_valid_request_time_in_future() {
        let before = Utc::now();
        let rejection = Rejection::new(3, 3, 42);

        assert!(rejection.next_valid_request_time >= before + ChronoDuration::seconds(42));
        assert_eq!(rejection.remaining_requests(), 0);
    }

    #[test]
    fn test_rejection_response() {
        let response = Rejection::new(3, 3, 17).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "17");
        assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    }
}
