//! Availability rules shared by the three public redirect endpoints.

use chrono::{DateTime, Utc};

use crate::errors::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Inactive rows look exactly like missing ones from the outside.
    Unavailable,
    Expired,
    Exhausted,
}

/// Checked in order: active, not expired, below the limit.
pub fn availability(
    is_active: bool,
    expires_at: Option<DateTime<Utc>>,
    count: i32,
    limit: Option<i32>,
    now: DateTime<Utc>,
) -> Availability {
    if !is_active {
        return Availability::Unavailable;
    }
    if expires_at.is_some_and(|at| at <= now) {
        return Availability::Expired;
    }
    if limit.is_some_and(|limit| count >= limit) {
        return Availability::Exhausted;
    }
    Availability::Available
}

impl Availability {
    pub fn into_result(self, resource: &'static str) -> Result<(), ApiError> {
        match self {
            Availability::Available => Ok(()),
            Availability::Unavailable => Err(ApiError::not_found(resource)),
            Availability::Expired => Err(ApiError::Gone("This link has expired")),
            Availability::Exhausted => Err(ApiError::Gone("This link has reached its usage limit")),
        }
    }
}
