//! API route handlers

pub mod alerts;
pub mod health;
pub mod status;

use serde::Serialize;

use crate::util::parse_or;

/// Success envelope shared by every endpoint
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Parse a `limit` query value. Missing or malformed values use `default`,
/// anything below 1 is raised to 1.
pub(crate) fn parse_limit(raw: Option<String>, default: i64) -> i64 {
    parse_or(raw, default).max(1)
}
