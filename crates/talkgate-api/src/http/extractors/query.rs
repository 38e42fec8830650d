//! Query parameter extractors for list endpoints.

use serde::Deserialize;

/// Query parameters for the session and history list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Maximum results. Omitted means the endpoint default.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

impl ListQuery {
    /// Clamp to `1..=500`.
    pub fn bounded(&self) -> i64 {
        self.limit.clamp(1, 500)
    }
}
