use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use wheel_core::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinResult {
    Win,
    Lose,
}

impl SpinResult {
    pub fn from_win(is_win: bool) -> Self {
        if is_win {
            SpinResult::Win
        } else {
            SpinResult::Lose
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpinResult::Win => "win",
            SpinResult::Lose => "lose",
        }
    }
}

impl fmt::Display for SpinResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpinResult {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "win" => Ok(SpinResult::Win),
            "lose" => Ok(SpinResult::Lose),
            other => Err(ApiError::Invalid(format!("unknown spin result: {other}"))),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WheelInfo {
    pub segments: u32,
    pub win_index: u32,
    pub labels: Vec<String>,
    pub win_odds: f64,
    pub animation_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EligibilityResponse {
    pub user_id: String,
    pub role: Role,
    pub eligible: bool,
    pub last_spin_at: Option<DateTime<Utc>>,
    pub next_eligible_at: Option<DateTime<Utc>>,
    pub wait_seconds: Option<i64>,
    pub wait_display: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinRequest {
    pub user_id: String,
    #[serde(default)]
    pub client_seed: Option<String>,
    /// Where the client's wheel currently rests, in degrees.
    #[serde(default)]
    pub current_rotation: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinResponse {
    pub spin_id: i64,
    pub user_id: String,
    pub result: SpinResult,
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: u64,
    pub hash: String,
    pub roll: u32,
    pub landing_segment: u32,
    pub rotation: f64,
    pub full_spins: u32,
    pub animation_ms: u64,
    pub spun_at: DateTime<Utc>,
    pub invites_granted: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyRequest {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerifyResponse {
    pub combined: String,
    pub hash: String,
    pub hash_int: u32,
    pub roll: u32,
    pub result: SpinResult,
    pub landing_segment: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InvitationGrantView {
    pub user_id: String,
    pub invites_remaining: u32,
    pub expiration_days: Option<u32>,
    pub granted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationView {
    pub id: i64,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SetRoleRequest {
    pub user_id: String,
    pub role: Role,
}

/// Flat spin row used for log output and CSV export.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpinLogEntry {
    pub id: i64,
    pub user_id: String,
    pub result: SpinResult,
    pub spun_at: DateTime<Utc>,
    pub server_seed: Option<String>,
    pub client_seed: Option<String>,
    pub nonce: Option<u64>,
    pub hash: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "error", content = "detail", rename_all = "snake_case")]
pub enum ApiError {
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("next spin in {wait_display}")]
    NotEligible {
        next_eligible_at: DateTime<Utc>,
        wait_seconds: i64,
        wait_display: String,
    },
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error")]
    Internal,
}


/// Render a wait as `"{hours}h {minutes}m"`, rounding down.
pub fn format_wait(wait: Duration) -> String {
    let minutes = wait.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_formatting() {
        assert_eq!(format_wait(Duration::minutes(0)), "0h 0m");
        assert_eq!(format_wait(Duration::seconds(3 * 3600 + 25 * 60 + 59)), "3h 25m");
        assert_eq!(format_wait(Duration::hours(24)), "24h 0m");
        assert_eq!(format_wait(Duration::seconds(-5)), "0h 0m");
    }

    #[test]
    fn spin_request_optional_fields() {
        let req: SpinRequest = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(req.user_id, "u1");
        assert!(req.client_seed.is_none());
        assert!(req.current_rotation.is_none());
    }

    #[test]
    fn api_error_is_tagged() {
        let body = serde_json::to_value(ApiError::Unauthorized).unwrap();
        assert_eq!(body["error"], "unauthorized");
        let parsed: ApiError = serde_json::from_value(body).unwrap();
        assert_eq!(parsed, ApiError::Unauthorized);
    }

    #[test]
    fn spin_result_strings() {
        assert_eq!(SpinResult::from_win(true).as_str(), "win");
        assert_eq!("lose".parse::<SpinResult>(), Ok(SpinResult::Lose));
        assert!("draw".parse::<SpinResult>().is_err());
    }
}
