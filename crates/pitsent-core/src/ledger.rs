use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of one (ticker, day) processing unit.
///
/// `InProgress` is the only non-terminal state. Only `Completed` counts as
/// evidence that a day has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerStatus {
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl LedgerStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LedgerStatus::InProgress => "in_progress",
            LedgerStatus::Completed => "completed",
            LedgerStatus::Failed => "failed",
            LedgerStatus::Skipped => "skipped",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, LedgerStatus::InProgress)
    }
}

impl std::fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LedgerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(LedgerStatus::InProgress),
            "completed" => Ok(LedgerStatus::Completed),
            "failed" => Ok(LedgerStatus::Failed),
            "skipped" => Ok(LedgerStatus::Skipped),
            other => Err(format!("unknown ledger status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingLedgerEntry {
    pub ticker: String,
    pub processed_date: NaiveDate,
    pub status: LedgerStatus,
    pub posts_found: i32,
    pub posts_inserted: i32,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_forms_parse_back() {
        for status in [
            LedgerStatus::InProgress,
            LedgerStatus::Completed,
            LedgerStatus::Failed,
            LedgerStatus::Skipped,
        ] {
            assert_eq!(status.as_str().parse::<LedgerStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_rejected() {
        assert!("done".parse::<LedgerStatus>().is_err());
    }

    #[test]
    fn only_in_progress_is_non_terminal() {
        assert!(!LedgerStatus::InProgress.is_terminal());
        assert!(LedgerStatus::Completed.is_terminal());
        assert!(LedgerStatus::Failed.is_terminal());
        assert!(LedgerStatus::Skipped.is_terminal());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&LedgerStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
