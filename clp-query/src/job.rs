//! Job identifiers and the numeric enums shared with the query scheduler.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier the job queue assigns to a submitted query job.
///
/// Displayed as the bare number; the results cache names the job's result
/// collection and metadata document with that string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Kind of work a query job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum JobType {
    SearchOrAggregation = 0,
    ExtractIr = 1,
    ExtractJson = 2,
}

impl JobType {
    /// Numeric code stored in the `type` column.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SearchOrAggregation => write!(f, "search-or-aggregation"),
            Self::ExtractIr => write!(f, "extract-ir"),
            Self::ExtractJson => write!(f, "extract-json"),
        }
    }
}

/// Status of a query job as written by the scheduler.
///
/// `Unknown` carries any code outside the known set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelling,
    Cancelled,
    Killed,
    Unknown(i32),
}

impl JobStatus {
    /// Decode the `status` column.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Failed,
            4 => Self::Cancelling,
            5 => Self::Cancelled,
            6 => Self::Killed,
            other => Self::Unknown(other),
        }
    }

    /// Numeric code as stored in the `status` column.
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            Self::Pending => 0,
            Self::Running => 1,
            Self::Succeeded => 2,
            Self::Failed => 3,
            Self::Cancelling => 4,
            Self::Cancelled => 5,
            Self::Killed => 6,
            Self::Unknown(code) => code,
        }
    }

    /// Whether the scheduler may still move the job to another state.
    #[must_use]
    pub fn is_waiting(self) -> bool {
        matches!(self, Self::Pending | Self::Running | Self::Cancelling)
    }

    /// Whether no further transition can happen.
    ///
    /// `Unknown` is neither waiting nor terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Cancelled | Self::Killed
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelling => write!(f, "cancelling"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Killed => write!(f, "killed"),
            Self::Unknown(code) => write!(f, "unknown({code})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_id_parses_and_displays() {
        let id: JobId = " 42 ".parse().unwrap();
        assert_eq!(id, JobId(42));
        assert_eq!(id.to_string(), "42");
        assert!("forty-two".parse::<JobId>().is_err());
    }

    #[test]
    fn job_type_codes_match_scheduler() {
        assert_eq!(JobType::SearchOrAggregation.code(), 0);
        assert_eq!(JobType::ExtractIr.code(), 1);
        assert_eq!(JobType::ExtractJson.code(), 2);
    }

    #[test]
    fn status_codes_match_scheduler() {
        let expected = [
            (0, JobStatus::Pending),
            (1, JobStatus::Running),
            (2, JobStatus::Succeeded),
            (3, JobStatus::Failed),
            (4, JobStatus::Cancelling),
            (5, JobStatus::Cancelled),
            (6, JobStatus::Killed),
        ];
        for (code, status) in expected {
            assert_eq!(JobStatus::from_code(code), status);
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn out_of_range_code_is_unknown() {
        assert_eq!(JobStatus::from_code(7), JobStatus::Unknown(7));
        assert_eq!(JobStatus::from_code(-1), JobStatus::Unknown(-1));
        assert_eq!(JobStatus::Unknown(7).code(), 7);
    }

    #[test]
    fn waiting_and_terminal_partition() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Cancelling,
        ] {
            assert!(status.is_waiting());
            assert!(!status.is_terminal());
        }
        for status in [
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Cancelled,
            JobStatus::Killed,
        ] {
            assert!(status.is_terminal());
            assert!(!status.is_waiting());
        }
        assert!(!JobStatus::Unknown(9).is_waiting());
        assert!(!JobStatus::Unknown(9).is_terminal());
    }

    #[test]
    fn status_display() {
        assert_eq!(JobStatus::Pending.to_string(), "pending");
        assert_eq!(JobStatus::Cancelling.to_string(), "cancelling");
        assert_eq!(JobStatus::Unknown(12).to_string(), "unknown(12)");
    }
}
