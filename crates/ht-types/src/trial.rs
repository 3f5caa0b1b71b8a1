//! Trial record schema and per-trial lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::TrialResult;

/// Caller-assigned trial identifier.
pub type TrialId = u64;

/// Lifecycle state of a trial record: NEW -> RUNNING -> DONE | ERROR.
///
/// Serialized as its integer code (0..=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TrialState {
    New = 0,
    Running = 1,
    Done = 2,
    Error = 3,
}

impl TrialState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl From<TrialState> for u8 {
    fn from(state: TrialState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for TrialState {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, String> {
        match code {
            0 => Ok(Self::New),
            1 => Ok(Self::Running),
            2 => Ok(Self::Done),
            3 => Ok(Self::Error),
            other => Err(format!("unknown trial state code: {other}")),
        }
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "NEW",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// A single trial record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialDoc {
    pub id: TrialId,
    pub state: TrialState,
    /// The sampled configuration.
    pub args: serde_json::Value,
    pub result: TrialResult,
    pub book_time: Option<DateTime<Utc>>,
    pub refresh_time: Option<DateTime<Utc>>,
    #[serde(rename = "expKey")]
    pub exp_key: Option<String>,
}

impl TrialDoc {
    /// Field names every serialized trial record must carry, in check order.
    pub const REQUIRED_FIELDS: [&'static str; 7] = [
        "id",
        "result",
        "args",
        "state",
        "book_time",
        "refresh_time",
        "expKey",
    ];

    /// A fresh NEW record with unset timestamps.
    pub fn new(
        id: TrialId,
        result: TrialResult,
        args: serde_json::Value,
        exp_key: Option<String>,
    ) -> Self {
        Self {
            id,
            state: TrialState::New,
            args,
            result,
            book_time: None,
            refresh_time: None,
            exp_key,
        }
    }

    pub fn mark_running(&mut self) {
        let now = Utc::now();
        self.state = TrialState::Running;
        self.book_time = Some(now);
        self.refresh_time = Some(now);
    }

    pub fn mark_done(&mut self, result: TrialResult) {
        self.state = TrialState::Done;
        self.result = result;
        self.refresh_time = Some(Utc::now());
    }

    pub fn mark_error(&mut self) {
        self.state = TrialState::Error;
        self.refresh_time = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ResultStatus;
    use serde_json::json;

    #[test]
    fn state_codes() {
        assert_eq!(serde_json::to_value(TrialState::Error).unwrap(), json!(3));
        let state: TrialState = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(state, TrialState::Running);
        assert!(serde_json::from_value::<TrialState>(json!(7)).is_err());
        assert_eq!(TrialState::try_from(2), Ok(TrialState::Done));
        assert!(TrialState::try_from(4).is_err());
    }

    #[test]
    fn new_doc_stamps_all_fields() {
        let doc = TrialDoc::new(4, TrialResult::new_pending(), json!({"x": 1}), Some("A".into()));
        assert_eq!(doc.state, TrialState::New);
        assert!(doc.book_time.is_none());
        assert!(doc.refresh_time.is_none());

        let value = serde_json::to_value(&doc).unwrap();
        let object = value.as_object().unwrap();
        for field in TrialDoc::REQUIRED_FIELDS {
            assert!(object.contains_key(field), "missing {field}");
        }
        assert_eq!(object["expKey"], json!("A"));
        assert_eq!(object["book_time"], serde_json::Value::Null);
    }

    #[test]
    fn trial_lifecycle() {
        let mut doc = TrialDoc::new(0, TrialResult::new_pending(), json!(null), None);

        doc.mark_running();
        assert_eq!(doc.state, TrialState::Running);
        assert!(doc.book_time.is_some());
        assert!(!doc.state.is_terminal());

        doc.mark_done(TrialResult::ok_loss(1.8));
        assert_eq!(doc.state, TrialState::Done);
        assert_eq!(doc.result.status, ResultStatus::Ok);
        assert!(doc.state.is_terminal());
    }

    #[test]
    fn trial_failure() {
        let mut doc = TrialDoc::new(0, TrialResult::new_pending(), json!(null), None);
        doc.mark_running();
        doc.mark_error();
        assert_eq!(doc.state, TrialState::Error);
        assert!(doc.refresh_time.is_some());
    }
}
