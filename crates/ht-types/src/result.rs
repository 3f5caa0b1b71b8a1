//! Canonical trial results and the status vocabulary they use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ResultError;

/// Status of a single result, as reported by (or on behalf of) the objective.
///
/// Distinct from [`crate::TrialState`], which tracks the trial record itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    New,
    Running,
    Suspended,
    Ok,
    Fail,
}

impl ResultStatus {
    pub const ALL: [ResultStatus; 5] = [
        ResultStatus::New,
        ResultStatus::Running,
        ResultStatus::Suspended,
        ResultStatus::Ok,
        ResultStatus::Fail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Ok => "ok",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = ResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ResultError::InvalidStatus {
                status: s.to_string(),
            })
    }
}

/// The optimization signal carried by a result, reduced to one direction.
///
/// `loss` always wins over `accuracy` when both are present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Signal {
    pub value: f64,
    pub smaller_is_better: bool,
}

impl Signal {
    pub fn loss(value: f64) -> Self {
        Self {
            value,
            smaller_is_better: true,
        }
    }

    pub fn accuracy(value: f64) -> Self {
        Self {
            value,
            smaller_is_better: false,
        }
    }

    /// Whether `self` is strictly better than `other`.
    ///
    /// Signals of opposite polarity are incomparable and never better.
    pub fn better_than(&self, other: &Signal) -> bool {
        if self.smaller_is_better != other.smaller_is_better {
            return false;
        }
        if self.smaller_is_better {
            self.value < other.value
        } else {
            self.value > other.value
        }
    }
}

/// Canonical outcome of evaluating one configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub status: ResultStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,

    /// Anything else the objective reported (timings, attachments, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TrialResult {
    /// A pending placeholder used before evaluation completes.
    pub fn new_pending() -> Self {
        Self::with_status(ResultStatus::New)
    }

    pub fn with_status(status: ResultStatus) -> Self {
        Self {
            status,
            loss: None,
            accuracy: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn ok_loss(loss: f64) -> Self {
        Self {
            loss: Some(loss),
            ..Self::with_status(ResultStatus::Ok)
        }
    }

    pub fn ok_accuracy(accuracy: f64) -> Self {
        Self {
            accuracy: Some(accuracy),
            ..Self::with_status(ResultStatus::Ok)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResultStatus::Ok
    }

    pub fn signal(&self) -> Option<Signal> {
        match (self.loss, self.accuracy) {
            (Some(loss), _) => Some(Signal::loss(loss)),
            (None, Some(accuracy)) => Some(Signal::accuracy(accuracy)),
            (None, None) => None,
        }
    }

    /// Check the result contract: an ok result must carry a signal.
    pub fn validate(&self) -> Result<(), ResultError> {
        if self.is_ok() && self.signal().is_none() {
            return Err(ResultError::IncompleteResult);
        }
        Ok(())
    }
}

impl Default for TrialResult {
    fn default() -> Self {
        Self::new_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_parses_known_values_only() {
        assert_eq!("ok".parse::<ResultStatus>(), Ok(ResultStatus::Ok));
        assert_eq!("suspended".parse::<ResultStatus>(), Ok(ResultStatus::Suspended));
        assert_eq!(
            "bogus".parse::<ResultStatus>(),
            Err(ResultError::InvalidStatus {
                status: "bogus".into()
            })
        );
        assert!("OK".parse::<ResultStatus>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ResultStatus::Fail).unwrap(), json!("fail"));
    }

    #[test]
    fn loss_takes_precedence_over_accuracy() {
        let mut result = TrialResult::ok_loss(0.3);
        result.accuracy = Some(0.9);
        assert_eq!(result.signal(), Some(Signal::loss(0.3)));
    }

    #[test]
    fn signal_polarity() {
        assert!(Signal::loss(0.2).better_than(&Signal::loss(0.5)));
        assert!(!Signal::loss(0.5).better_than(&Signal::loss(0.5)));
        assert!(Signal::accuracy(0.9).better_than(&Signal::accuracy(0.8)));
        assert!(!Signal::loss(0.1).better_than(&Signal::accuracy(0.1)));
    }

    #[test]
    fn ok_without_signal_is_incomplete() {
        let result = TrialResult::with_status(ResultStatus::Ok);
        assert_eq!(result.validate(), Err(ResultError::IncompleteResult));
        assert!(TrialResult::with_status(ResultStatus::Fail).validate().is_ok());
    }

    #[test]
    fn extra_fields_survive_serialization() {
        let raw = json!({"status": "ok", "loss": 1.5, "train_time": 12});
        let result: TrialResult = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(result.extra.get("train_time"), Some(&json!(12)));
        assert_eq!(serde_json::to_value(&result).unwrap(), raw);
    }
}
