//! Objective functions and the domain that normalizes what they return.

use async_trait::async_trait;
use ht_types::{HtResult, ResultError, ResultStatus, TrialResult};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A user objective: scores one sampled configuration.
///
/// May return a bare number (taken as the loss) or a structured result
/// `{status, loss?, accuracy?, ...}`. Implementations can take arbitrary
/// wall-clock time; no timeout is applied here.
#[async_trait]
pub trait Objective: Send + Sync {
    async fn call(&self, args: &Value, fixed_params: &Value) -> anyhow::Result<Value>;
}

/// Adapts a synchronous closure into an [`Objective`].
pub struct FnObjective<F> {
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> Objective for FnObjective<F>
where
    F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync,
{
    async fn call(&self, args: &Value, fixed_params: &Value) -> anyhow::Result<Value> {
        (self.f)(args, fixed_params)
    }
}

/// An objective paired with the fixed parameters it is always called with.
#[derive(Clone)]
pub struct Domain {
    objective: Arc<dyn Objective>,
    fixed_params: Value,
}

impl Domain {
    pub fn new(objective: impl Objective + 'static, fixed_params: Value) -> Self {
        Self {
            objective: Arc::new(objective),
            fixed_params,
        }
    }

    pub fn from_fn<F>(f: F, fixed_params: Value) -> Self
    where
        F: Fn(&Value, &Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(FnObjective::new(f), fixed_params)
    }

    pub fn fixed_params(&self) -> &Value {
        &self.fixed_params
    }

    /// Run the objective on `args` and normalize its return value.
    pub async fn evaluate(&self, args: &Value) -> HtResult<TrialResult> {
        let raw = self.objective.call(args, &self.fixed_params).await?;
        let result = normalize_result(raw).inspect_err(|e| {
            debug!("Objective returned an unusable result: {}", e);
        })?;
        Ok(result)
    }

    /// A fresh pending placeholder result.
    pub fn new_result(&self) -> TrialResult {
        TrialResult::new_pending()
    }

    pub fn loss(&self, result: &TrialResult) -> Option<f64> {
        result.loss
    }

    pub fn status(&self, result: &TrialResult) -> ResultStatus {
        result.status
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("fixed_params", &self.fixed_params)
            .finish_non_exhaustive()
    }
}

/// Turn whatever an objective returned into a canonical [`TrialResult`].
pub fn normalize_result(raw: Value) -> Result<TrialResult, ResultError> {
    let mut object = match raw {
        Value::Number(n) => {
            let loss = n.as_f64().ok_or_else(|| ResultError::InvalidReturn {
                found: n.to_string(),
            })?;
            return Ok(TrialResult::ok_loss(loss));
        }
        Value::Object(object) => object,
        other => {
            return Err(ResultError::InvalidReturn {
                found: other.to_string(),
            })
        }
    };

    let status = match object.remove("status") {
        Some(Value::String(status)) => status.parse::<ResultStatus>()?,
        Some(other) => {
            return Err(ResultError::InvalidStatus {
                status: other.to_string(),
            })
        }
        None => {
            return Err(ResultError::InvalidStatus {
                status: "<missing>".to_string(),
            })
        }
    };
    let loss = take_signal(&mut object, "loss")?;
    let accuracy = take_signal(&mut object, "accuracy")?;

    let result = TrialResult {
        status,
        loss,
        accuracy,
        extra: object,
    };
    result.validate()?;
    Ok(result)
}

fn take_signal(
    object: &mut serde_json::Map<String, Value>,
    field: &str,
) -> Result<Option<f64>, ResultError> {
    match object.remove(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(other) => Err(ResultError::InvalidReturn {
            found: format!("{field} = {other}"),
        }),
    }
}
