//! Standard sampling capabilities.
//!
//! None of these are built into [`Evaluator`]; compose them in with
//! [`standard_registry`] (optionally merged with your own).

use ht_types::{CapabilityError, HtResult};
use rand::{Rng, RngCore};
use serde_json::Value;

use crate::evaluator::{CapabilityRegistry, Evaluator};
use crate::expr::{Expr, Params};

/// Registry holding `uniform`, `quniform`, `loguniform`, `randint`,
/// `choice` and `literal`.
pub fn standard_registry() -> CapabilityRegistry {
    CapabilityRegistry::new()
        .with("uniform", uniform)
        .with("quniform", quniform)
        .with("loguniform", loguniform)
        .with("randint", randint)
        .with("choice", choice)
        .with("literal", literal)
}

/// Continuous uniform over `[low, high)`.
pub fn uniform(evaluator: &Evaluator, params: &Params, rng: &mut dyn RngCore) -> HtResult<Value> {
    let (low, high) = float_bounds("uniform", evaluator, params, rng)?;
    Ok(Value::from(sample_float(low, high, rng)))
}

/// Uniform, rounded to the nearest multiple of `q`.
pub fn quniform(evaluator: &Evaluator, params: &Params, rng: &mut dyn RngCore) -> HtResult<Value> {
    let (low, high) = float_bounds("quniform", evaluator, params, rng)?;
    let q = float_param("quniform", "q", evaluator, params, rng)?;
    if q <= 0.0 {
        return Err(invalid("quniform", "q", format!("must be positive, got {q}")));
    }
    let value = sample_float(low, high, rng);
    Ok(Value::from((value / q).round() * q))
}

/// Log-uniform range (sampled in log-space then exponentiated).
pub fn loguniform(
    evaluator: &Evaluator,
    params: &Params,
    rng: &mut dyn RngCore,
) -> HtResult<Value> {
    let (low, high) = float_bounds("loguniform", evaluator, params, rng)?;
    if low <= 0.0 {
        return Err(invalid("loguniform", "low", format!("must be positive, got {low}")));
    }
    let log_val = sample_float(low.ln(), high.ln(), rng);
    Ok(Value::from(log_val.exp().clamp(low, high)))
}

/// Integer range `[low, high]` inclusive.
pub fn randint(evaluator: &Evaluator, params: &Params, rng: &mut dyn RngCore) -> HtResult<Value> {
    let low = int_param("randint", "low", evaluator, params, rng)?;
    let high = int_param("randint", "high", evaluator, params, rng)?;
    if low > high {
        return Err(invalid("randint", "high", format!("{high} is below low {low}")));
    }
    Ok(Value::from(rng.gen_range(low..=high)))
}

/// Pick one of `options`, then evaluate only the chosen branch.
pub fn choice(evaluator: &Evaluator, params: &Params, rng: &mut dyn RngCore) -> HtResult<Value> {
    let options = match params.get("options") {
        Some(Expr::Seq(options)) => options,
        Some(other) => {
            return Err(invalid(
                "choice",
                "options",
                format!("expected a sequence, got {}", other.to_json()),
            ))
        }
        None => return Err(missing("choice", "options")),
    };
    if options.is_empty() {
        return Err(invalid("choice", "options", "no options to choose from".to_string()));
    }
    let idx = rng.gen_range(0..options.len());
    evaluator.eval_node(&options[idx], rng)
}

/// Return `value` as-is, without evaluating it.
pub fn literal(_evaluator: &Evaluator, params: &Params, _rng: &mut dyn RngCore) -> HtResult<Value> {
    Ok(params.get("value").map(Expr::to_json).unwrap_or(Value::Null))
}

fn sample_float(low: f64, high: f64, rng: &mut dyn RngCore) -> f64 {
    low + rng.gen::<f64>() * (high - low)
}

fn float_bounds(
    capability: &str,
    evaluator: &Evaluator,
    params: &Params,
    rng: &mut dyn RngCore,
) -> HtResult<(f64, f64)> {
    let low = float_param(capability, "low", evaluator, params, rng)?;
    let high = float_param(capability, "high", evaluator, params, rng)?;
    if low > high {
        return Err(invalid(capability, "high", format!("{high} is below low {low}")));
    }
    Ok((low, high))
}

fn float_param(
    capability: &str,
    param: &str,
    evaluator: &Evaluator,
    params: &Params,
    rng: &mut dyn RngCore,
) -> HtResult<f64> {
    let expr = params.get(param).ok_or_else(|| missing(capability, param))?;
    let value = evaluator.eval_node(expr, rng)?;
    value
        .as_f64()
        .ok_or_else(|| invalid(capability, param, format!("expected a number, got {value}")))
}

fn int_param(
    capability: &str,
    param: &str,
    evaluator: &Evaluator,
    params: &Params,
    rng: &mut dyn RngCore,
) -> HtResult<i64> {
    let expr = params.get(param).ok_or_else(|| missing(capability, param))?;
    let value = evaluator.eval_node(expr, rng)?;
    value
        .as_i64()
        .ok_or_else(|| invalid(capability, param, format!("expected an integer, got {value}")))
}

fn missing(capability: &str, param: &str) -> ht_types::HtError {
    CapabilityError::MissingParam {
        capability: capability.to_string(),
        param: param.to_string(),
    }
    .into()
}

fn invalid(capability: &str, param: &str, message: String) -> ht_types::HtError {
    CapabilityError::InvalidParam {
        capability: capability.to_string(),
        param: param.to_string(),
        message,
    }
    .into()
}
