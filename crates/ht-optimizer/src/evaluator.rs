//! Recursive evaluation of search-space expressions.
//!
//! The evaluator only knows how to walk a tree. Every sampling
//! distribution is a named [`Capability`] held in a [`CapabilityRegistry`]
//! that is injected into (or merged into) the evaluator.

use ht_types::HtResult;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::expr::{Expr, Params, CAPABILITY_KEY};

/// A named sampling function pluggable into the [`Evaluator`].
///
/// Parameters arrive unevaluated; implementations call back into the
/// evaluator with the same `rng` for whichever ones they need.
pub trait Capability: Send + Sync {
    fn sample(&self, evaluator: &Evaluator, params: &Params, rng: &mut dyn RngCore)
        -> HtResult<Value>;
}

impl<F> Capability for F
where
    F: Fn(&Evaluator, &Params, &mut dyn RngCore) -> HtResult<Value> + Send + Sync,
{
    fn sample(
        &self,
        evaluator: &Evaluator,
        params: &Params,
        rng: &mut dyn RngCore,
    ) -> HtResult<Value> {
        self(evaluator, params, rng)
    }
}

/// Name -> capability lookup table.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Arc<dyn Capability>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `capability` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, capability: impl Capability + 'static) {
        self.capabilities.insert(name.into(), Arc::new(capability));
    }

    pub fn with(mut self, name: impl Into<String>, capability: impl Capability + 'static) -> Self {
        self.register(name, capability);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Capability>> {
        self.capabilities.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.capabilities.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.capabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.capabilities.is_empty()
    }

    /// Compose two registries; entries from `other` override ours.
    pub fn merge(mut self, other: CapabilityRegistry) -> Self {
        self.capabilities.extend(other.capabilities);
        self
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

/// Walks expression trees, dispatching capability calls by name.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    registry: CapabilityRegistry,
}

impl Evaluator {
    /// An evaluator with no capabilities: pure tree traversal.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.registry
    }

    /// Sample a concrete value from `expr`.
    ///
    /// Without `rng`, a fresh entropy-seeded generator is built for this
    /// call alone.
    pub fn evaluate(&self, expr: &Expr, rng: Option<&mut dyn RngCore>) -> HtResult<Value> {
        match rng {
            Some(rng) => self.eval_node(expr, rng),
            None => {
                let mut rng = ChaCha8Rng::from_entropy();
                self.eval_node(expr, &mut rng)
            }
        }
    }

    pub fn evaluate_with<R: RngCore>(&self, expr: &Expr, rng: &mut R) -> HtResult<Value> {
        self.eval_node(expr, rng)
    }

    pub fn evaluate_json(&self, expr: &Value, rng: Option<&mut dyn RngCore>) -> HtResult<Value> {
        self.evaluate(&Expr::from_json(expr.clone()), rng)
    }

    /// Recursive step. Capabilities use this to evaluate their parameters.
    pub fn eval_node(&self, expr: &Expr, rng: &mut dyn RngCore) -> HtResult<Value> {
        match expr {
            Expr::Null => Ok(Value::Null),
            Expr::Scalar(value) => Ok(value.clone()),
            Expr::Seq(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval_node(item, rng)?);
                }
                Ok(Value::Array(out))
            }
            Expr::Map(entries) => Ok(Value::Object(self.eval_entries(entries, rng)?)),
            Expr::Call { name, params } => match self.registry.get(name) {
                Some(capability) => {
                    debug!("Dispatching capability {}", name);
                    capability.sample(self, params, rng)
                }
                None => {
                    // Unregistered: the `name` key is just another field.
                    let mut out = self.eval_entries(params, rng)?;
                    out.insert(CAPABILITY_KEY.to_string(), Value::String(name.clone()));
                    Ok(Value::Object(out))
                }
            },
        }
    }

    fn eval_entries(
        &self,
        entries: &BTreeMap<String, Expr>,
        rng: &mut dyn RngCore,
    ) -> HtResult<serde_json::Map<String, Value>> {
        let mut out = serde_json::Map::new();
        for (key, value) in entries {
            out.insert(key.clone(), self.eval_node(value, rng)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ht_types::{CapabilityError, HtError};
    use rand::Rng;
    use serde_json::json;

    fn counter_registry() -> CapabilityRegistry {
        CapabilityRegistry::new()
            .with(
                "draw",
                |_: &Evaluator, _: &Params, rng: &mut dyn RngCore| -> HtResult<Value> {
                    Ok(json!(rng.gen_range(0..1_000_000)))
                },
            )
            .with(
                "fail",
                |_: &Evaluator, _: &Params, _: &mut dyn RngCore| -> HtResult<Value> {
                    Err(CapabilityError::Failed {
                        capability: "fail".into(),
                        message: "always".into(),
                    }
                    .into())
                },
            )
    }

    #[test]
    fn null_is_returned_unchanged() {
        let evaluator = Evaluator::new();
        assert_eq!(evaluator.evaluate(&Expr::Null, None).unwrap(), Value::Null);

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let out = evaluator
            .evaluate(&Expr::Null, Some(&mut rng as &mut dyn RngCore))
            .unwrap();
        assert_eq!(out, Value::Null);
    }

    #[test]
    fn plain_trees_are_structurally_identical() {
        let evaluator = Evaluator::new();
        let raw = json!({
            "a": [1, 2.5, "three", true],
            "b": {"c": null, "d": [[], {}]},
            "z": "last"
        });
        let out = evaluator.evaluate_json(&raw, None).unwrap();
        assert_eq!(out, raw);
    }

    #[test]
    fn unregistered_name_is_a_plain_mapping() {
        let evaluator = Evaluator::with_registry(counter_registry());
        let raw = json!({"name": "resnet", "depth": 50});
        assert_eq!(evaluator.evaluate_json(&raw, None).unwrap(), raw);
    }

    #[test]
    fn registered_capability_is_dispatched() {
        let evaluator = Evaluator::with_registry(counter_registry());
        let out = evaluator
            .evaluate_json(&json!({"x": {"name": "draw"}}), None)
            .unwrap();
        assert!(out["x"].is_i64());
    }

    #[test]
    fn shared_rng_is_consumed_sequentially() {
        let evaluator = Evaluator::with_registry(counter_registry());
        let expr = Expr::from_json(json!([{"name": "draw"}, {"name": "draw"}, {"name": "draw"}]));

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let out = evaluator.evaluate(&expr, Some(&mut rng as &mut dyn RngCore)).unwrap();

        let mut expected_rng = ChaCha8Rng::seed_from_u64(42);
        let expected: Vec<Value> = (0..3)
            .map(|_| json!(expected_rng.gen_range(0..1_000_000)))
            .collect();
        assert_eq!(out, Value::Array(expected));
    }

    #[test]
    fn same_seed_same_sample() {
        let evaluator = Evaluator::with_registry(counter_registry());
        let expr = Expr::from_json(json!({"a": {"name": "draw"}, "b": [{"name": "draw"}]}));

        let first = evaluator
            .evaluate_with(&expr, &mut ChaCha8Rng::seed_from_u64(7))
            .unwrap();
        let second = evaluator
            .evaluate_with(&expr, &mut ChaCha8Rng::seed_from_u64(7))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn capability_errors_propagate() {
        let evaluator = Evaluator::with_registry(counter_registry());
        let err = evaluator
            .evaluate_json(&json!({"deep": [{"name": "fail"}]}), None)
            .unwrap_err();
        assert!(matches!(
            err,
            HtError::Capability(CapabilityError::Failed { .. })
        ));
    }

    #[test]
    fn merge_overrides_existing_names() {
        let override_registry = CapabilityRegistry::new().with(
            "draw",
            |_: &Evaluator, _: &Params, _: &mut dyn RngCore| -> HtResult<Value> {
                Ok(json!("fixed"))
            },
        );
        let registry = counter_registry().merge(override_registry);
        assert_eq!(registry.names(), vec!["draw", "fail"]);

        let evaluator = Evaluator::with_registry(registry);
        let out = evaluator.evaluate_json(&json!({"name": "draw"}), None).unwrap();
        assert_eq!(out, json!("fixed"));
    }
}
