//! Append-only trial log with a filtered, explicitly refreshed view.

use ht_types::{
    HtResult, ResultStatus, TrialDoc, TrialId, TrialResult, TrialState, ValidationError,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Records every trial of one (or several) experiments.
///
/// `dynamic_trials` is the authoritative log. `trials` is a derived view
/// (ERROR trials dropped, restricted to this store's `exp_key` when set)
/// that only changes when [`Trials::refresh`] is called; every query
/// except [`Trials::count_by_state`] with `use_persisted_view = false`
/// reads the view.
#[derive(Debug, Clone, Default)]
pub struct Trials {
    exp_key: Option<String>,
    dynamic_trials: Vec<TrialDoc>,
    trials: Vec<TrialDoc>,
    next_id: TrialId,
}

impl Trials {
    pub fn new(exp_key: Option<String>) -> Self {
        Self {
            exp_key,
            ..Self::default()
        }
    }

    pub fn with_exp_key(exp_key: impl Into<String>) -> Self {
        Self::new(Some(exp_key.into()))
    }

    pub fn exp_key(&self) -> Option<&str> {
        self.exp_key.as_deref()
    }

    /// Reserve `n` new sequential ids.
    ///
    /// Needs external serialization when several callers share a store.
    pub fn reserve_ids(&mut self, n: usize) -> Vec<TrialId> {
        let start = self.next_id;
        self.next_id += n as TrialId;
        debug!("Reserved trial ids {}..{}", start, self.next_id);
        (start..self.next_id).collect()
    }

    /// Build NEW trial documents for this store. Does not insert them.
    pub fn build_docs(
        &self,
        ids: &[TrialId],
        results: &[TrialResult],
        args: &[Value],
    ) -> HtResult<Vec<TrialDoc>> {
        if ids.len() != results.len() || ids.len() != args.len() {
            return Err(ValidationError::LengthMismatch {
                ids: ids.len(),
                results: results.len(),
                args: args.len(),
            }
            .into());
        }
        Ok(ids
            .iter()
            .zip(results)
            .zip(args)
            .map(|((id, result), args)| {
                TrialDoc::new(*id, result.clone(), args.clone(), self.exp_key.clone())
            })
            .collect())
    }

    fn validate(&self, doc: &TrialDoc) -> Result<(), ValidationError> {
        if doc.exp_key != self.exp_key {
            return Err(ValidationError::ExpKeyMismatch {
                expected: self.exp_key.clone(),
                actual: doc.exp_key.clone(),
            });
        }
        if self.dynamic_trials.iter().any(|existing| existing.id == doc.id) {
            return Err(ValidationError::DuplicateId { id: doc.id });
        }
        Ok(())
    }

    pub fn insert_doc(&mut self, doc: TrialDoc) -> HtResult<TrialId> {
        self.validate(&doc)?;
        let id = doc.id;
        self.dynamic_trials.push(doc);
        debug!("Inserted trial {}", id);
        Ok(id)
    }

    /// Insert documents one at a time, stopping at the first invalid one.
    ///
    /// Documents before the failing one stay inserted.
    pub fn insert_docs(
        &mut self,
        docs: impl IntoIterator<Item = TrialDoc>,
    ) -> HtResult<Vec<TrialId>> {
        let mut ids = Vec::new();
        for doc in docs {
            ids.push(self.insert_doc(doc)?);
        }
        Ok(ids)
    }

    /// Insert an untyped record, checking that every required field is present.
    pub fn insert_raw_doc(&mut self, raw: Value) -> HtResult<TrialId> {
        let object = raw.as_object().ok_or(ValidationError::NotAnObject)?;
        if let Some(field) = TrialDoc::REQUIRED_FIELDS
            .iter()
            .find(|field| !object.contains_key(**field))
        {
            return Err(ValidationError::MissingField {
                field: field.to_string(),
            }
            .into());
        }
        let doc: TrialDoc = serde_json::from_value(raw)?;
        self.insert_doc(doc)
    }

    pub fn insert_raw_docs(
        &mut self,
        raws: impl IntoIterator<Item = Value>,
    ) -> HtResult<Vec<TrialId>> {
        let mut ids = Vec::new();
        for raw in raws {
            ids.push(self.insert_raw_doc(raw)?);
        }
        Ok(ids)
    }

    /// Recompute the derived view from the authoritative log.
    ///
    /// With an `exp_key` set this also resets the id counter, so later
    /// reservations start again from 0 and collide with logged ids; such
    /// inserts fail with [`ValidationError::DuplicateId`].
    pub fn refresh(&mut self) {
        match &self.exp_key {
            None => {
                self.trials = self
                    .dynamic_trials
                    .iter()
                    .filter(|doc| doc.state != TrialState::Error)
                    .cloned()
                    .collect();
            }
            Some(exp_key) => {
                self.trials = self
                    .dynamic_trials
                    .iter()
                    .filter(|doc| {
                        doc.state != TrialState::Error
                            && doc.exp_key.as_deref() == Some(exp_key.as_str())
                    })
                    .cloned()
                    .collect();
                if self.next_id != 0 {
                    warn!(
                        "Refresh under exp_key {} resets the id counter (was {})",
                        exp_key, self.next_id
                    );
                }
                self.next_id = 0;
            }
        }
        info!(
            "Refreshed trial view: {} of {} trials",
            self.trials.len(),
            self.dynamic_trials.len()
        );
    }

    /// Count trials whose state is in `states`.
    ///
    /// With `use_persisted_view` the derived view is counted; otherwise a
    /// fresh pass over the log filtered only by `exp_key`.
    pub fn count_by_state(&self, states: &[TrialState], use_persisted_view: bool) -> usize {
        if use_persisted_view {
            self.trials
                .iter()
                .filter(|doc| states.contains(&doc.state))
                .count()
        } else {
            self.dynamic_trials
                .iter()
                .filter(|doc| self.exp_key.is_none() || doc.exp_key == self.exp_key)
                .filter(|doc| states.contains(&doc.state))
                .count()
        }
    }

    pub fn count_by_state_synced(&self, states: &[TrialState]) -> usize {
        self.count_by_state(states, true)
    }

    pub fn count_by_state_unsynced(&self, states: &[TrialState]) -> usize {
        self.count_by_state(states, false)
    }

    /// Loss (or accuracy, when no loss) of each trial in the view.
    pub fn losses(&self) -> Vec<Option<f64>> {
        self.trials
            .iter()
            .map(|doc| doc.result.signal().map(|signal| signal.value))
            .collect()
    }

    pub fn statuses(&self) -> Vec<ResultStatus> {
        self.trials.iter().map(|doc| doc.result.status).collect()
    }

    /// Best ok trial in the view under the default comparator: smaller loss,
    /// or larger accuracy when there is no loss.
    pub fn best_trial(&self) -> Option<&TrialDoc> {
        self.best_trial_by(default_better)
    }

    /// Best ok trial in the view, where `compare(a, b)` means "a is strictly
    /// better than b". Ties keep the earliest trial.
    pub fn best_trial_by<F>(&self, compare: F) -> Option<&TrialDoc>
    where
        F: Fn(&TrialResult, &TrialResult) -> bool,
    {
        let mut best: Option<&TrialDoc> = None;
        for doc in self.trials.iter().filter(|doc| doc.result.is_ok()) {
            best = match best {
                Some(current) if !compare(&doc.result, &current.result) => Some(current),
                _ => Some(doc),
            };
        }
        best
    }

    pub fn argmin(&self) -> Option<&Value> {
        self.best_trial().map(|doc| &doc.args)
    }

    /// Args of the trial with the largest loss-or-accuracy value.
    pub fn argmax(&self) -> Option<&Value> {
        self.best_trial_by(|a, b| raw_value(a) > raw_value(b))
            .map(|doc| &doc.args)
    }

    // -- Views and bookkeeping ----------------------------------------------

    /// Number of trials in the derived view.
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    pub fn view(&self) -> &[TrialDoc] {
        &self.trials
    }

    pub fn dynamic_trials(&self) -> &[TrialDoc] {
        &self.dynamic_trials
    }

    pub fn tids(&self) -> Vec<TrialId> {
        self.trials.iter().map(|doc| doc.id).collect()
    }

    pub fn results(&self) -> Vec<&TrialResult> {
        self.trials.iter().map(|doc| &doc.result).collect()
    }

    pub fn trial_args(&self) -> Vec<&Value> {
        self.trials.iter().map(|doc| &doc.args).collect()
    }

    /// Look up a trial in the authoritative log.
    pub fn get(&self, id: TrialId) -> Option<&TrialDoc> {
        self.dynamic_trials.iter().find(|doc| doc.id == id)
    }

    /// Mutable access to a logged trial, for recording progress in place.
    pub fn get_mut(&mut self, id: TrialId) -> Option<&mut TrialDoc> {
        self.dynamic_trials.iter_mut().find(|doc| doc.id == id)
    }

    /// Drop every trial and reset the id counter.
    pub fn delete_all(&mut self) {
        info!("Deleting all {} trials", self.dynamic_trials.len());
        self.dynamic_trials.clear();
        self.trials.clear();
        self.next_id = 0;
    }
}

/// Non-finite signals never win, and any finite signal beats one.
fn default_better(a: &TrialResult, b: &TrialResult) -> bool {
    match (a.signal(), b.signal()) {
        (Some(a), _) if !a.value.is_finite() => false,
        (Some(_), Some(b)) if !b.value.is_finite() => true,
        (Some(a), Some(b)) => a.better_than(&b),
        _ => false,
    }
}

fn raw_value(result: &TrialResult) -> Option<f64> {
    result.signal().map(|signal| signal.value)
}
