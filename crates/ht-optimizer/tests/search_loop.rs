use ht_optimizer::*;
use ht_types::{HtError, ResultError, ResultStatus, TrialState};
use serde_json::{json, Value};

fn space() -> Expr {
    Expr::from_json(json!({
        "lr": {"name": "loguniform", "low": 1e-4, "high": 1e-1},
        "layers": {"name": "randint", "low": 1, "high": 4},
        "optimizer": {"name": "choice", "options": ["sgd", "adam", "broken"]}
    }))
}

fn objective(args: &Value, fixed: &Value) -> anyhow::Result<Value> {
    if args["optimizer"] == "broken" {
        return Ok(json!({"status": "bogus"}));
    }
    let lr = args["lr"].as_f64().unwrap_or_default();
    let layers = args["layers"].as_f64().unwrap_or_default();
    let penalty = fixed["penalty"].as_f64().unwrap_or_default();
    Ok(json!({"status": "ok", "loss": (lr.ln() + 5.0).abs() + penalty * layers}))
}

async fn run(config: &ExperimentConfig, n: usize) -> Trials {
    let evaluator = Evaluator::with_registry(standard_registry());
    let domain = config.domain(FnObjective::new(objective));
    let mut trials = config.trials();
    let mut rng = config.rng();
    let space = space();

    for _ in 0..n {
        let ids = trials.reserve_ids(1);
        let args = evaluator.evaluate_with(&space, &mut rng).unwrap();
        let docs = trials
            .build_docs(&ids, &[domain.new_result()], &[args.clone()])
            .unwrap();
        trials.insert_docs(docs).unwrap();

        let doc = trials.get_mut(ids[0]).unwrap();
        doc.mark_running();
        match domain.evaluate(&args).await {
            Ok(result) => doc.mark_done(result),
            Err(HtError::Result(ResultError::InvalidStatus { .. })) => doc.mark_error(),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    trials.refresh();
    trials
}

#[tokio::test]
async fn search_loop_records_and_ranks_trials() {
    let config = ExperimentConfig::new("loop")
        .with_seed(2024)
        .with_fixed_params(json!({"penalty": 0.01}));
    let trials = run(&config, 30).await;

    let errors = trials.count_by_state_unsynced(&[TrialState::Error]);
    let done = trials.count_by_state_synced(&[TrialState::Done]);
    assert_eq!(errors + done, 30);
    assert_eq!(trials.len(), done);
    assert_eq!(trials.count_by_state_synced(&[TrialState::Error]), 0);
    assert!(trials.statuses().iter().all(|s| *s == ResultStatus::Ok));

    let best = trials.best_trial().expect("at least one ok trial");
    let best_loss = best.result.loss.unwrap();
    for loss in trials.losses() {
        assert!(best_loss <= loss.unwrap());
    }
    assert_eq!(trials.argmin(), Some(&best.args));
}

#[tokio::test]
async fn same_seed_reproduces_the_search() {
    let config = ExperimentConfig::new("repro").with_seed(9);
    let first = run(&config, 10).await;
    let second = run(&config, 10).await;
    assert_eq!(first.trial_args(), second.trial_args());
    assert_eq!(first.losses(), second.losses());
}

#[tokio::test]
async fn experiments_share_a_log_by_key() {
    let config = ExperimentConfig::new("keyed").with_exp_key("A").with_seed(1);
    let trials = run(&config, 5).await;
    assert!(trials.view().iter().all(|doc| doc.exp_key.as_deref() == Some("A")));
}
