use ht_optimizer::*;
use ht_types::TrialState;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    println!("Hypertune Basic Usage Example");

    let config = ExperimentConfig::new("quadratic")
        .with_exp_key("quadratic-v1")
        .with_seed(42)
        .with_fixed_params(json!({"target": 3.0}));

    let space = Expr::from_json(json!({
        "x": {"name": "uniform", "low": -10.0, "high": 10.0},
        "scale": {"name": "choice", "options": [1, 2, 5]}
    }));

    let evaluator = Evaluator::with_registry(standard_registry());
    let domain = config.domain(FnObjective::new(|args, fixed| {
        let x = args["x"].as_f64().unwrap_or_default();
        let scale = args["scale"].as_f64().unwrap_or(1.0);
        let target = fixed["target"].as_f64().unwrap_or_default();
        Ok(json!(scale * (x - target).powi(2)))
    }));
    let mut trials = config.trials();
    let mut rng = config.rng();

    for _ in 0..20 {
        let ids = trials.reserve_ids(1);
        let args = evaluator.evaluate_with(&space, &mut rng)?;
        let docs = trials.build_docs(&ids, &[domain.new_result()], &[args.clone()])?;
        trials.insert_docs(docs)?;

        let Some(doc) = trials.get_mut(ids[0]) else {
            continue;
        };
        doc.mark_running();
        match domain.evaluate(&args).await {
            Ok(result) => doc.mark_done(result),
            Err(e) => {
                println!("Trial {} failed: {}", ids[0], e);
                doc.mark_error();
            }
        }
    }

    trials.refresh();
    println!(
        "Completed {} trials",
        trials.count_by_state_synced(&[TrialState::Done])
    );
    if let Some(best) = trials.best_trial() {
        println!("Best loss {:?} at {}", best.result.loss, best.args);
    }

    Ok(())
}
