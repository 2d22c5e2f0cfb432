use sable_advisor::{AdvisorConfig, OptimizationAdvisor};
use sable_types::{Configuration, History, Observation, ParameterValue, SearchSpace};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("🌟 Sable Quickstart Example");

    // Define the search space: two continuous knobs and a categorical one.
    let space = SearchSpace::new()
        .add_float("learning_rate", 0.001, 0.5)
        .add_float("momentum", 0.0, 0.99)
        .add_choice(
            "activation",
            vec![serde_json::json!("relu"), serde_json::json!("tanh")],
        );
    println!("Search space has {} parameters", space.len());

    // The advisor auto-selects its surrogate, acquisition and optimizer from
    // the problem shape; overrides go through the with_* builders.
    let config = AdvisorConfig::new("quickstart", space.clone())
        .with_initial_trials(5)
        .with_random_state(42);
    let mut advisor = OptimizationAdvisor::new(config)?;
    println!(
        "Strategy: surrogate={} acquisition={} optimizer={}",
        advisor.knobs().surrogate,
        advisor.knobs().acquisition,
        advisor.knobs().optimizer
    );

    // A toy objective to minimize: best at lr = 0.1, momentum = 0.9, relu.
    let objective = |config: &Configuration| -> f64 {
        let lr = match config.values[0] {
            ParameterValue::Float(v) => v,
            _ => 0.0,
        };
        let momentum = match config.values[1] {
            ParameterValue::Float(v) => v,
            _ => 0.0,
        };
        let activation_penalty = match &config.values[2] {
            ParameterValue::Json(v) if v.as_str() == Some("relu") => 0.0,
            _ => 0.05,
        };
        (lr - 0.1).powi(2) + (momentum - 0.9).powi(2) + activation_penalty
    };

    // The caller owns the history: suggest, evaluate, record, repeat.
    let mut history = History::new();
    for round in 0..25 {
        let suggestion = advisor.get_suggestion(&history)?;
        let value = objective(&suggestion);
        println!("round {round:>2}: objective {value:.4}");
        history.push(Observation::success(suggestion, vec![value], vec![]));
    }

    let incumbent = history
        .incumbent_value()
        .expect("history contains successful observations");
    println!("Best objective after 25 rounds: {incumbent:.4}");

    println!("✅ Done");
    Ok(())
}
