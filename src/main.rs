use std::process::ExitCode;
use std::sync::Arc;

use figure_qbank::{
    app_state::AppState,
    config::Config,
    errors::{AppError, AppResult, ErrorResponse},
    models::domain::QuestionType,
    repositories::{CorpusIndex, InMemoryCorpusIndex},
};

const USAGE: &str = "usage: figure-qbank <question-type> [count] [topic]";

struct CliArgs {
    question_type: QuestionType,
    count: usize,
    topic: Option<String>,
}

fn parse_args(args: &[String]) -> AppResult<CliArgs> {
    let question_type = args
        .first()
        .ok_or_else(|| AppError::ValidationError(USAGE.to_string()))?
        .parse::<QuestionType>()?;
    let count = match args.get(1) {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| AppError::ValidationError(format!("Invalid count '{}'", raw)))?,
        None => 1,
    };
    let topic = args.get(2).cloned().filter(|t| !t.trim().is_empty());

    Ok(CliArgs {
        question_type,
        count,
        topic,
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => log::error!("Failed to serialize output: {}", e),
    }
}

async fn run() -> AppResult<usize> {
    let config = Config::from_env();
    config.validate_for_production()?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let index: Arc<dyn CorpusIndex> = Arc::new(InMemoryCorpusIndex::load_json(&config.corpus_path)?);
    let state = AppState::new(config, index)?;
    let mut session = state.new_session(cli.topic.as_deref(), None).await?;

    log::info!(
        "Generating {} {} question(s) in session {}",
        cli.count,
        cli.question_type,
        session.id
    );

    let mut failures = 0;
    let mut total_cost = 0.0;
    for _ in 0..cli.count {
        match state
            .qbank_service
            .generate_question(&mut session, cli.question_type)
            .await
        {
            Ok(question) => {
                total_cost += question.outcome.accumulated_cost;
                print_json(&question);
            }
            Err(e) => {
                total_cost += e.accumulated_cost;
                if e.error.is_exhaustion() {
                    log::warn!("No question after {} round(s): {}", e.rounds, e.error);
                } else {
                    log::error!("No question after {} round(s): {}", e.rounds, e.error);
                }
                print_json(&ErrorResponse::from(&e.error));
                failures += 1;
                if matches!(e.error, AppError::SelectionExhausted { .. }) {
                    break;
                }
            }
        }
    }

    log::info!("Session {} finished, total cost ${:.4}", session.id, total_cost);
    Ok(failures)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    match run().await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            log::warn!("{} question(s) could not be generated", failures);
            ExitCode::FAILURE
        }
        Err(e) => {
            print_json(&ErrorResponse::from(&e));
            ExitCode::FAILURE
        }
    }
}
