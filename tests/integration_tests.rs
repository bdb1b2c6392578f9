mod common;

use std::sync::Arc;

use common::{sample_corpus, ScriptedProvider, PASS};
use figure_qbank::{
    app_state::AppState,
    config::Config,
    errors::AppError,
    models::domain::QuestionType,
    repositories::{CorpusIndex, InMemoryCorpusIndex},
    services::{
        context_assembler::assemble_context,
        question_bank_service::{BankOptions, GenerationSession, QbankService, QuestionBank},
    },
};

fn config() -> Config {
    let mut config = Config::from_env();
    config.generator_model = common::GENERATOR_MODEL.to_string();
    config.validator_model = common::VALIDATOR_MODEL.to_string();
    config.format_model = common::FORMAT_MODEL.to_string();
    config.max_rounds = 3;
    config.max_format_retries = 2;
    config.num_retrieved_chunks = 3;
    config.max_questions_per_figure = 1;
    config.selection_attempt_limit = 1_000;
    config
}

fn state(provider: Arc<ScriptedProvider>) -> AppState {
    let index: Arc<dyn CorpusIndex> = Arc::new(InMemoryCorpusIndex::from_corpus(sample_corpus()));
    AppState::with_provider(config(), index, provider, common::pricing()).unwrap()
}

#[tokio::test]
async fn context_is_built_from_own_article_in_document_order() {
    let index = InMemoryCorpusIndex::from_corpus(sample_corpus());

    let context = assemble_context(&common::test_figure(), &index, 3).await.unwrap();

    assert_eq!(
        context,
        "...Ingested foreign bodies such as a fish bone rarely cause perforation.\
         ...Perforation of a jejunal loop is most common at angulated segments.\
         ...CT shows a linear hyperattenuating bone with adjacent fat stranding...."
    );
}

#[tokio::test]
async fn session_generates_one_question_per_figure() {
    let provider = Arc::new(ScriptedProvider::new());
    provider
        .always(
            common::GENERATOR_MODEL,
            r#"{"question": "Name the most likely diagnosis for the figure provided.", "answer": "Perforation"}"#,
        )
        .await;
    provider.always(common::VALIDATOR_MODEL, PASS).await;

    let state = state(provider.clone());
    let mut session = state.new_session(None, None).await.unwrap();

    let first = state
        .qbank_service
        .generate_question(&mut session, QuestionType::ShortAnswer)
        .await
        .unwrap();
    let second = state
        .qbank_service
        .generate_question(&mut session, QuestionType::ShortAnswer)
        .await
        .unwrap();

    assert_ne!(first.figure.figure_id, second.figure.figure_id);
    assert_eq!(first.session_id, session.id);
    assert!(first.context.starts_with("...") && first.context.ends_with("..."));
    assert_eq!(first.question_text, first.outcome.artifact.question);

    let exhausted = state
        .qbank_service
        .generate_question(&mut session, QuestionType::ShortAnswer)
        .await
        .unwrap_err();
    assert!(matches!(exhausted.error, AppError::SelectionExhausted { .. }));
    assert_eq!(exhausted.accumulated_cost, 0.0);

    let json = serde_json::to_value(&first).unwrap();
    assert_eq!(json["outcome"]["artifact"]["question_type"], "Short-Answer");
}

#[tokio::test]
async fn failed_refinement_still_uses_up_the_figure() {
    let provider = Arc::new(ScriptedProvider::new());
    provider
        .always(
            common::GENERATOR_MODEL,
            r#"{"question": "What is shown?", "answer": "Perforation"}"#,
        )
        .await;
    provider
        .always(
            common::VALIDATOR_MODEL,
            r#"{"status": "Fail", "message": "Add a clinical scenario."}"#,
        )
        .await;

    let state = state(provider.clone());
    let bank = QuestionBank::from_figures(vec![common::test_figure()], Some(2)).unwrap();
    let mut session = GenerationSession::new(bank, 1, 100).unwrap();

    let err = state
        .qbank_service
        .generate_question(&mut session, QuestionType::ShortAnswer)
        .await
        .unwrap_err();

    assert!(matches!(err.error, AppError::RevisionExhausted { rounds: 3, .. }));
    assert_eq!(err.rounds, 3);
    assert_eq!(session.questions_generated(), 1);
    assert!(matches!(
        session.next_figure(),
        Err(AppError::SelectionExhausted { .. })
    ));
}

#[tokio::test]
async fn topic_bank_is_weighted_towards_matching_figures() {
    let index = InMemoryCorpusIndex::from_corpus(sample_corpus());
    let options = BankOptions::default()
        .with_topic("ring enhancing mass corpus callosum")
        .with_seed(4);

    let bank = QuestionBank::setup(&index, &options).await.unwrap();
    let probabilities = bank.probabilities();
    let glioma = bank
        .figures()
        .iter()
        .position(|f| f.article_id == "glioblastoma")
        .unwrap();

    assert!(probabilities[glioma] > 0.99);
}

#[tokio::test]
async fn service_can_be_built_from_parts() {
    let provider = Arc::new(ScriptedProvider::new());
    provider.always(common::GENERATOR_MODEL, r#"{"question": "Q?", "answer": "A"}"#).await;
    provider.always(common::VALIDATOR_MODEL, PASS).await;

    let index: Arc<dyn CorpusIndex> = Arc::new(InMemoryCorpusIndex::from_corpus(sample_corpus()));
    let assembler =
        figure_qbank::services::context_assembler::ContextAssembler::new(index, 2).unwrap();
    let service = QbankService::new(assembler, common::engine(provider, common::settings()));

    let bank = QuestionBank::from_figures(vec![common::test_figure()], None).unwrap();
    let mut session = GenerationSession::new(bank, 2, 10).unwrap();
    let generated = service
        .generate_question(&mut session, QuestionType::ShortAnswer)
        .await
        .unwrap();

    assert_eq!(generated.figure, common::test_figure());
    assert_eq!(generated.outcome.rounds, 1);
}
