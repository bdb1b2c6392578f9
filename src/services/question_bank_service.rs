use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{FigureRecord, QuestionType},
    repositories::{CorpusIndex, IndexFilter},
    services::{
        context_assembler::ContextAssembler,
        generation_memory::GenerationMemory,
        refinement_engine::{ItemContext, RefinementEngine, RefinementError, RefinementOutcome},
        sampler::{make_sampler, Sampler, WeightParams},
    },
};

#[derive(Debug, Clone, Default)]
pub struct BankOptions {
    pub topic: Option<String>,
    pub selected_articles: Option<HashSet<String>>,
    pub weights: WeightParams,
    pub seed: Option<u64>,
}

impl BankOptions {
    pub fn with_topic(mut self, topic: &str) -> Self {
        let topic = topic.trim();
        self.topic = (!topic.is_empty()).then(|| topic.to_string());
        self
    }

    pub fn with_articles<I, S>(mut self, articles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_articles = Some(articles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The figures eligible for a session and the sampler that picks among them.
pub struct QuestionBank {
    figures: Vec<FigureRecord>,
    sampler: Sampler,
    topic: Option<String>,
}

impl QuestionBank {
    pub async fn setup(index: &dyn CorpusIndex, options: &BankOptions) -> AppResult<Self> {
        let filter = IndexFilter::figures();
        let in_selection = |figure: &FigureRecord| {
            options
                .selected_articles
                .as_ref()
                .map(|articles| articles.contains(&figure.article_id))
                .unwrap_or(true)
        };

        let (figures, scores) = match &options.topic {
            None => {
                let figures: Vec<FigureRecord> = index
                    .get_all(&filter)
                    .await?
                    .iter()
                    .filter_map(|hit| hit.to_figure())
                    .filter(|figure| in_selection(figure))
                    .collect();
                (figures, None)
            }
            Some(topic) => {
                let total = index.get_all(&filter).await?.len();
                let hits = index.query_similar(topic, &filter, total).await?;

                let mut figures = Vec::with_capacity(hits.len());
                let mut scores = Vec::with_capacity(hits.len());
                for hit in hits {
                    let Some(figure) = hit.to_figure() else {
                        continue;
                    };
                    if !in_selection(&figure) {
                        continue;
                    }
                    let distance = hit.distance.ok_or_else(|| {
                        AppError::Index(format!(
                            "Similarity hit for {} has no distance",
                            figure.figure_id
                        ))
                    })?;
                    figures.push(figure);
                    scores.push(distance);
                }
                (figures, Some(scores))
            }
        };

        if figures.is_empty() {
            return Err(AppError::NotFound(
                "No figures match the requested articles".to_string(),
            ));
        }

        let sampler = make_sampler(&figures, scores.as_deref(), options.weights, options.seed)?;
        log::info!(
            "Question bank ready: {} figures, {} sampling{}",
            figures.len(),
            if sampler.is_weighted() { "weighted" } else { "uniform" },
            options
                .topic
                .as_deref()
                .map(|t| format!(" for topic '{}'", t))
                .unwrap_or_default()
        );

        Ok(Self {
            figures,
            sampler,
            topic: options.topic.clone(),
        })
    }

    pub fn from_figures(figures: Vec<FigureRecord>, seed: Option<u64>) -> AppResult<Self> {
        let sampler = make_sampler(&figures, None, WeightParams::default(), seed)?;
        Ok(Self {
            figures,
            sampler,
            topic: None,
        })
    }

    pub fn figures(&self) -> &[FigureRecord] {
        &self.figures
    }

    pub fn len(&self) -> usize {
        self.figures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.figures.is_empty()
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.sampler.probabilities()
    }
}

/// One user's run over a question bank: which figures were used and how often.
pub struct GenerationSession {
    pub id: Uuid,
    bank: QuestionBank,
    memory: GenerationMemory,
    cap: u32,
    attempt_limit: usize,
    pub started_at: DateTime<Utc>,
}

impl GenerationSession {
    pub fn new(bank: QuestionBank, cap: u32, attempt_limit: usize) -> AppResult<Self> {
        if cap == 0 {
            return Err(AppError::ValidationError(
                "Questions per figure must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            bank,
            memory: GenerationMemory::new(),
            cap,
            attempt_limit,
            started_at: Utc::now(),
        })
    }

    pub fn next_figure(&mut self) -> AppResult<FigureRecord> {
        let index =
            self.memory
                .select_next_bounded(&mut self.bank.sampler, self.cap, self.attempt_limit)?;
        self.bank
            .figures
            .get(index)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("No figure at bank position {}", index)))
    }

    pub fn reset_memory(&mut self) {
        log::info!(
            "Resetting generation memory for session {} ({} questions recorded)",
            self.id,
            self.memory.total()
        );
        self.memory.reset();
    }

    pub fn questions_generated(&self) -> u32 {
        self.memory.total()
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedQuestion {
    pub session_id: Uuid,
    pub figure: FigureRecord,
    pub context: String,
    pub question_text: String,
    pub outcome: RefinementOutcome,
    pub generated_at: DateTime<Utc>,
}

pub struct QbankService {
    assembler: ContextAssembler,
    engine: RefinementEngine,
}

impl QbankService {
    pub fn new(assembler: ContextAssembler, engine: RefinementEngine) -> Self {
        Self { assembler, engine }
    }

    /// Selects a figure, assembles its context and refines one question for it.
    /// A failed figure counts towards its cap and is not replaced by another.
    pub async fn generate_question(
        &self,
        session: &mut GenerationSession,
        question_type: QuestionType,
    ) -> Result<GeneratedQuestion, RefinementError> {
        let figure = session.next_figure()?;
        log::info!("Session {} selected {}", session.id, figure.figure_id);

        let context = self.assembler.assemble_context(&figure).await?;
        let item = ItemContext::new(figure, context);
        let outcome = self.engine.generate_qa(&item, question_type).await?;

        Ok(GeneratedQuestion {
            session_id: session.id,
            question_text: outcome.artifact.render_question(),
            figure: item.figure,
            context: item.context,
            outcome,
            generated_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{corpus_index::MockCorpusIndex, IndexHit};

    fn figure(id: &str, article: &str) -> FigureRecord {
        FigureRecord::new(id, article, &format!("/{}.gif", id), &format!("Caption of {}", id))
    }

    fn figure_hits() -> Vec<IndexHit> {
        vec![
            IndexHit::from_figure(&figure("f1", "a1")),
            IndexHit::from_figure(&figure("f2", "a1")),
            IndexHit::from_figure(&figure("f3", "a2")),
        ]
    }

    #[tokio::test]
    async fn setup_without_topic_filters_articles() {
        let mut index = MockCorpusIndex::new();
        index.expect_get_all().returning(|_| Ok(figure_hits()));
        index.expect_query_similar().times(0);

        let options = BankOptions::default().with_articles(["a1"]);
        let bank = QuestionBank::setup(&index, &options).await.unwrap();

        assert_eq!(bank.len(), 2);
        assert!(bank.figures().iter().all(|f| f.article_id == "a1"));
        assert!(bank.topic().is_none());
    }

    #[tokio::test]
    async fn setup_with_topic_weights_by_distance() {
        let mut index = MockCorpusIndex::new();
        index.expect_get_all().returning(|_| Ok(figure_hits()));
        index
            .expect_query_similar()
            .withf(|probe, _, n| probe.to_string() == "glioma" && *n == 3)
            .returning(|_, _, _| {
                Ok(figure_hits()
                    .into_iter()
                    .zip([0.1, 0.5, 0.9])
                    .map(|(hit, d)| hit.with_distance(d))
                    .collect())
            });

        let options = BankOptions::default().with_topic("glioma").with_seed(5);
        let bank = QuestionBank::setup(&index, &options).await.unwrap();
        let probabilities = bank.probabilities();

        assert_eq!(bank.topic(), Some("glioma"));
        assert!(probabilities[0] > probabilities[1]);
        assert!(probabilities[1] > probabilities[2]);
    }

    #[tokio::test]
    async fn topic_hits_without_distance_are_an_index_error() {
        let mut index = MockCorpusIndex::new();
        index.expect_get_all().returning(|_| Ok(figure_hits()));
        index
            .expect_query_similar()
            .returning(|_, _, _| Ok(figure_hits()));

        let options = BankOptions::default().with_topic("glioma");
        let result = QuestionBank::setup(&index, &options).await;
        assert!(matches!(result, Err(AppError::Index(_))));
    }

    #[tokio::test]
    async fn empty_selection_is_not_found() {
        let mut index = MockCorpusIndex::new();
        index.expect_get_all().returning(|_| Ok(figure_hits()));

        let options = BankOptions::default().with_articles(["missing"]);
        let result = QuestionBank::setup(&index, &options).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn session_honours_cap_and_reset() {
        let bank = QuestionBank::from_figures(vec![figure("f1", "a"), figure("f2", "a")], Some(9))
            .unwrap();
        let mut session = GenerationSession::new(bank, 1, 100).unwrap();

        let first = session.next_figure().unwrap();
        let second = session.next_figure().unwrap();
        assert_ne!(first.figure_id, second.figure_id);
        assert!(matches!(
            session.next_figure(),
            Err(AppError::SelectionExhausted { .. })
        ));

        session.reset_memory();
        assert_eq!(session.questions_generated(), 0);
        assert!(session.next_figure().is_ok());
    }

    #[test]
    fn zero_cap_session_is_rejected() {
        let bank = QuestionBank::from_figures(vec![figure("f1", "a")], None).unwrap();
        assert!(GenerationSession::new(bank, 0, 10).is_err());
    }
}
