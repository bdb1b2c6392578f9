use std::{collections::HashMap, path::Path, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{ArticleChunkRecord, FigureRecord},
    repositories::corpus_index::{CorpusIndex, IndexFilter, IndexHit},
};

/// On-disk corpus layout read by [`InMemoryCorpusIndex::load_json`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorpusFile {
    #[serde(default)]
    pub figures: Vec<FigureRecord>,
    #[serde(default)]
    pub chunks: Vec<ArticleChunkRecord>,
}

struct IndexedRecord {
    hit: IndexHit,
    terms: HashMap<String, f64>,
    norm: f64,
}

impl IndexedRecord {
    fn new(hit: IndexHit) -> Self {
        let terms = term_frequencies(&hit.text);
        let norm = vector_norm(&terms);
        Self { hit, terms, norm }
    }
}

/// Lexical stand-in for an embedding index: bag-of-words cosine distance.
pub struct InMemoryCorpusIndex {
    records: Arc<RwLock<Vec<IndexedRecord>>>,
}

impl InMemoryCorpusIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn from_corpus(corpus: CorpusFile) -> Self {
        let records = corpus
            .figures
            .iter()
            .map(IndexHit::from_figure)
            .chain(corpus.chunks.iter().map(IndexHit::from_chunk))
            .map(IndexedRecord::new)
            .collect();

        Self {
            records: Arc::new(RwLock::new(records)),
        }
    }

    pub fn load_json(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let corpus: CorpusFile = serde_json::from_str(&raw)?;

        log::info!(
            "Loaded corpus from {}: {} figures, {} chunks",
            path.display(),
            corpus.figures.len(),
            corpus.chunks.len()
        );
        Ok(Self::from_corpus(corpus))
    }

    pub async fn insert_figure(&self, figure: &FigureRecord) {
        let mut records = self.records.write().await;
        records.push(IndexedRecord::new(IndexHit::from_figure(figure)));
    }

    pub async fn insert_chunk(&self, chunk: &ArticleChunkRecord) {
        let mut records = self.records.write().await;
        records.push(IndexedRecord::new(IndexHit::from_chunk(chunk)));
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl Default for InMemoryCorpusIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CorpusIndex for InMemoryCorpusIndex {
    async fn query_similar(
        &self,
        probe: &str,
        filter: &IndexFilter,
        n: usize,
    ) -> AppResult<Vec<IndexHit>> {
        if probe.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Similarity probe must not be empty".to_string(),
            ));
        }

        let probe_terms = term_frequencies(probe);
        let probe_norm = vector_norm(&probe_terms);
        let records = self.records.read().await;

        let mut scored: Vec<(f64, &IndexHit)> = records
            .iter()
            .filter(|record| filter.matches(&record.hit.metadata))
            .map(|record| {
                let distance = cosine_distance(&probe_terms, probe_norm, &record.terms, record.norm);
                (distance, &record.hit)
            })
            .collect();
        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(n)
            .map(|(distance, hit)| hit.clone().with_distance(distance))
            .collect())
    }

    async fn get_all(&self, filter: &IndexFilter) -> AppResult<Vec<IndexHit>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|record| filter.matches(&record.hit.metadata))
            .map(|record| record.hit.clone())
            .collect())
    }
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut terms = HashMap::new();
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        *terms.entry(word.to_lowercase()).or_insert(0.0) += 1.0;
    }
    terms
}

fn vector_norm(terms: &HashMap<String, f64>) -> f64 {
    terms.values().map(|v| v * v).sum::<f64>().sqrt()
}

// 1 - cosine similarity; records with no terms sit at the maximum distance.
fn cosine_distance(
    probe: &HashMap<String, f64>,
    probe_norm: f64,
    record: &HashMap<String, f64>,
    record_norm: f64,
) -> f64 {
    if probe_norm == 0.0 || record_norm == 0.0 {
        return 1.0;
    }
    let dot: f64 = probe
        .iter()
        .filter_map(|(term, weight)| record.get(term).map(|other| weight * other))
        .sum();
    (1.0 - dot / (probe_norm * record_norm)).max(0.0)
}
