use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppResult,
    models::domain::{ArticleChunkRecord, FigureRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Figure,
    ArticleChunk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexFilter {
    pub kind: RecordKind,
    pub article_id: Option<String>,
}

impl IndexFilter {
    pub fn figures() -> Self {
        IndexFilter {
            kind: RecordKind::Figure,
            article_id: None,
        }
    }

    pub fn chunks_of(article_id: &str) -> Self {
        IndexFilter {
            kind: RecordKind::ArticleChunk,
            article_id: Some(article_id.to_string()),
        }
    }

    pub fn matches(&self, metadata: &HitMetadata) -> bool {
        metadata.kind() == self.kind
            && self
                .article_id
                .as_deref()
                .map(|id| id == metadata.article_id())
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HitMetadata {
    Figure {
        figure_id: String,
        article_id: String,
        image_path: String,
    },
    ArticleChunk {
        article_id: String,
        chunk_index: u32,
    },
}

impl HitMetadata {
    pub fn kind(&self) -> RecordKind {
        match self {
            HitMetadata::Figure { .. } => RecordKind::Figure,
            HitMetadata::ArticleChunk { .. } => RecordKind::ArticleChunk,
        }
    }

    pub fn article_id(&self) -> &str {
        match self {
            HitMetadata::Figure { article_id, .. } => article_id,
            HitMetadata::ArticleChunk { article_id, .. } => article_id,
        }
    }
}

/// One record returned by the index. `distance` is set for similarity queries only.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub text: String,
    pub metadata: HitMetadata,
    pub distance: Option<f64>,
}

impl IndexHit {
    pub fn from_figure(figure: &FigureRecord) -> Self {
        IndexHit {
            text: figure.caption_text.clone(),
            metadata: HitMetadata::Figure {
                figure_id: figure.figure_id.clone(),
                article_id: figure.article_id.clone(),
                image_path: figure.image_path.clone(),
            },
            distance: None,
        }
    }

    pub fn from_chunk(chunk: &ArticleChunkRecord) -> Self {
        IndexHit {
            text: chunk.text.clone(),
            metadata: HitMetadata::ArticleChunk {
                article_id: chunk.article_id.clone(),
                chunk_index: chunk.chunk_index,
            },
            distance: None,
        }
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn to_figure(&self) -> Option<FigureRecord> {
        match &self.metadata {
            HitMetadata::Figure {
                figure_id,
                article_id,
                image_path,
            } => Some(FigureRecord {
                figure_id: figure_id.clone(),
                article_id: article_id.clone(),
                image_path: image_path.clone(),
                caption_text: self.text.clone(),
            }),
            HitMetadata::ArticleChunk { .. } => None,
        }
    }

    pub fn to_chunk(&self) -> Option<ArticleChunkRecord> {
        match &self.metadata {
            HitMetadata::ArticleChunk {
                article_id,
                chunk_index,
            } => Some(ArticleChunkRecord {
                article_id: article_id.clone(),
                chunk_index: *chunk_index,
                text: self.text.clone(),
            }),
            HitMetadata::Figure { .. } => None,
        }
    }
}

/// Read-only view of the figure/chunk corpus. Similarity results come back
/// nearest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CorpusIndex: Send + Sync {
    async fn query_similar(
        &self,
        probe: &str,
        filter: &IndexFilter,
        n: usize,
    ) -> AppResult<Vec<IndexHit>>;
    async fn get_all(&self, filter: &IndexFilter) -> AppResult<Vec<IndexHit>>;
}
