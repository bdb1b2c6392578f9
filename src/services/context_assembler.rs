use std::sync::Arc;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{ArticleChunkRecord, FigureRecord},
    repositories::{CorpusIndex, IndexFilter},
};

pub const CONTEXT_SEPARATOR: &str = "...";

/// Joins chunks in document order, framed by the separator on both ends.
pub fn join_chunks(mut chunks: Vec<ArticleChunkRecord>) -> String {
    chunks.sort_by_key(|chunk| chunk.chunk_index);
    let body = chunks
        .iter()
        .map(|chunk| chunk.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);
    format!("{}{}{}", CONTEXT_SEPARATOR, body, CONTEXT_SEPARATOR)
}

/// Retrieves the `k` chunks of the figure's own article nearest to its caption
/// and returns them as one context string in document order.
pub async fn assemble_context(
    figure: &FigureRecord,
    index: &dyn CorpusIndex,
    k: usize,
) -> AppResult<String> {
    let filter = IndexFilter::chunks_of(&figure.article_id);
    let hits = index.query_similar(&figure.caption_text, &filter, k).await?;

    let chunks: Vec<ArticleChunkRecord> = hits
        .iter()
        .filter_map(|hit| match hit.to_chunk() {
            Some(chunk) if chunk.article_id == figure.article_id => Some(chunk),
            _ => {
                log::warn!(
                    "Dropping index hit outside article {} for {}",
                    figure.article_id,
                    figure.figure_id
                );
                None
            }
        })
        .take(k)
        .collect();

    if chunks.is_empty() {
        log::warn!("No context chunks found for {}", figure.figure_id);
    }

    Ok(join_chunks(chunks))
}

pub struct ContextAssembler {
    index: Arc<dyn CorpusIndex>,
    k: usize,
}

impl ContextAssembler {
    pub fn new(index: Arc<dyn CorpusIndex>, k: usize) -> AppResult<Self> {
        if k == 0 {
            return Err(AppError::ValidationError(
                "Number of retrieved chunks must be at least 1".to_string(),
            ));
        }
        Ok(Self { index, k })
    }

    pub async fn assemble_context(&self, figure: &FigureRecord) -> AppResult<String> {
        assemble_context(figure, self.index.as_ref(), self.k).await
    }
}
