use serde::{Deserialize, Serialize};

/// A figure (or sub-figure) and its caption, as loaded from the corpus index.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FigureRecord {
    pub figure_id: String,  // e.g. "Figure 9a"
    pub article_id: String, // source article the figure belongs to
    pub image_path: String,
    pub caption_text: String,
}

impl FigureRecord {
    pub fn new(figure_id: &str, article_id: &str, image_path: &str, caption_text: &str) -> Self {
        FigureRecord {
            figure_id: figure_id.to_string(),
            article_id: article_id.to_string(),
            image_path: image_path.to_string(),
            caption_text: caption_text.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ArticleChunkRecord {
    pub article_id: String,
    pub chunk_index: u32, // position within the article; defines document order
    pub text: String,
}

impl ArticleChunkRecord {
    pub fn new(article_id: &str, chunk_index: u32, text: &str) -> Self {
        ArticleChunkRecord {
            article_id: article_id.to_string(),
            chunk_index,
            text: text.to_string(),
        }
    }
}
