use crate::models::domain::{ArticleChunkRecord, FigureRecord};
use crate::repositories::CorpusFile;

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// A figure with a caption that names its own finding.
    pub fn test_figure() -> FigureRecord {
        FigureRecord::new(
            "Figure 18b",
            "bowel-perforation",
            "/images/bowel-perforation/fig18b.gif",
            "Axial CT image shows a thin linear bone fragment traversing the wall of a jejunal loop, consistent with fish-bone perforation.",
        )
    }

    pub fn test_chunks() -> Vec<ArticleChunkRecord> {
        vec![
            ArticleChunkRecord::new(
                "bowel-perforation",
                0,
                "Ingested foreign bodies rarely perforate the gastrointestinal tract.",
            ),
            ArticleChunkRecord::new(
                "bowel-perforation",
                1,
                "Fish bones are the most commonly ingested sharp foreign body and may cause perforation at the ileum or jejunum.",
            ),
            ArticleChunkRecord::new(
                "bowel-perforation",
                2,
                "CT shows a linear hyperattenuating structure with adjacent fat stranding.",
            ),
        ]
    }

    pub fn sample_corpus() -> CorpusFile {
        let mut chunks = test_chunks();
        chunks.push(ArticleChunkRecord::new(
            "glioblastoma",
            0,
            "Glioblastoma typically shows thick irregular ring enhancement with central necrosis.",
        ));

        CorpusFile {
            figures: vec![
                test_figure(),
                FigureRecord::new(
                    "Figure 3",
                    "glioblastoma",
                    "/images/glioblastoma/fig3.gif",
                    "Contrast-enhanced T1 image shows a ring-enhancing mass crossing the corpus callosum.",
                ),
            ],
            chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;

    #[test]
    fn test_fixtures_sample_corpus() {
        let corpus = sample_corpus();
        assert_eq!(corpus.figures.len(), 2);
        assert_eq!(corpus.chunks.len(), 4);
        assert_eq!(test_figure().article_id, "bowel-perforation");
    }
}
