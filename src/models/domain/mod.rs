pub mod figure;
pub mod qa_artifact;
pub mod verdict;
pub use figure::{ArticleChunkRecord, FigureRecord};
pub use qa_artifact::{LengthClass, QaArtifact, QuestionType};
pub use verdict::{ValidatorVerdict, VerdictStatus};
