pub mod corpus_index;
pub mod in_memory_index;

pub use corpus_index::{CorpusIndex, HitMetadata, IndexFilter, IndexHit, RecordKind};
pub use in_memory_index::{CorpusFile, InMemoryCorpusIndex};
