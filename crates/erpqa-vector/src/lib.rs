pub mod format;
pub mod handle;
pub mod index;
pub mod pipeline;
pub mod retriever;

pub use handle::IndexHandle;
pub use index::{cosine_distance, LoadPolicy, Neighbor, VectorIndex};
pub use pipeline::{index_directory, index_documents, IndexingReport};
pub use retriever::VectorRetriever;
