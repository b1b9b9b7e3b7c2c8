//! docqa-hybrid
//!
//! Query expansion and hybrid retrieval: vector neighbours and lexical hits
//! are unioned by chunk id, filtered by distance (lexical hits always pass),
//! then ranked by a cross-encoder or by a combined score.
pub mod expansion;
pub mod fusion;
pub mod retriever;
pub mod service;
pub mod settings;

pub use expansion::QueryExpander;
pub use retriever::HybridRetriever;
pub use service::{answer_cache_key, RetrievalService, SearchOptions, ServiceParts};
pub use settings::RetrievalSettings;
