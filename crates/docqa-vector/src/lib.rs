//! Embedding Index over a local LanceDB collection.
//!
//! One row per chunk: id, text, metadata and the passage vector. Passages and
//! queries are framed with the same [`Framing`] the index was opened with.

pub mod schema;
mod search;
pub mod table;
mod writer;

use anyhow::Result;
use lancedb::{Connection, DistanceType, Table};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use docqa_core::config::expand_path;
use docqa_core::traits::Embedder;
use docqa_embed::Framing;

pub use writer::{EncodedBatch, PassageEncoder};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub path: String,
    pub collection: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: "data/lancedb".to_string(), collection: "company_documents".to_string() }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    L2,
    Cosine,
    Dot,
}

impl From<DistanceMetric> for DistanceType {
    fn from(m: DistanceMetric) -> Self {
        match m {
            DistanceMetric::L2 => DistanceType::L2,
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::Dot => DistanceType::Dot,
        }
    }
}

pub struct EmbeddingIndex {
    db: Connection,
    root: PathBuf,
    name: String,
    table: Table,
    embedder: Arc<dyn Embedder>,
    framing: Framing,
    metric: DistanceMetric,
    show_progress: bool,
}

impl EmbeddingIndex {
    /// Opens the collection, creating it on first run and recreating it when
    /// it is unreadable or was built with a different vector width.
    pub async fn open(
        settings: &StoreSettings,
        metric: DistanceMetric,
        embedder: Arc<dyn Embedder>,
        framing: Framing,
    ) -> Result<Self> {
        let root = expand_path(&settings.path);
        let db = table::open_db(&root).await?;
        let table = table::open_or_create(&db, &root, &settings.collection, embedder.dim()).await?;
        info!(path = %root.display(), collection = %settings.collection, ?metric, "Embedding index ready");
        Ok(Self {
            db,
            root,
            name: settings.collection.clone(),
            table,
            embedder,
            framing,
            metric,
            show_progress: false,
        })
    }

    /// Shows an indicatif bar while encoding passages.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn dim(&self) -> usize { self.embedder.dim() }

    /// Drops every entry and starts over with an empty collection.
    pub async fn clear(&mut self) -> Result<()> {
        self.table = table::recreate(&self.db, &self.root, &self.name, self.embedder.dim()).await?;
        info!(collection = %self.name, "Cleared collection");
        Ok(())
    }
}
