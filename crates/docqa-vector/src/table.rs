//! LanceDB connection and collection housekeeping.
//!
//! A missing collection is the normal first-run state and is created empty.
//! A collection that cannot be opened, or whose vector width differs from the
//! active embedder, is dropped and recreated.
use anyhow::{Context, Result};
use arrow_array::RecordBatchIterator;
use lancedb::{connect, Connection, Table};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::schema::{build_schema, vector_dim};

pub async fn open_db(root: &Path) -> Result<Connection> {
    std::fs::create_dir_all(root).with_context(|| format!("creating store directory {}", root.display()))?;
    Ok(connect(root.to_string_lossy().as_ref()).execute().await?)
}

/// On-disk directory of a local collection.
pub fn table_dir(root: &Path, name: &str) -> PathBuf {
    root.join(format!("{name}.lance"))
}

pub async fn create_empty(conn: &Connection, name: &str, dim: usize) -> Result<Table> {
    let schema = build_schema(dim as i32);
    let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
    let table = conn.create_table(name, Box::new(iter)).execute().await?;
    info!(collection = name, dim, "Created empty collection");
    Ok(table)
}

/// Removes the collection directory and creates a fresh empty table.
pub async fn recreate(conn: &Connection, root: &Path, name: &str, dim: usize) -> Result<Table> {
    let dir = table_dir(root, name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).with_context(|| format!("removing {}", dir.display()))?;
    }
    create_empty(conn, name, dim).await
}

pub async fn open_or_create(conn: &Connection, root: &Path, name: &str, dim: usize) -> Result<Table> {
    let names = conn.table_names().execute().await?;
    if !names.iter().any(|n| n == name) {
        if table_dir(root, name).exists() {
            warn!(collection = name, "Collection directory is not a readable table; recreating");
            return recreate(conn, root, name, dim).await;
        }
        return create_empty(conn, name, dim).await;
    }
    let table = match conn.open_table(name).execute().await {
        Ok(t) => t,
        Err(e) => {
            warn!(collection = name, error = %e, "Failed to open collection; recreating");
            return recreate(conn, root, name, dim).await;
        }
    };
    match table.schema().await {
        Ok(schema) if vector_dim(&schema) == Some(dim as i32) => {
            info!(collection = name, "Opened collection");
            Ok(table)
        }
        Ok(schema) => {
            warn!(collection = name, stored = ?vector_dim(&schema), expected = dim, "Vector width mismatch; recreating");
            recreate(conn, root, name, dim).await
        }
        Err(e) => {
            warn!(collection = name, error = %e, "Unreadable collection schema; recreating");
            recreate(conn, root, name, dim).await
        }
    }
}
