use std::sync::Arc;

use docqa_core::types::{Chunk, ChunkMetadata, FileType};
use docqa_embed::{Framing, HashEmbedder};
use docqa_vector::{DistanceMetric, EmbeddingIndex, StoreSettings};
use tempfile::TempDir;

fn chunk(filename: &str, file_type: FileType, idx: usize, total: usize, content: &str) -> Chunk {
    Chunk {
        content: content.to_string(),
        metadata: ChunkMetadata { filename: filename.to_string(), file_type, chunk_index: idx, total_chunks: total },
    }
}

fn settings(tmp: &TempDir) -> StoreSettings {
    StoreSettings { path: tmp.path().to_string_lossy().to_string(), collection: "docs_test".to_string() }
}

async fn open(tmp: &TempDir, dim: usize) -> EmbeddingIndex {
    let framing = Framing { query_prefix: "query: ".into(), passage_prefix: "passage: ".into() };
    EmbeddingIndex::open(&settings(tmp), DistanceMetric::L2, Arc::new(HashEmbedder::new(dim)), framing)
        .await
        .expect("open index")
}

fn two_documents() -> Vec<Chunk> {
    vec![
        chunk("A.docx", FileType::Word, 0, 3, "第1条 この規則は職員の就業に関する事項を定める。"),
        chunk("A.docx", FileType::Word, 1, 3, "第2条 職員は誠実に職務を遂行しなければならない。"),
        chunk("A.docx", FileType::Word, 2, 3, "第3条 年次有給休暇は勤続年数に応じて付与する。"),
        chunk("B.xlsx", FileType::Excel, 0, 2, "【診療部の勤務時間】日勤 8:30〜17:00"),
        chunk("B.xlsx", FileType::Excel, 1, 2, "【看護部の勤務時間】夜勤 16:30〜9:00"),
    ]
}

#[tokio::test]
async fn add_count_and_clear() {
    let tmp = TempDir::new().expect("tmp");
    let mut index = open(&tmp, 64).await;
    assert_eq!(index.count().await.unwrap(), 0);

    assert_eq!(index.add(&two_documents()).await.unwrap(), 5);
    assert_eq!(index.count().await.unwrap(), 5);

    index.clear().await.unwrap();
    assert_eq!(index.count().await.unwrap(), 0);
    assert!(index.query("勤務時間", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn readding_an_id_overwrites_it() {
    let tmp = TempDir::new().expect("tmp");
    let index = open(&tmp, 64).await;
    index.add(&two_documents()).await.unwrap();
    index.add(&[chunk("B.xlsx", FileType::Excel, 0, 2, "【診療部の勤務時間】日勤 9:00〜18:00")]).await.unwrap();

    assert_eq!(index.count().await.unwrap(), 5);
    let all = index.get_all().await.unwrap();
    let updated = all.iter().find(|c| c.id == "B.xlsx_0").expect("B.xlsx_0 present");
    assert!(updated.content.contains("9:00〜18:00"));
    assert_eq!(updated.metadata.file_type, FileType::Excel);
    assert_eq!(updated.metadata.total_chunks, 2);
}

#[tokio::test]
async fn query_returns_nearest_first() {
    let tmp = TempDir::new().expect("tmp");
    let index = open(&tmp, 256).await;
    index.add(&two_documents()).await.unwrap();

    let hits = index.query("【診療部の勤務時間】日勤 8:30〜17:00", 3).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[0].chunk.id, "B.xlsx_0");
    for pair in hits.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
}

#[tokio::test]
async fn oversized_k_returns_every_row() {
    let tmp = TempDir::new().expect("tmp");
    let index = open(&tmp, 64).await;
    index.add(&two_documents()).await.unwrap();

    let hits = index.query("勤務時間", usize::MAX).await.unwrap();
    assert_eq!(hits.len(), 5);
}

#[tokio::test]
async fn empty_collection_and_zero_k_yield_nothing() {
    let tmp = TempDir::new().expect("tmp");
    let index = open(&tmp, 32).await;
    assert!(index.query("any query", 5).await.unwrap().is_empty());
    assert_eq!(index.add(&[]).await.unwrap(), 0);

    index.add(&two_documents()).await.unwrap();
    assert!(index.query("勤務時間", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn reopening_keeps_rows_and_dim_change_recreates() {
    let tmp = TempDir::new().expect("tmp");
    {
        let index = open(&tmp, 32).await;
        index.add(&two_documents()).await.unwrap();
    }
    let reopened = open(&tmp, 32).await;
    assert_eq!(reopened.count().await.unwrap(), 5);
    drop(reopened);

    let widened = open(&tmp, 48).await;
    assert_eq!(widened.dim(), 48);
    assert_eq!(widened.count().await.unwrap(), 0);
}
