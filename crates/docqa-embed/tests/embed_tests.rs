use docqa_core::traits::Embedder;
use docqa_embed::{get_default_embedder, EmbeddingBackend, EmbeddingSettings, Framing, HashEmbedder};

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn hash_embedder_shapes_and_determinism() {
    let settings = EmbeddingSettings { backend: EmbeddingBackend::Hash, dim: 256, ..Default::default() };
    let embedder = get_default_embedder(&settings).expect("embedder");
    let texts = vec!["就業規則 第3条".to_string(), "就業規則 第3条".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");

    assert_eq!(embedder.dim(), 256);
    assert_eq!(embs[0].len(), 256);
    let norm: f32 = embs[0].iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");
    for (a, b) in embs[0].iter().zip(embs[1].iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn overlapping_text_is_closer_than_unrelated_text() {
    let embedder = HashEmbedder::new(512);
    let embs = embedder
        .embed_batch(&[
            "診療部の勤務時間は8時30分から17時15分".to_string(),
            "診療部の勤務時間".to_string(),
            "駐車場の利用申請について".to_string(),
        ])
        .unwrap();
    assert!(cosine(&embs[0], &embs[1]) > cosine(&embs[0], &embs[2]));
}

#[test]
fn empty_batch_yields_no_vectors() {
    let embedder = HashEmbedder::new(64);
    assert!(embedder.embed_batch(&[]).unwrap().is_empty());
}

#[test]
fn framing_prefixes_queries_and_passages() {
    let framing = EmbeddingSettings::default().framing();
    assert_eq!(framing.query("有給休暇"), "query: 有給休暇");
    assert_eq!(framing.passage("有給休暇"), "passage: 有給休暇");
    assert_eq!(Framing::default().query("x"), "x");
}
