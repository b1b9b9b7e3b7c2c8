use std::collections::HashMap;

use docqa_core::types::{KeywordHit, SearchResult, VectorHit};

use crate::settings::RetrievalSettings;

/// Union of both candidate lists keyed by chunk id. Vector hits keep their
/// order and lexical-only hits follow; a missing side takes its default
/// (`keyword_only_distance`, keyword score 0).
pub fn union_by_id(vector: Vec<VectorHit>, lexical: Vec<KeywordHit>, keyword_only_distance: f32) -> Vec<SearchResult> {
    let mut out: Vec<SearchResult> = Vec::with_capacity(vector.len() + lexical.len());
    let mut by_id: HashMap<String, usize> = HashMap::new();
    for hit in vector {
        let id = hit.chunk.id.clone();
        let result = SearchResult {
            id: hit.chunk.id,
            content: hit.chunk.content,
            metadata: hit.chunk.metadata,
            distance: hit.distance,
            keyword_score: 0,
            rerank_score: None,
        };
        match by_id.get(&id) {
            Some(&i) => out[i] = result,
            None => {
                by_id.insert(id, out.len());
                out.push(result);
            }
        }
    }
    for hit in lexical {
        match by_id.get(&hit.chunk.id) {
            Some(&i) => out[i].keyword_score = hit.score,
            None => {
                by_id.insert(hit.chunk.id.clone(), out.len());
                out.push(SearchResult {
                    id: hit.chunk.id,
                    content: hit.chunk.content,
                    metadata: hit.chunk.metadata,
                    distance: keyword_only_distance,
                    keyword_score: hit.score,
                    rerank_score: None,
                });
            }
        }
    }
    out
}

/// Any lexical evidence admits a candidate; otherwise it must be close enough.
pub fn passes_threshold(result: &SearchResult, distance_threshold: f32) -> bool {
    result.keyword_score > 0 || result.distance <= distance_threshold
}

/// Ranking score used when no reranker runs.
pub fn combined_score(result: &SearchResult, keyword_weight: f32) -> f32 {
    -result.distance + result.keyword_score as f32 * keyword_weight
}

pub fn sort_by_combined(results: &mut [SearchResult], keyword_weight: f32) {
    results.sort_by(|a, b| combined_score(b, keyword_weight).total_cmp(&combined_score(a, keyword_weight)));
}

/// Attaches reranker scores plus the keyword bonuses, then sorts descending.
pub fn apply_rerank(results: &mut [SearchResult], scores: &[f32], settings: &RetrievalSettings) {
    for (result, &score) in results.iter_mut().zip(scores) {
        let mut s = score;
        if result.keyword_score >= settings.rerank_strong_match {
            s += settings.rerank_strong_bonus;
        }
        if result.keyword_score >= settings.rerank_exact_table {
            s += settings.rerank_exact_bonus;
        }
        result.rerank_score = Some(s);
    }
    results.sort_by(|a, b| {
        let (a, b) = (a.rerank_score.unwrap_or(f32::MIN), b.rerank_score.unwrap_or(f32::MIN));
        b.total_cmp(&a)
    });
}
