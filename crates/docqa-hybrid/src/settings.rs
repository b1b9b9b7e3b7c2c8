use serde::Deserialize;

use docqa_core::error::{Error, Result};
use docqa_vector::DistanceMetric;

/// Fusion and ranking knobs. The multipliers and bonuses are empirically
/// tuned; they are kept configurable rather than derived.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub n_results: usize,
    pub distance_threshold: f32,
    /// Vector candidates fetched per requested result.
    pub vector_overfetch: usize,
    /// Lexical candidates fetched per requested result.
    pub lexical_overfetch: usize,
    /// Distance assigned to candidates found only by the lexical index.
    pub keyword_only_distance: f32,
    /// Weight of `keyword_score` in the non-reranked combined score.
    pub keyword_weight: f32,
    pub rerank_strong_match: u32,
    pub rerank_strong_bonus: f32,
    pub rerank_exact_table: u32,
    pub rerank_exact_bonus: f32,
    pub distance_metric: DistanceMetric,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            n_results: 5,
            distance_threshold: 1.5,
            vector_overfetch: 3,
            lexical_overfetch: 2,
            keyword_only_distance: 10.0,
            keyword_weight: 3.0,
            rerank_strong_match: 50,
            rerank_strong_bonus: 10.0,
            rerank_exact_table: 100,
            rerank_exact_bonus: 20.0,
            distance_metric: DistanceMetric::L2,
        }
    }
}

impl RetrievalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.vector_overfetch == 0 || self.lexical_overfetch == 0 {
            return Err(Error::InvalidConfig("retrieval overfetch multipliers must be >= 1".into()));
        }
        if !(self.keyword_weight > 0.0) {
            return Err(Error::InvalidConfig(format!("retrieval.keyword_weight must be positive, got {}", self.keyword_weight)));
        }
        if !self.distance_threshold.is_finite() || !self.keyword_only_distance.is_finite() {
            return Err(Error::InvalidConfig("retrieval distances must be finite".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::config::Config;
    use docqa_lexical::{ContentSignature, LexicalSettings};

    #[test]
    fn sections_parse_with_partial_overrides() {
        let config = Config::from_toml_str(
            r#"
            [retrieval]
            n_results = 15
            distance_threshold = 3.0
            distance_metric = "cosine"

            [[lexical.intents]]
            name = "grant_days_row"
            query_terms = ["有給"]
            signature = { contains_all = ["10日", "11日"] }
            bonus = 80
            "#,
        );
        let retrieval: RetrievalSettings = config.section("retrieval").unwrap();
        assert_eq!(retrieval.n_results, 15);
        assert_eq!(retrieval.distance_metric, DistanceMetric::Cosine);
        assert_eq!(retrieval.vector_overfetch, 3);
        assert!(retrieval.validate().is_ok());

        let lexical: LexicalSettings = config.section("lexical").unwrap();
        assert_eq!(lexical.intents.len(), 1);
        assert_eq!(lexical.intents[0].signature, ContentSignature::ContainsAll(vec!["10日".into(), "11日".into()]));
        assert_eq!(lexical.title_bonus, 20);
    }

    #[test]
    fn zero_overfetch_is_rejected() {
        let settings = RetrievalSettings { vector_overfetch: 0, ..RetrievalSettings::default() };
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));
    }
}
