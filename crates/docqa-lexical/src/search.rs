use tracing::debug;

use docqa_core::error::Result;
use docqa_core::types::{KeywordHit, StoredChunk};

use crate::settings::{IntentBonus, LexicalSettings};

pub struct LexicalIndex {
    settings: LexicalSettings,
}

impl LexicalIndex {
    pub fn new(settings: LexicalSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &LexicalSettings { &self.settings }

    /// Entity names first, then important terms, each literally present in
    /// the query. A term listed in both places is kept once.
    pub fn extract_keywords<'a>(&'a self, query: &str) -> Vec<&'a str> {
        let mut out: Vec<&str> = Vec::new();
        for term in self.settings.entities.iter().chain(self.settings.important_terms.iter()) {
            if !term.is_empty() && query.contains(term.as_str()) && !out.contains(&term.as_str()) {
                out.push(term);
            }
        }
        out
    }

    fn score(&self, keywords: &[&str], intents: &[&IntentBonus], content: &str) -> u32 {
        let s = &self.settings;
        let mut score = 0u32;
        for rule in intents {
            if rule.signature.matches(content) {
                score += rule.bonus;
            }
        }
        let is_table = content.contains(s.table_title_marker.as_str());
        for kw in keywords {
            let occurrences = content.matches(kw).count() as u32;
            if occurrences == 0 {
                continue;
            }
            score += occurrences * s.occurrence_weight;
            let opens_title = content.contains(&format!("【{kw}"));
            if opens_title || content.contains(&format!("{kw}】")) {
                score += s.title_bonus;
            }
            if opens_title && is_table {
                score += s.titled_table_bonus;
            }
        }
        score
    }

    /// Scores every chunk of `corpus` against `query`; zero-score chunks are
    /// dropped. Descending by score, ties keep corpus order.
    pub fn search(&self, corpus: &[StoredChunk], query: &str, max_results: usize) -> Vec<KeywordHit> {
        let keywords = self.extract_keywords(query);
        let intents: Vec<&IntentBonus> = self.settings.intents.iter().filter(|i| i.applies_to(query)).collect();
        if keywords.is_empty() && intents.is_empty() {
            return Vec::new();
        }
        let mut hits: Vec<KeywordHit> = corpus
            .iter()
            .filter_map(|chunk| {
                let score = self.score(&keywords, &intents, &chunk.content);
                (score > 0).then(|| KeywordHit { chunk: chunk.clone(), score })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        hits.truncate(max_results);
        debug!(keywords = ?keywords, intents = intents.len(), hits = hits.len(), "keyword search");
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ContentSignature;
    use docqa_core::types::{ChunkMetadata, FileType};

    fn stored(id: &str, content: &str) -> StoredChunk {
        StoredChunk {
            id: id.to_string(),
            content: content.to_string(),
            metadata: ChunkMetadata {
                filename: id.to_string(),
                file_type: FileType::Unknown,
                chunk_index: 0,
                total_chunks: 1,
            },
        }
    }

    fn index() -> LexicalIndex {
        LexicalIndex::new(LexicalSettings::default()).unwrap()
    }

    #[test]
    fn department_hours_table_scores_all_bonuses() {
        let corpus = vec![stored("doc1_0", "【診療部の勤務時間】日勤 8:30〜17:00")];
        let hits = index().search(&corpus, "診療部の勤務時間を教えて 始業 終業 労働時間 就業時間", 10);
        assert_eq!(hits.len(), 1);
        // intent 50, 診療部 2+20+100, 勤務時間 2+20
        assert_eq!(hits[0].score, 194);
    }

    #[test]
    fn keywords_keep_list_order_without_duplicates() {
        let idx = index();
        assert_eq!(idx.extract_keywords("薬局の有給休暇"), vec!["薬局", "休暇", "有給"]);
        assert!(idx.extract_keywords("駐車場").is_empty());
    }

    #[test]
    fn occurrences_are_weighted_and_zero_scores_dropped() {
        let corpus = vec![
            stored("a", "給与は月末に支払う。給与明細は翌月に配布する。"),
            stored("b", "駐車場の利用について"),
        ];
        let hits = index().search(&corpus, "給与", 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.id, "a");
        assert_eq!(hits[0].score, 4);
    }

    #[test]
    fn closing_bracket_gives_title_bonus_without_table_bonus() {
        let corpus = vec![stored("a", "【慶弔休暇】本人が結婚したとき5日")];
        // no leave signature in the chunk; 休暇: 2 + 20
        let hits = index().search(&corpus, "休暇", 10);
        assert_eq!(hits[0].score, 22);
    }

    #[test]
    fn leave_intents_prefer_grant_table() {
        let corpus = vec![
            stored("prose", "年次有給休暇は所定の手続きにより取得する。"),
            stored("table", "付与日数 10日 11日 12日 14日 16日 18日 20日"),
        ];
        let hits = index().search(&corpus, "有給の日数", 10);
        assert_eq!(hits[0].chunk.id, "table");
        // grant table 100 + row 80 + 日数 keyword 2
        assert_eq!(hits[0].score, 182);
        // annual leave 50 + 有給 2
        assert_eq!(hits[1].score, 52);
    }

    #[test]
    fn results_are_capped_and_ordered() {
        let corpus: Vec<StoredChunk> = (0..6).map(|i| stored(&format!("c{i}"), &"手当 ".repeat(i + 1))).collect();
        let hits = index().search(&corpus, "手当", 3);
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c5", "c4", "c3"]);
        assert!(index().search(&corpus, "手当", 0).is_empty());
    }

    #[test]
    fn custom_intent_table_is_applied() {
        let settings = LexicalSettings {
            intents: vec![IntentBonus {
                name: "travel".into(),
                query_terms: vec!["出張".into()],
                signature: ContentSignature::Contains("旅費規程".into()),
                bonus: 30,
            }],
            ..LexicalSettings::default()
        };
        let idx = LexicalIndex::new(settings).unwrap();
        let hits = idx.search(&[stored("t", "旅費規程 第1条")], "出張の精算", 5);
        assert_eq!(hits[0].score, 30);
    }

    #[test]
    fn empty_marker_is_rejected() {
        let settings = LexicalSettings { table_title_marker: String::new(), ..LexicalSettings::default() };
        assert!(LexicalIndex::new(settings).is_err());
    }
}
