use serde::Deserialize;

use docqa_core::error::{Error, Result};

/// Content-side predicate of an intent bonus.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContentSignature {
    Contains(String),
    ContainsAll(Vec<String>),
}

impl ContentSignature {
    pub fn matches(&self, content: &str) -> bool {
        match self {
            Self::Contains(s) => content.contains(s.as_str()),
            Self::ContainsAll(all) => all.iter().all(|s| content.contains(s.as_str())),
        }
    }
}

/// Adds `bonus` to a chunk when the query mentions any of `query_terms` and
/// the chunk content matches `signature`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct IntentBonus {
    pub name: String,
    pub query_terms: Vec<String>,
    pub signature: ContentSignature,
    pub bonus: u32,
}

impl IntentBonus {
    pub fn applies_to(&self, query: &str) -> bool {
        self.query_terms.iter().any(|t| query.contains(t.as_str()))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LexicalSettings {
    /// Points per occurrence of a matched keyword.
    pub occurrence_weight: u32,
    /// Keyword directly after `【` or directly before `】`.
    pub title_bonus: u32,
    /// Keyword opens a bracketed title and the chunk is a table (`table_title_marker`).
    pub titled_table_bonus: u32,
    pub table_title_marker: String,
    pub entities: Vec<String>,
    pub important_terms: Vec<String>,
    pub intents: Vec<IntentBonus>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

const WORK_TIME_QUERY: &[&str] = &["勤務時間", "始業", "終業", "シフト", "勤務"];
const LEAVE_QUERY: &[&str] = &["休暇", "有給", "特別休暇", "付与", "日数"];

fn intent(name: &str, query_terms: &[&str], signature: ContentSignature, bonus: u32) -> IntentBonus {
    IntentBonus { name: name.to_string(), query_terms: strings(query_terms), signature, bonus }
}

pub fn default_intents() -> Vec<IntentBonus> {
    vec![
        intent("work_hours_table", WORK_TIME_QUERY, ContentSignature::Contains("勤務時間】".into()), 50),
        intent("annual_leave", LEAVE_QUERY, ContentSignature::Contains("年次有給休暇".into()), 50),
        intent("special_leave", LEAVE_QUERY, ContentSignature::Contains("特別休暇".into()), 50),
        intent("grant_days_table", LEAVE_QUERY, ContentSignature::Contains("付与日数".into()), 100),
        intent(
            "grant_days_row",
            LEAVE_QUERY,
            ContentSignature::ContainsAll(strings(&["10日", "11日", "12日"])),
            80,
        ),
    ]
}

impl Default for LexicalSettings {
    fn default() -> Self {
        Self {
            occurrence_weight: 2,
            title_bonus: 20,
            titled_table_bonus: 100,
            table_title_marker: "勤務時間】".to_string(),
            // Spaced spellings are matched as written in the source documents.
            entities: strings(&[
                "診療部", "看護部門", "放射線科", "リハビリテーション科", "リハビリ",
                "栄養科", "検査科", "薬局", "薬　局", "地域連携室", "事務部門", "事務",
                "訪問看護ステーション", "訪問看護", "パートタイマー",
            ]),
            important_terms: strings(&[
                "勤務時間", "始業", "終業", "シフト", "休暇", "休業", "給与", "手当",
                "有給", "年次有給", "特別休暇", "付与", "日数", "届出", "手続き",
            ]),
            intents: default_intents(),
        }
    }
}

impl LexicalSettings {
    pub fn validate(&self) -> Result<()> {
        if self.table_title_marker.is_empty() {
            return Err(Error::InvalidConfig("lexical.table_title_marker must not be empty".into()));
        }
        if let Some(bad) = self.intents.iter().find(|i| i.query_terms.is_empty()) {
            return Err(Error::InvalidConfig(format!("intent {} has no query terms", bad.name)));
        }
        Ok(())
    }
}
