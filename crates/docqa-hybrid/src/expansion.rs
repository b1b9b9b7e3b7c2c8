//! Synonym expansion for regulation queries.
//!
//! Appends related terms to the query so both the embedding and the keyword
//! side see the wording used in the documents. E.g. "有給" adds "年休",
//! "年次有給休暇", "付与日数" and the grant-day values.

/// Trigger term and the related terms it pulls in, in append order.
pub type SynonymRule = (String, Vec<String>);

fn default_rules() -> Vec<SynonymRule> {
    let table: &[(&str, &[&str])] = &[
        ("休暇", &["休暇", "休業", "年休", "有給", "特別休暇", "付与日数", "勤続年数"]),
        ("休業", &["休暇", "休業", "欠勤"]),
        (
            "有給",
            &["有給", "年休", "休暇", "年次有給休暇", "付与日数", "勤続年数", "10日", "11日", "12日", "14日", "16日", "18日", "20日"],
        ),
        ("特別休暇", &["特別休暇", "慶弔", "結婚", "忌引", "付与日数", "3日", "2日", "1日"]),
        ("付与", &["付与", "日数", "付与日数", "勤続年数"]),
        ("付与日数", &["付与日数", "年次有給休暇", "勤続年数", "10日", "20日"]),
        ("勤務時間", &["勤務時間", "始業", "終業", "労働時間", "就業時間"]),
        ("始業", &["始業", "勤務時間", "出勤", "開始"]),
        ("終業", &["終業", "勤務時間", "退勤", "終了"]),
        ("給与", &["給与", "給料", "賃金", "報酬"]),
        ("手当", &["手当", "手当て", "支給"]),
        ("夜勤", &["夜勤", "夜間", "当直", "深夜"]),
        ("シフト", &["シフト", "勤務", "番", "交代"]),
        ("育児", &["育児", "育休", "子育て"]),
        ("介護", &["介護", "介休", "看護"]),
        ("出張", &["出張", "旅費", "交通費"]),
        ("届出", &["届出", "届け出", "申請", "手続き"]),
        ("亡くなった", &["死亡", "忌引", "忌引き", "慶弔", "慶弔休暇", "特別休暇", "葬儀"]),
        ("亡くなる", &["死亡", "忌引", "忌引き", "慶弔", "慶弔休暇", "特別休暇", "葬儀"]),
        ("死亡", &["死亡", "忌引", "忌引き", "慶弔", "慶弔休暇", "特別休暇", "葬儀"]),
        ("忌引", &["忌引", "忌引き", "死亡", "慶弔", "慶弔休暇", "特別休暇", "葬儀"]),
        ("忌引き", &["忌引", "忌引き", "死亡", "慶弔", "慶弔休暇", "特別休暇", "葬儀"]),
        ("葬儀", &["葬儀", "忌引", "忌引き", "死亡", "慶弔", "慶弔休暇"]),
        ("親", &["父母", "配偶者", "家族"]),
        ("父", &["父母", "親", "家族"]),
        ("母", &["父母", "親", "家族"]),
        ("結婚", &["結婚", "慶弔", "慶弔休暇", "特別休暇", "婚姻"]),
    ];
    table
        .iter()
        .map(|(trigger, related)| (trigger.to_string(), related.iter().map(|s| s.to_string()).collect()))
        .collect()
}

/// Spellings of department names as they appear in the extracted documents.
fn default_department_spellings() -> Vec<(String, String)> {
    [
        ("薬局", "薬　局"),
        ("検査科", "検 査 科"),
        ("事務部門", "事 務 部 門"),
        ("診療部", "診 療 部"),
        ("看護部門", "看 護 部 門"),
        ("放射線科", "放 射 線 科"),
        ("栄養科", "栄 養 科"),
    ]
    .iter()
    .map(|(a, b)| (a.to_string(), b.to_string()))
    .collect()
}

pub struct QueryExpander {
    rules: Vec<SynonymRule>,
    department_spellings: Vec<(String, String)>,
}

impl Default for QueryExpander {
    fn default() -> Self {
        Self { rules: default_rules(), department_spellings: default_department_spellings() }
    }
}

impl QueryExpander {
    pub fn new(rules: Vec<SynonymRule>) -> Self {
        Self { rules, department_spellings: default_department_spellings() }
    }

    /// Appends, space-separated, every related term not yet present in the
    /// growing string, for every trigger present in it. Repeats until no rule
    /// adds anything, so `expand(expand(q)) == expand(q)`.
    pub fn expand(&self, query: &str) -> String {
        let mut expanded = query.to_string();
        loop {
            let before = expanded.len();
            for (trigger, related) in &self.rules {
                if !expanded.contains(trigger.as_str()) {
                    continue;
                }
                for term in related {
                    if !expanded.contains(term.as_str()) {
                        expanded.push(' ');
                        expanded.push_str(term);
                    }
                }
            }
            if expanded.len() == before {
                return expanded;
            }
        }
    }

    /// Prefixes the query with the user's department, using the spelling
    /// found in the documents. An empty department leaves the query as is.
    pub fn scope_to_department(&self, department: &str, query: &str) -> String {
        let department = department.trim();
        if department.is_empty() {
            return query.to_string();
        }
        let spelled = self
            .department_spellings
            .iter()
            .find(|(name, _)| name == department)
            .map(|(_, spelling)| spelling.as_str())
            .unwrap_or(department);
        format!("{spelled} {query}")
    }
}
