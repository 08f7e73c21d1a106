//! Category hints mapped onto paper section names

const CATEGORY_SYNONYMS: &[(&str, &[&str])] = &[
    (
        "results",
        &[
            "result", "outcome", "product", "finding", "conclusion", "output", "effect",
            "consequence", "impact", "repercussion",
        ],
    ),
    (
        "method",
        &[
            "method", "material", "approach", "technique", "how to", "procedure", "process",
            "way to", "mean",
        ],
    ),
    (
        "data",
        &[
            "data", "information", "fact", "graph", "statistic", "detail", "evidence", "record",
            "figure", "table", "chart", "dataset", "measurement", "observation", "sample",
            "survey",
        ],
    ),
    (
        "analysis",
        &[
            "analyze", "study", "examine", "evaluate", "investigate", "scrutinize", "review",
            "assess", "interpret", "breakdown", "inspect", "explore", "diagnose",
        ],
    ),
];

/// Canonical category for a hint, if it names one or one of its synonyms
pub fn normalize_category(hint: &str) -> Option<&'static str> {
    let hint = hint.trim().to_lowercase();
    CATEGORY_SYNONYMS
        .iter()
        .find(|(canonical, synonyms)| *canonical == hint || synonyms.contains(&hint.as_str()))
        .map(|(canonical, _)| *canonical)
}

/// Section to look up for a hint; unknown hints are used as given
pub fn section_for(hint: &str) -> String {
    match normalize_category(hint) {
        Some(canonical) => canonical.to_string(),
        None => hint.trim().to_string(),
    }
}

/// Label shown before the category excerpt, e.g. `Method`
pub fn label_for(section: &str) -> String {
    let mut chars = section.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
