//! Keyword-based topic classification.
//!
//! Pure and offline: the same title and body always produce the same labels.
//! Labels come from a closed taxonomy; only some labels have keyword lists,
//! the rest are never assigned automatically.

use once_cell::sync::Lazy;
use regex::Regex;

/// The closed set of topic labels, in tie-break order.
pub const TAXONOMY: [&str; 20] = [
    "Arts, culture and sport",
    "Building and planning",
    "Business, economy and innovation",
    "Children and families",
    "Communities and regeneration",
    "Coronavirus (COVID-19)",
    "Digital",
    "Education and skills",
    "Employment and work",
    "Environment and climate change",
    "Equality and human rights",
    "Farming and countryside",
    "Health and social care",
    "Housing",
    "International and EU",
    "Justice and law",
    "Marine and fisheries",
    "Public sector",
    "Transport",
    "Welsh language",
];

const KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Health and social care",
        &["nhs", "health", "care", "hospital", "dental", "cancer", "mental health"],
    ),
    (
        "Education and skills",
        &["school", "education", "learner", "curriculum", "inset", "teacher", "university"],
    ),
    (
        "Transport",
        &["transport", "rail", "bus", "road", "traffic", "20mph", "active travel"],
    ),
    (
        "Environment and climate change",
        &["climate", "flood", "carbon", "emissions", "energy", "net zero", "environment"],
    ),
    (
        "Business, economy and innovation",
        &["economy", "business", "investment", "innovation", "trade", "growth"],
    ),
    (
        "Housing",
        &["housing", "rent", "landlord", "homeless", "property"],
    ),
    (
        "Justice and law",
        &["law", "legal", "justice", "tribunal", "statutory", "legislation", "order"],
    ),
    (
        "Public sector",
        &["public", "government", "local authority", "council", "procurement"],
    ),
    (
        "Children and families",
        &["child", "children", "family", "safeguarding", "looked after"],
    ),
    ("Coronavirus (COVID-19)", &["covid", "coronavirus", "pandemic"]),
    ("Welsh language", &["welsh language", "cymraeg", "welsh-speaking"]),
    ("Digital", &["digital", "data", "online", "ai", "technology"]),
    (
        "Employment and work",
        &["employment", "work", "jobs", "labour market", "wages"],
    ),
];

/// Compiled word-boundary patterns per labelled topic, in taxonomy order.
static MATCHERS: Lazy<Vec<(&'static str, Vec<Regex>)>> = Lazy::new(|| {
    TAXONOMY
        .iter()
        .filter_map(|label| {
            KEYWORDS
                .iter()
                .find(|(topic, _)| topic == label)
                .map(|(topic, words)| {
                    let patterns = words
                        .iter()
                        .map(|w| {
                            Regex::new(&format!(r"\b{}\b", regex::escape(w)))
                                .expect("valid keyword pattern")
                        })
                        .collect();
                    (*topic, patterns)
                })
        })
        .collect()
});

/// Score every keyword-backed topic against `text` (already lower-cased).
///
/// Each non-overlapping word-boundary match of each keyword adds one.
/// Results are in taxonomy order, zero scores included.
pub fn score_topics(text: &str) -> Vec<(&'static str, usize)> {
    MATCHERS
        .iter()
        .map(|(topic, patterns)| {
            let score = patterns.iter().map(|re| re.find_iter(text).count()).sum();
            (*topic, score)
        })
        .collect()
}

/// Up to `max_topics` labels for an article, highest score first.
///
/// Ties keep taxonomy order. Topics that scored zero are never returned.
pub fn guess_topics(title: &str, body: &str, max_topics: usize) -> Vec<&'static str> {
    let text = format!("{} {}", title, body).to_lowercase();
    let mut scored = score_topics(&text);
    // Stable: equal scores stay in taxonomy order.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
        .into_iter()
        .filter(|(_, score)| *score > 0)
        .take(max_topics)
        .map(|(topic, _)| topic)
        .collect()
}
