/// Words that mark a sentence as likely factual.
const FACT_KEYWORDS: &[&str] = &[
    "is", "are", "was", "were", "has", "have", "will", "can", "shows", "indicates", "research",
    "study", "data", "statistics",
];

/// Minimum sentence length, in characters, for a fact.
const MIN_FACT_CHARS: usize = 20;

/// Picks up to `max_facts` fact-like sentences from `content`, in order.
///
/// Sentences are split on `". "`. A sentence qualifies when it is longer
/// than 20 characters and contains one of the keywords (case-insensitive
/// substring match).
pub fn extract_key_facts(content: &str, max_facts: usize) -> Vec<String> {
    let mut facts = Vec::new();
    for sentence in content.split(". ") {
        if facts.len() >= max_facts {
            break;
        }
        let sentence = sentence.trim();
        if sentence.chars().count() <= MIN_FACT_CHARS {
            continue;
        }
        let lower = sentence.to_lowercase();
        if FACT_KEYWORDS.iter().any(|k| lower.contains(k)) {
            facts.push(sentence.to_string());
        }
    }
    facts
}
