//! 兜底内容：按词重叠度匹配预置条目，匹配不上时合成一条通用结果

use crate::search::SearchHit;

/// 词重叠度超过该值才使用预置条目
const MATCH_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Default)]
pub struct FallbackCatalog {
    entries: Vec<(String, Vec<SearchHit>)>,
}

fn words(text: &str) -> std::collections::HashSet<String> {
    text.split_whitespace().map(|w| w.to_lowercase()).collect()
}

/// |A ∩ B| / max(|A|, |B|)
fn overlap(a: &str, b: &str) -> f64 {
    let (wa, wb) = (words(a), words(b));
    let denom = wa.len().max(wb.len());
    if denom == 0 {
        return 0.0;
    }
    wa.intersection(&wb).count() as f64 / denom as f64
}

impl FallbackCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, question: impl Into<String>, hits: Vec<SearchHit>) -> Self {
        self.entries.push((question.into(), hits));
        self
    }

    pub fn lookup(&self, query: &str) -> Vec<SearchHit> {
        let best = self
            .entries
            .iter()
            .map(|(q, hits)| (overlap(query, q), hits))
            .filter(|(score, _)| *score > MATCH_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0));

        if let Some((score, hits)) = best {
            tracing::debug!(query, score, "fallback catalog match");
            return hits.clone();
        }

        vec![SearchHit::new(
            format!("Information about {}", query),
            "https://example.com/research",
            format!(
                "Live search was unavailable, so specific sources could not be retrieved. \
                 This question concerns {}.",
                query
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_picks_best_entry() {
        let catalog = FallbackCatalog::new()
            .with_entry(
                "What is AI?",
                vec![SearchHit::new("AI overview", "https://a", "AI is ...")],
            )
            .with_entry(
                "What are the main challenges in AI?",
                vec![SearchHit::new("AI challenges", "https://b", "Bias ...")],
            );

        let hits = catalog.lookup("What are the challenges in AI?");
        assert_eq!(hits[0].title, "AI challenges");
    }

    #[test]
    fn test_generic_hit_when_nothing_matches() {
        let catalog = FallbackCatalog::new()
            .with_entry("What is AI?", vec![SearchHit::new("AI", "https://a", "...")]);
        let hits = catalog.lookup("deep sea volcanic vents");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].title.contains("deep sea volcanic vents"));
    }
}
