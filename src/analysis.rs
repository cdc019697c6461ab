//! Text analysis over record contents.
//!
//! The ledger never depends on a concrete analyzer; callers hand one in.
//! [`WordFrequencyAnalyzer`] is a stand-in: real word counts, placeholder
//! sentiment.

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum number of frequent words reported.
pub const TOP_WORDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Most frequent tokens, most frequent first, at most [`TOP_WORDS`]
    pub common_words: Vec<String>,
    /// Always within [-1.0, 1.0]
    pub sentiment: f64,
}

pub trait Analyzer: Send + Sync {
    fn analyze(&self, texts: &[String]) -> Analysis;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct WordFrequencyAnalyzer;

impl WordFrequencyAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for WordFrequencyAnalyzer {
    fn analyze(&self, texts: &[String]) -> Analysis {
        Analysis {
            common_words: top_words(texts, TOP_WORDS),
            sentiment: placeholder_sentiment(),
        }
    }
}

/// Lowercased whitespace tokens ranked by count. Ties keep first-seen order.
pub fn top_words(texts: &[String], limit: usize) -> Vec<String> {
    // word -> (count, first position)
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    let mut seen = 0;

    for text in texts {
        for word in text.to_lowercase().split_whitespace() {
            let entry = counts.entry(word.to_string()).or_insert((0, seen));
            entry.0 += 1;
            seen += 1;
        }
    }

    let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(limit).map(|(word, _)| word).collect()
}

fn placeholder_sentiment() -> f64 {
    let score: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
    score.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_repeated_token_is_reported() {
        let input = texts(&[
            "I love blockchain technology",
            "Blockchain is the future of finance",
            "I dream of a decentralized world",
        ]);
        let analysis = WordFrequencyAnalyzer::new().analyze(&input);

        assert!(analysis.common_words.contains(&"blockchain".to_string()));
        assert!(analysis.common_words.len() <= TOP_WORDS);
        assert!((-1.0..=1.0).contains(&analysis.sentiment));
    }

    #[test]
    fn test_ranking_and_ties() {
        let input = texts(&["b a c a", "c a"]);
        // a:3, c:2, b:1
        assert_eq!(top_words(&input, 5), vec!["a", "c", "b"]);

        let tied = texts(&["zeta alpha", "beta"]);
        assert_eq!(top_words(&tied, 2), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_empty_input() {
        let analysis = WordFrequencyAnalyzer::new().analyze(&[]);
        assert!(analysis.common_words.is_empty());
        assert!((-1.0..=1.0).contains(&analysis.sentiment));
    }

    #[test]
    fn test_sentiment_stays_in_range() {
        let analyzer = WordFrequencyAnalyzer::new();
        let input = texts(&["x"]);
        for _ in 0..1000 {
            let s = analyzer.analyze(&input).sentiment;
            assert!((-1.0..=1.0).contains(&s), "sentiment out of range: {}", s);
        }
    }
}
