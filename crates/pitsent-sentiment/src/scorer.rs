//! Text sentiment scoring.
//!
//! The pipeline only needs `score(text) -> [-1, 1]`; [`SentimentScorer`] is
//! the seam and [`LexiconScorer`] the built-in implementation.

/// Pure text scorer. Implementations must return values in `[-1.0, 1.0]`.
pub trait SentimentScorer: Send + Sync {
    fn score(&self, text: &str) -> f64;
}

impl<F> SentimentScorer for F
where
    F: Fn(&str) -> f64 + Send + Sync,
{
    fn score(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Scorer backed by [`lexicon_score`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconScorer;

impl SentimentScorer for LexiconScorer {
    fn score(&self, text: &str) -> f64 {
        lexicon_score(text)
    }
}

/// Word weights tuned for retail-investor and gaming-community chatter.
///
/// Keys are lowercase single words. Positive weights are bullish or
/// favourable; negative weights bearish or unfavourable.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("great", 0.4),
    ("good", 0.3),
    ("excellent", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("love", 0.5),
    ("loved", 0.5),
    ("best", 0.5),
    ("fun", 0.3),
    ("masterpiece", 0.6),
    ("recommend", 0.4),
    ("hype", 0.3),
    ("hyped", 0.3),
    ("bullish", 0.6),
    ("beat", 0.4),
    ("beats", 0.4),
    ("growth", 0.3),
    ("profit", 0.4),
    ("record", 0.3),
    ("upgrade", 0.4),
    ("rally", 0.4),
    ("moon", 0.4),
    ("buy", 0.3),
    ("win", 0.4),
    // Negative signals
    ("bad", -0.4),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("worst", -0.6),
    ("boring", -0.3),
    ("broken", -0.5),
    ("buggy", -0.5),
    ("delay", -0.4),
    ("delayed", -0.4),
    ("cancelled", -0.5),
    ("refund", -0.4),
    ("layoffs", -0.6),
    ("lawsuit", -0.5),
    ("scam", -0.7),
    ("greedy", -0.5),
    ("microtransactions", -0.4),
    ("bearish", -0.6),
    ("miss", -0.4),
    ("missed", -0.4),
    ("downgrade", -0.5),
    ("crash", -0.5),
    ("dump", -0.4),
    ("sell", -0.3),
    ("loss", -0.4),
];

/// Score a text string using the lexicon.
///
/// Splits text into lowercase words, sums matching weights, and clamps the
/// result to `[-1.0, 1.0]`. Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}
