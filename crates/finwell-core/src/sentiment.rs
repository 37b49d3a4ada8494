//! # Lexicon sentiment
//!
//! Rule-based polarity scoring for short market and news texts. Word valences are summed with
//! negation and intensifier handling, then squashed into `[-1, 1]` with the usual compound
//! normalization `x / sqrt(x^2 + alpha)`.

use std::collections::HashMap;

/// Normalization constant of the compound score.
const ALPHA: f64 = 15.0;
/// Scale applied to a valence that follows a negation.
const NEGATION_SCALAR: f64 = -0.74;
/// How many tokens a negation or intensifier stays active for.
const MODIFIER_WINDOW: usize = 3;

/// Detailed scoring output.
#[derive(Debug, Clone, PartialEq)]
pub struct LexiconResult {
    pub compound: f64,
    pub raw_sum: f64,
    pub matched_words: Vec<(String, f64)>,
}

/// Word-valence lexicon tuned for finance, crypto and consumer-insurance text.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    words: HashMap<String, f64>,
    negations: Vec<String>,
    intensifiers: HashMap<String, f64>,
}

impl Default for LexiconScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconScorer {
    pub fn new() -> Self {
        let positive = [
            ("bullish", 2.6),
            ("surge", 2.2),
            ("surged", 2.2),
            ("rally", 2.1),
            ("soar", 2.5),
            ("soared", 2.5),
            ("gain", 1.6),
            ("gains", 1.6),
            ("profit", 1.9),
            ("growth", 1.8),
            ("grow", 1.4),
            ("rise", 1.4),
            ("rising", 1.4),
            ("rose", 1.4),
            ("increase", 1.3),
            ("increased", 1.3),
            ("up", 0.9),
            ("higher", 1.1),
            ("improve", 1.6),
            ("improved", 1.6),
            ("outperform", 2.0),
            ("beat", 1.6),
            ("strong", 1.8),
            ("stable", 1.0),
            ("positive", 2.0),
            ("optimistic", 2.1),
            ("confident", 1.8),
            ("record", 1.2),
            ("upgrade", 1.9),
            ("buy", 1.0),
            ("breakout", 1.8),
            ("momentum", 1.0),
            ("recovery", 1.7),
            ("rebound", 1.6),
            ("adoption", 1.5),
            ("partnership", 1.4),
            ("active", 1.0),
            ("popular", 1.6),
            ("good", 1.9),
            ("great", 3.1),
            ("excellent", 3.2),
            ("reliable", 1.9),
            ("affordable", 1.6),
            ("trusted", 2.0),
            ("helpful", 1.8),
        ];

        let negative = [
            ("bearish", -2.6),
            ("crash", -2.9),
            ("crashed", -2.9),
            ("plunge", -2.6),
            ("plunged", -2.6),
            ("drop", -1.6),
            ("dropped", -1.6),
            ("fall", -1.4),
            ("fell", -1.4),
            ("falling", -1.4),
            ("decline", -1.7),
            ("declined", -1.7),
            ("decreased", -1.3),
            ("loss", -1.9),
            ("losses", -1.9),
            ("down", -0.9),
            ("lower", -1.0),
            ("weak", -1.8),
            ("negative", -2.0),
            ("pessimistic", -2.1),
            ("concern", -1.4),
            ("concerns", -1.4),
            ("worry", -1.8),
            ("fear", -2.2),
            ("risk", -1.1),
            ("volatile", -1.0),
            ("volatility", -0.8),
            ("uncertainty", -1.5),
            ("miss", -1.5),
            ("disappointing", -2.2),
            ("underperform", -1.9),
            ("downgrade", -1.9),
            ("sell", -1.0),
            ("dump", -2.0),
            ("crisis", -2.9),
            ("warning", -1.6),
            ("trouble", -1.9),
            ("problem", -1.7),
            ("fail", -2.3),
            ("failed", -2.3),
            ("scam", -3.0),
            ("fraud", -3.0),
            ("hack", -2.5),
            ("lawsuit", -2.1),
            ("denied", -1.9),
            ("expensive", -1.3),
            ("bad", -2.5),
            ("poor", -2.1),
            ("terrible", -3.1),
        ];

        let words = positive
            .into_iter()
            .chain(negative)
            .map(|(word, score)| (word.to_owned(), score))
            .collect();

        let negations = [
            "not", "no", "never", "neither", "nobody", "nothing", "none", "cannot", "cant",
            "don't", "dont", "doesn't", "doesnt", "didn't", "didnt", "won't", "wont", "isn't",
            "isnt", "aren't", "arent", "wasn't", "wasnt", "hardly", "barely", "without",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        let intensifiers = [
            ("very", 1.5),
            ("extremely", 2.0),
            ("highly", 1.5),
            ("significantly", 1.5),
            ("sharply", 1.6),
            ("dramatically", 1.8),
            ("massively", 1.8),
            ("slightly", 0.5),
            ("somewhat", 0.7),
            ("marginally", 0.5),
            ("relatively", 0.8),
        ]
        .into_iter()
        .map(|(word, scale)| (word.to_owned(), scale))
        .collect();

        Self {
            words,
            negations,
            intensifiers,
        }
    }

    /// Adds or replaces a word valence.
    pub fn with_word(mut self, word: &str, valence: f64) -> Self {
        self.words.insert(word.to_lowercase(), valence);
        self
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.words.get(word).copied()
    }

    /// Compound polarity in `[-1, 1]`, or `None` when the text is blank.
    pub fn score(&self, text: &str) -> Option<f64> {
        if text.trim().is_empty() {
            return None;
        }
        Some(self.analyze(text).compound)
    }

    pub fn analyze(&self, text: &str) -> LexiconResult {
        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
            .filter(|token| !token.is_empty());

        let mut raw_sum = 0.0;
        let mut matched_words = Vec::new();
        let mut negation_left = 0usize;
        let mut intensity = 1.0;
        let mut intensity_left = 0usize;

        for token in tokens {
            if self.negations.iter().any(|negation| negation == token) {
                negation_left = MODIFIER_WINDOW;
                continue;
            }

            if let Some(scale) = self.intensifiers.get(token) {
                intensity = *scale;
                intensity_left = MODIFIER_WINDOW;
                continue;
            }

            if let Some(mut valence) = self.valence(token) {
                if negation_left > 0 {
                    valence *= NEGATION_SCALAR;
                    negation_left = 0;
                }
                if intensity_left > 0 {
                    valence *= intensity;
                    intensity_left = 0;
                }

                raw_sum += valence;
                matched_words.push((token.to_owned(), valence));
                continue;
            }

            negation_left = negation_left.saturating_sub(1);
            intensity_left = intensity_left.saturating_sub(1);
        }

        LexiconResult {
            compound: normalize(raw_sum),
            raw_sum,
            matched_words,
        }
    }
}

fn normalize(sum: f64) -> f64 {
    if sum == 0.0 {
        return 0.0;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_has_no_score() {
        let scorer = LexiconScorer::new();
        assert_eq!(scorer.score(""), None);
        assert_eq!(scorer.score("   "), None);
    }

    #[test]
    fn text_without_lexicon_words_is_neutral() {
        assert_eq!(LexiconScorer::new().score("the quarterly call is on tuesday"), Some(0.0));
    }

    #[test]
    fn positive_and_negative_words_have_expected_sign() {
        let scorer = LexiconScorer::new();
        assert!(scorer.score("Bitcoin rally continues, bullish momentum").unwrap_or(0.0) > 0.15);
        assert!(scorer.score("Exchange hack triggers crash").unwrap_or(0.0) < -0.15);
    }

    #[test]
    fn negation_flips_polarity() {
        let scorer = LexiconScorer::new();
        let plain = scorer.analyze("outlook is good").compound;
        let negated = scorer.analyze("outlook is not good").compound;
        assert!(plain > 0.0);
        assert!(negated < 0.0);
    }

    #[test]
    fn intensifier_scales_valence() {
        let scorer = LexiconScorer::new();
        let plain = scorer.analyze("strong quarter").raw_sum;
        let boosted = scorer.analyze("very strong quarter").raw_sum;
        assert!((boosted - plain * 1.5).abs() < 1e-9);
    }

    #[test]
    fn compound_stays_within_unit_interval() {
        let text = "great ".repeat(200);
        let compound = LexiconScorer::new().analyze(&text).compound;
        assert!(compound <= 1.0 && compound > 0.99);
    }
}
