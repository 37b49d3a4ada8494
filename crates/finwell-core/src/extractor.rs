//! Maps free text to a [`Domain`] and, where the domain has one, an [`Entity`].
//!
//! Routing is plain substring matching of lower-cased text against the keyword sets of
//! [`PipelineConfig`], checked in priority order. Crypto also routes on any configured token
//! symbol, name or id appearing as a whole word. Entity extraction runs per domain and does
//! not depend on which keyword triggered the match.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{InsuranceKind, PipelineConfig};
use crate::{ClassificationResult, Domain, Entity, HealthTopic, Symbol};

static SHORT_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-z]{3,5}\b").expect("short word pattern is valid"));

static BASE58_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[1-9A-HJ-NP-Za-km-z]{32,44}\b").expect("base58 pattern is valid")
});

/// Decides whether a base58-looking token is a real account address.
pub trait AddressValidator: Send + Sync {
    fn is_valid(&self, candidate: &str) -> bool;
}

/// Structural check only: 32 to 44 characters of the bitcoin base58 alphabet.
#[derive(Debug, Default, Clone, Copy)]
pub struct Base58AddressValidator;

impl AddressValidator for Base58AddressValidator {
    fn is_valid(&self, candidate: &str) -> bool {
        (32..=44).contains(&candidate.len())
            && candidate
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() && !matches!(ch, '0' | 'O' | 'I' | 'l'))
    }
}

/// Insurance product families and policy terms mentioned in a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceFocus {
    pub kinds: Vec<InsuranceKind>,
    pub terms: Vec<String>,
}

impl InsuranceFocus {
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty() && self.terms.is_empty()
    }
}

/// Precompiled lookup for one known symbol (crypto token or stock ticker).
struct SymbolPattern {
    entity_key: String,
    words: Vec<Regex>,
    keys: Vec<String>,
    names: Vec<String>,
}

impl SymbolPattern {
    fn new(entity_key: String, keys: Vec<String>, names: Vec<String>) -> Option<Self> {
        let words = keys
            .iter()
            .map(|key| word_pattern(key.as_str()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            entity_key,
            words,
            keys,
            names,
        })
    }
}

/// Strategies run in order: exact symbol as a word, full name as a substring, then any
/// three-to-five letter word that happens to be a known symbol.
fn match_symbol<'a>(patterns: &'a [SymbolPattern], text: &str) -> Option<&'a SymbolPattern> {
    patterns
        .iter()
        .find(|pattern| pattern.words.iter().any(|word| word.is_match(text)))
        .or_else(|| {
            patterns.iter().find(|pattern| {
                pattern
                    .names
                    .iter()
                    .any(|name| !name.is_empty() && text.contains(name.as_str()))
            })
        })
        .or_else(|| {
            SHORT_WORD.find_iter(text).find_map(|word| {
                patterns
                    .iter()
                    .find(|pattern| pattern.keys.iter().any(|key| key == word.as_str()))
            })
        })
}

fn word_pattern(word: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(word))).ok()
}

struct KindPattern {
    kind: InsuranceKind,
    keywords: Vec<Regex>,
}

/// Query classifier over a shared, immutable [`PipelineConfig`].
pub struct IntentExtractor {
    config: Arc<PipelineConfig>,
    tokens: Vec<SymbolPattern>,
    token_words: Vec<(String, Regex)>,
    tickers: Vec<SymbolPattern>,
    insurance_kinds: Vec<KindPattern>,
    address_validator: Arc<dyn AddressValidator>,
}

impl IntentExtractor {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let tokens = config
            .tokens
            .iter()
            .filter_map(|token| {
                let symbol = token.symbol.to_lowercase();
                SymbolPattern::new(
                    symbol.clone(),
                    vec![symbol],
                    vec![token.name.to_lowercase(), token.id.to_lowercase()],
                )
            })
            .collect();

        let mut token_words = BTreeSet::new();
        for token in &config.tokens {
            for word in [&token.symbol, &token.name, &token.id] {
                let word = word.trim().to_lowercase();
                if !word.is_empty() {
                    token_words.insert(word);
                }
            }
        }
        let token_words = token_words
            .into_iter()
            .filter_map(|word| word_pattern(&word).map(|pattern| (word, pattern)))
            .collect();

        let tickers = config
            .tickers
            .iter()
            .filter_map(|entry| {
                let ticker = entry.ticker.to_lowercase();
                let mut keys = vec![ticker.clone()];
                if let Some((base, _)) = ticker.split_once('.') {
                    keys.push(base.to_owned());
                }
                let mut names = vec![entry.name.to_lowercase()];
                names.extend(entry.aliases.iter().map(|alias| alias.to_lowercase()));
                SymbolPattern::new(entry.ticker.to_ascii_uppercase(), keys, names)
            })
            .collect();

        let insurance_kinds = config
            .insurance_types
            .iter()
            .map(|entry| KindPattern {
                kind: entry.kind,
                keywords: entry
                    .keywords
                    .iter()
                    .filter_map(|keyword| word_pattern(&keyword.to_lowercase()))
                    .collect(),
            })
            .collect();

        Self {
            config,
            tokens,
            token_words,
            tickers,
            insurance_kinds,
            address_validator: Arc::new(Base58AddressValidator),
        }
    }

    pub fn with_address_validator(mut self, validator: Arc<dyn AddressValidator>) -> Self {
        self.address_validator = validator;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classify(&self, text: &str) -> ClassificationResult {
        let raw = text.trim();
        let normalized = raw.to_lowercase();
        if normalized.is_empty() {
            return ClassificationResult::unknown(normalized);
        }

        let (domain, matched_keywords) = self.detect_domain(&normalized);
        let entity = self.extract_entity(domain, raw, &normalized);

        debug!(
            domain = %domain,
            entity = ?entity.as_ref().map(Entity::as_str),
            keywords = matched_keywords.len(),
            "classified query"
        );

        ClassificationResult {
            domain,
            entity,
            matched_keywords,
            text: normalized,
        }
    }

    /// First domain in priority order with at least one keyword in `normalized`.
    pub fn detect_domain(&self, normalized: &str) -> (Domain, BTreeSet<String>) {
        for domain in &self.config.domain_priority {
            let mut matched = self
                .config
                .keywords
                .for_domain(*domain)
                .iter()
                .filter(|keyword| normalized.contains(keyword.to_lowercase().as_str()))
                .cloned()
                .collect::<BTreeSet<_>>();
            if *domain == Domain::Crypto {
                matched.extend(
                    self.token_words
                        .iter()
                        .filter(|(_, pattern)| pattern.is_match(normalized))
                        .map(|(word, _)| word.clone()),
                );
            }

            if !matched.is_empty() {
                return (*domain, matched);
            }
        }

        (Domain::Unknown, BTreeSet::new())
    }

    /// `raw` keeps the original casing, which base58 wallet addresses need.
    pub fn extract_entity(&self, domain: Domain, raw: &str, normalized: &str) -> Option<Entity> {
        match domain {
            Domain::Crypto => self
                .extract_token(normalized)
                .map(|symbol| Entity::Token { symbol })
                .or_else(|| {
                    self.extract_address(raw)
                        .map(|address| Entity::WalletAddress { address })
                }),
            Domain::Stock => self
                .extract_ticker(normalized)
                .map(|symbol| Entity::Ticker { symbol }),
            Domain::Insurance => self.extract_insurer(normalized),
            Domain::Health => Some(Entity::HealthTopic {
                topic: self.health_topic(normalized),
            }),
            Domain::Unknown => None,
        }
    }

    pub fn extract_token(&self, normalized: &str) -> Option<String> {
        match_symbol(&self.tokens, normalized).map(|pattern| pattern.entity_key.clone())
    }

    pub fn extract_ticker(&self, normalized: &str) -> Option<Symbol> {
        match_symbol(&self.tickers, normalized)
            .and_then(|pattern| Symbol::parse(&pattern.entity_key).ok())
    }

    pub fn extract_address(&self, raw: &str) -> Option<String> {
        BASE58_CANDIDATE
            .find_iter(raw)
            .map(|candidate| candidate.as_str())
            .find(|candidate| self.address_validator.is_valid(candidate))
            .map(str::to_owned)
    }

    /// First registry entry whose key, display name or a distinctive name word appears.
    pub fn extract_insurer(&self, normalized: &str) -> Option<Entity> {
        self.config
            .insurers
            .iter()
            .find(|insurer| {
                let name = insurer.name.to_lowercase();
                normalized.contains(insurer.key.as_str())
                    || normalized.contains(name.as_str())
                    || name.split_whitespace().any(|word| {
                        word.len() >= 3
                            && !self.config.generic_name_words.iter().any(|g| g == word)
                            && normalized.contains(word)
                    })
            })
            .map(|insurer| Entity::Provider {
                key: insurer.key.clone(),
                name: insurer.name.clone(),
            })
    }

    pub fn health_topic(&self, normalized: &str) -> HealthTopic {
        let medication = self
            .config
            .medication_keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()));

        if medication {
            HealthTopic::Medication
        } else {
            HealthTopic::Symptom
        }
    }

    pub fn insurance_focus(&self, normalized: &str) -> InsuranceFocus {
        let kinds = self
            .insurance_kinds
            .iter()
            .filter(|pattern| pattern.keywords.iter().any(|re| re.is_match(normalized)))
            .map(|pattern| pattern.kind)
            .collect();

        let terms = self
            .config
            .insurance_terms
            .iter()
            .filter(|term| normalized.contains(term.as_str()))
            .cloned()
            .collect();

        InsuranceFocus { kinds, terms }
    }
}
