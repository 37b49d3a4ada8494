use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Symbol, ValidationError};

/// Coarse topic a query is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Stock,
    Crypto,
    Health,
    Insurance,
    Unknown,
}

impl Domain {
    pub const ALL: [Self; 5] = [
        Self::Stock,
        Self::Crypto,
        Self::Health,
        Self::Insurance,
        Self::Unknown,
    ];

    /// Default tie-break order when a query mentions keywords of several domains.
    pub const DEFAULT_PRIORITY: [Self; 4] = [Self::Stock, Self::Crypto, Self::Insurance, Self::Health];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Crypto => "crypto",
            Self::Health => "health",
            Self::Insurance => "insurance",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for Domain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(Self::Stock),
            "crypto" => Ok(Self::Crypto),
            "health" => Ok(Self::Health),
            "insurance" => Ok(Self::Insurance),
            "unknown" => Ok(Self::Unknown),
            other => Err(ValidationError::InvalidDomain {
                value: other.to_owned(),
            }),
        }
    }
}

/// Health sub-topic: medication questions and symptom reports are answered differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthTopic {
    Symptom,
    Medication,
}

impl HealthTopic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Symptom => "symptom",
            Self::Medication => "medication",
        }
    }
}

impl Display for HealthTopic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain-specific identifier pulled out of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Entity {
    /// Lower-case token symbol such as `btc`.
    Token { symbol: String },
    Ticker { symbol: Symbol },
    WalletAddress { address: String },
    /// Insurer registry key plus its display name.
    Provider { key: String, name: String },
    HealthTopic { topic: HealthTopic },
}

impl Entity {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Token { symbol } => symbol,
            Self::Ticker { symbol } => symbol.as_str(),
            Self::WalletAddress { address } => address,
            Self::Provider { key, .. } => key,
            Self::HealthTopic { topic } => topic.as_str(),
        }
    }

    /// Label used in response headers.
    pub fn display_name(&self) -> String {
        match self {
            Self::Token { symbol } => symbol.to_ascii_uppercase(),
            Self::Ticker { symbol } => symbol.to_string(),
            Self::WalletAddress { address } => format!("Wallet {address}"),
            Self::Provider { name, .. } => name.clone(),
            Self::HealthTopic { topic } => match topic {
                HealthTopic::Symptom => String::from("Symptom check"),
                HealthTopic::Medication => String::from("Medication"),
            },
        }
    }
}

/// Free-text input plus the optional identifier of whoever sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }
}

/// Outcome of routing a query: domain, optional entity and the evidence for the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub domain: Domain,
    pub entity: Option<Entity>,
    pub matched_keywords: BTreeSet<String>,
    /// Lower-cased, trimmed text the classification ran on.
    pub text: String,
}

impl ClassificationResult {
    pub fn unknown(text: impl Into<String>) -> Self {
        Self {
            domain: Domain::Unknown,
            entity: None,
            matched_keywords: BTreeSet::new(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_domain_case_insensitively() {
        assert_eq!(" Crypto ".parse::<Domain>().expect("must parse"), Domain::Crypto);
    }

    #[test]
    fn rejects_unknown_domain_name() {
        let err = "weather".parse::<Domain>().expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDomain { .. }));
    }

    #[test]
    fn entity_serializes_with_kind_tag() {
        let entity = Entity::Token {
            symbol: String::from("btc"),
        };
        let value = serde_json::to_value(&entity).expect("serializes");
        assert_eq!(value["kind"], "token");
        assert_eq!(value["symbol"], "btc");
    }
}
