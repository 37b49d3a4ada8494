//! Lookup tables and provider settings.
//!
//! [`PipelineConfig`] carries every static table the extractor and formatter consult. The
//! defaults reproduce the built-in tables; a JSON or YAML file may override any subset of
//! fields. [`ProviderSettings`] holds endpoints and API keys and is read from the environment.

use std::collections::BTreeSet;
use std::fmt::{Debug, Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CoreError, Domain, Symbol, ValidationError};

/// Insurance product families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsuranceKind {
    Health,
    Life,
    Disability,
    LongTermCare,
    Dental,
    Vision,
    Supplemental,
}

impl InsuranceKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Life => "life",
            Self::Disability => "disability",
            Self::LongTermCare => "long_term_care",
            Self::Dental => "dental",
            Self::Vision => "vision",
            Self::Supplemental => "supplemental",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Health => "Health",
            Self::Life => "Life",
            Self::Disability => "Disability",
            Self::LongTermCare => "Long-term care",
            Self::Dental => "Dental",
            Self::Vision => "Vision",
            Self::Supplemental => "Supplemental",
        }
    }
}

impl Display for InsuranceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsuranceKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "health" => Ok(Self::Health),
            "life" => Ok(Self::Life),
            "disability" => Ok(Self::Disability),
            "long_term_care" | "ltc" => Ok(Self::LongTermCare),
            "dental" => Ok(Self::Dental),
            "vision" => Ok(Self::Vision),
            "supplemental" => Ok(Self::Supplemental),
            other => Err(ValidationError::InvalidInsuranceKind {
                value: other.to_owned(),
            }),
        }
    }
}

/// Crypto token: ticker-like symbol, CoinGecko id and the common name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    pub symbol: String,
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    pub ticker: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsurerEntry {
    pub key: String,
    pub name: String,
    pub kind: InsuranceKind,
    pub website: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceTypeEntry {
    pub kind: InsuranceKind,
    pub keywords: Vec<String>,
}

/// Monthly income bracket and the plans suggested for it. `max_income: None` closes the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTier {
    pub label: String,
    #[serde(default)]
    pub max_income: Option<f64>,
    pub plans: Vec<String>,
}

/// Per-domain keyword sets used for substring routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainKeywords {
    pub stock: Vec<String>,
    pub crypto: Vec<String>,
    pub insurance: Vec<String>,
    pub health: Vec<String>,
}

impl DomainKeywords {
    pub fn for_domain(&self, domain: Domain) -> &[String] {
        match domain {
            Domain::Stock => &self.stock,
            Domain::Crypto => &self.crypto,
            Domain::Insurance => &self.insurance,
            Domain::Health => &self.health,
            Domain::Unknown => &[],
        }
    }
}

impl Default for DomainKeywords {
    fn default() -> Self {
        Self {
            stock: strings(&[
                "stock", "share", "market", "equity", "ticker", "nasdaq", "nyse", "dividend",
            ]),
            // "coin" is left out on purpose: it is a substring of "coinsurance".
            crypto: strings(&[
                "crypto", "bitcoin", "ethereum", "solana", "token", "wallet", "blockchain",
                "altcoin", "defi", "lamports",
            ]),
            insurance: strings(&[
                "insurance", "insurer", "premium", "deductible", "copay", "coinsurance",
                "coverage",
            ]),
            health: strings(&[
                "health", "symptom", "medication", "medicine", "pill", "dose", "tablet",
                "reminder", "pain", "fever", "cough", "headache", "doctor", "sick", "nausea",
                "emergency",
            ]),
        }
    }
}

/// Static tables consulted by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub domain_priority: Vec<Domain>,
    pub keywords: DomainKeywords,
    pub tokens: Vec<TokenEntry>,
    pub tickers: Vec<TickerEntry>,
    pub insurers: Vec<InsurerEntry>,
    /// Insurer name words too generic to identify a company on their own.
    pub generic_name_words: Vec<String>,
    pub insurance_types: Vec<InsuranceTypeEntry>,
    pub insurance_terms: Vec<String>,
    pub medication_keywords: Vec<String>,
    pub serious_keywords: Vec<String>,
    pub max_sources: usize,
    pub plan_tiers: Vec<PlanTier>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            domain_priority: Domain::DEFAULT_PRIORITY.to_vec(),
            keywords: DomainKeywords::default(),
            tokens: default_tokens(),
            tickers: default_tickers(),
            insurers: default_insurers(),
            generic_name_words: strings(&[
                "new", "york", "life", "blue", "cross", "shield", "mutual", "financial",
                "health", "healthcare", "national",
            ]),
            insurance_types: vec![
                insurance_type(
                    InsuranceKind::Health,
                    &["medical", "health", "healthcare", "hmo", "ppo", "epo"],
                ),
                insurance_type(
                    InsuranceKind::Life,
                    &["life", "term", "whole", "universal", "variable"],
                ),
                insurance_type(InsuranceKind::Disability, &["disability", "income", "di"]),
                insurance_type(
                    InsuranceKind::LongTermCare,
                    &["ltc", "long term care", "nursing"],
                ),
                insurance_type(InsuranceKind::Dental, &["dental", "orthodontic"]),
                insurance_type(InsuranceKind::Vision, &["vision", "eye", "optical"]),
            ],
            insurance_terms: strings(&[
                "premium",
                "deductible",
                "copay",
                "coinsurance",
                "out-of-pocket",
                "network",
                "coverage",
                "benefits",
                "claim",
                "policy",
                "renewal",
                "exclusion",
                "rider",
                "beneficiary",
                "death benefit",
                "cash value",
            ]),
            medication_keywords: strings(&["medication", "pill", "reminder", "dose", "tablet"]),
            serious_keywords: strings(&[
                "chest pain",
                "emergency",
                "critical",
                "shortness of breath",
                "life-threatening",
                "serious",
                "this condition may be serious",
            ]),
            max_sources: 5,
            plan_tiers: vec![
                PlanTier {
                    label: String::from("basic"),
                    max_income: Some(20_000.0),
                    plans: strings(&[
                        "Star Health Medi-Classic",
                        "Care Health Joy Plan",
                        "HDFC ERGO Health Suraksha",
                    ]),
                },
                PlanTier {
                    label: String::from("standard"),
                    max_income: Some(50_000.0),
                    plans: strings(&[
                        "Niva Bupa ReAssure",
                        "ICICI Lombard iHealth",
                        "Tata AIG Medicare",
                    ]),
                },
                PlanTier {
                    label: String::from("premium"),
                    max_income: None,
                    plans: strings(&[
                        "Max Bupa Health Companion",
                        "HDFC ERGO Optima Restore",
                        "Religare Care Supreme",
                    ]),
                },
            ],
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(input: &str) -> Result<Self, CoreError> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, picking YAML for `.yaml`/`.yml` and JSON otherwise.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let contents = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&contents),
            _ => Self::from_json_str(&contents),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.domain_priority.is_empty() {
            return Err(ValidationError::EmptyDomainPriority);
        }

        let mut seen = BTreeSet::new();
        for domain in &self.domain_priority {
            if *domain == Domain::Unknown {
                return Err(ValidationError::UnroutableDomain {
                    domain: domain.to_string(),
                });
            }
            if !seen.insert(*domain) {
                return Err(ValidationError::DuplicateDomainPriority {
                    domain: domain.to_string(),
                });
            }
            if self.keywords.for_domain(*domain).is_empty() {
                return Err(ValidationError::MissingKeywords {
                    domain: domain.to_string(),
                });
            }
        }

        if self.max_sources == 0 {
            return Err(ValidationError::InvalidSourceCap);
        }

        for token in &self.tokens {
            require_field("tokens", "symbol", &token.symbol)?;
            require_field("tokens", "id", &token.id)?;
        }

        for ticker in &self.tickers {
            Symbol::parse(&ticker.ticker)?;
            require_field("tickers", "name", &ticker.name)?;
        }

        for insurer in &self.insurers {
            require_field("insurers", "key", &insurer.key)?;
            require_field("insurers", "name", &insurer.name)?;
        }

        self.validate_plan_tiers()
    }

    fn validate_plan_tiers(&self) -> Result<(), ValidationError> {
        let Some((last, bounded)) = self.plan_tiers.split_last() else {
            return Err(ValidationError::InvalidPlanTiers);
        };
        if last.max_income.is_some() {
            return Err(ValidationError::InvalidPlanTiers);
        }

        let mut previous = f64::NEG_INFINITY;
        for tier in bounded {
            match tier.max_income {
                Some(limit) if limit.is_finite() && limit > previous => previous = limit,
                _ => return Err(ValidationError::InvalidPlanTiers),
            }
        }

        Ok(())
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Option<&TokenEntry> {
        self.tokens
            .iter()
            .find(|token| token.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn ticker(&self, ticker: &str) -> Option<&TickerEntry> {
        self.tickers
            .iter()
            .find(|entry| entry.ticker.eq_ignore_ascii_case(ticker))
    }

    pub fn insurer(&self, key: &str) -> Option<&InsurerEntry> {
        self.insurers.iter().find(|insurer| insurer.key == key)
    }

    pub fn insurers_of_kind(&self, kind: InsuranceKind) -> impl Iterator<Item = &InsurerEntry> {
        self.insurers
            .iter()
            .filter(move |insurer| insurer.kind == kind)
    }

    /// Company name for a ticker; unknown tickers fall back to the part before the exchange suffix.
    pub fn company_name(&self, symbol: &Symbol) -> String {
        self.ticker(symbol.as_str())
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| symbol.base().to_owned())
    }

    pub fn plan_tier(&self, monthly_income: f64) -> Option<&PlanTier> {
        if !monthly_income.is_finite() || monthly_income < 0.0 {
            return None;
        }

        self.plan_tiers.iter().find(|tier| match tier.max_income {
            Some(limit) => monthly_income < limit,
            None => true,
        })
    }
}

fn require_field(
    table: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyTableField { table, field });
    }
    Ok(())
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn insurance_type(kind: InsuranceKind, keywords: &[&str]) -> InsuranceTypeEntry {
    InsuranceTypeEntry {
        kind,
        keywords: strings(keywords),
    }
}

fn default_tokens() -> Vec<TokenEntry> {
    [
        ("btc", "bitcoin", "bitcoin"),
        ("eth", "ethereum", "ethereum"),
        ("sol", "solana", "solana"),
        ("link", "chainlink", "chainlink"),
        ("dot", "polkadot", "polkadot"),
        ("ada", "cardano", "cardano"),
        ("avax", "avalanche-2", "avalanche"),
        ("matic", "matic-network", "polygon"),
        ("doge", "dogecoin", "dogecoin"),
        ("shib", "shiba-inu", "shiba inu"),
        ("xrp", "ripple", "ripple"),
        ("bnb", "binancecoin", "binance coin"),
        ("uni", "uniswap", "uniswap"),
        ("atom", "cosmos", "cosmos"),
    ]
    .into_iter()
    .map(|(symbol, id, name)| TokenEntry {
        symbol: symbol.to_owned(),
        id: id.to_owned(),
        name: name.to_owned(),
    })
    .collect()
}

fn default_tickers() -> Vec<TickerEntry> {
    [
        ("SUNPHARMA.NS", "Sun Pharma", &[][..]),
        ("ICICIBANK.NS", "ICICI Bank", &[][..]),
        ("HDFCBANK.NS", "HDFC Bank", &[][..]),
        ("RELIANCE.NS", "Reliance Industries", &["reliance"][..]),
        ("TCS.NS", "Tata Consultancy Services", &["tata consultancy"][..]),
        ("AAPL", "Apple", &[][..]),
        ("MSFT", "Microsoft", &[][..]),
        ("GOOG", "Google", &["alphabet"][..]),
        ("AMZN", "Amazon", &[][..]),
        ("META", "Meta Platforms", &["facebook"][..]),
        ("HAL.NS", "Hindustan Aeronautics", &[][..]),
        ("VEDL.NS", "Vedanta Ltd", &["vedanta"][..]),
    ]
    .into_iter()
    .map(|(ticker, name, aliases)| TickerEntry {
        ticker: ticker.to_owned(),
        name: name.to_owned(),
        aliases: strings(aliases),
    })
    .collect()
}

fn default_insurers() -> Vec<InsurerEntry> {
    use InsuranceKind::{Health, Life, Supplemental};

    [
        ("aetna", "Aetna", Health, "aetna.com", Some("CVS")),
        ("anthem", "Anthem", Health, "anthem.com", Some("ANTM")),
        ("cigna", "Cigna", Health, "cigna.com", Some("CI")),
        ("humana", "Humana", Health, "humana.com", Some("HUM")),
        ("kaiser", "Kaiser Permanente", Health, "kp.org", None),
        ("united", "UnitedHealthcare", Health, "uhc.com", Some("UNH")),
        ("bcbs", "Blue Cross Blue Shield", Health, "bcbs.com", None),
        ("metlife", "MetLife", Life, "metlife.com", Some("MET")),
        ("prudential", "Prudential", Life, "prudential.com", Some("PRU")),
        ("newyorklife", "New York Life", Life, "newyorklife.com", None),
        ("northwestern", "Northwestern Mutual", Life, "northwesternmutual.com", None),
        ("massmutual", "MassMutual", Life, "massmutual.com", None),
        ("lincoln", "Lincoln Financial", Life, "lfg.com", Some("LNC")),
        ("transamerica", "Transamerica", Life, "transamerica.com", None),
        ("aflac", "Aflac", Supplemental, "aflac.com", Some("AFL")),
    ]
    .into_iter()
    .map(|(key, name, kind, website, ticker)| InsurerEntry {
        key: key.to_owned(),
        name: name.to_owned(),
        kind,
        website: website.to_owned(),
        ticker: ticker.map(str::to_owned),
    })
    .collect()
}

/// Endpoints, credentials and timeouts for the external data providers.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderSettings {
    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub solana_rpc_url: String,
    pub alphavantage_base_url: String,
    pub alphavantage_api_key: String,
    pub llm_url: String,
    pub llm_model: String,
    pub llm_api_key: Option<String>,
    /// URL template with `{symbol}` and `{id}` placeholders.
    pub news_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            coingecko_base_url: String::from("https://api.coingecko.com/api/v3"),
            coingecko_api_key: None,
            solana_rpc_url: String::from("https://api.mainnet-beta.solana.com"),
            alphavantage_base_url: String::from("https://www.alphavantage.co/query"),
            alphavantage_api_key: String::from("demo"),
            llm_url: String::from("https://api.asi1.ai/v1/chat/completions"),
            llm_model: String::from("asi1-mini"),
            llm_api_key: None,
            news_url: None,
            timeout_ms: 10_000,
        }
    }
}

impl ProviderSettings {
    pub const COINGECKO_API_KEY: &'static str = "FINWELL_COINGECKO_API_KEY";
    pub const ASI_API_KEY: &'static str = "FINWELL_ASI_API_KEY";
    pub const ALPHAVANTAGE_API_KEY: &'static str = "FINWELL_ALPHAVANTAGE_API_KEY";
    pub const SOLANA_RPC_URL: &'static str = "FINWELL_SOLANA_RPC_URL";
    pub const NEWS_URL: &'static str = "FINWELL_NEWS_URL";
    pub const TIMEOUT_MS: &'static str = "FINWELL_TIMEOUT_MS";

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds settings from an arbitrary variable lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            coingecko_api_key: read(Self::COINGECKO_API_KEY),
            llm_api_key: read(Self::ASI_API_KEY),
            alphavantage_api_key: read(Self::ALPHAVANTAGE_API_KEY)
                .unwrap_or(defaults.alphavantage_api_key),
            solana_rpc_url: read(Self::SOLANA_RPC_URL).unwrap_or(defaults.solana_rpc_url),
            news_url: read(Self::NEWS_URL),
            timeout_ms: read(Self::TIMEOUT_MS)
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.timeout_ms),
            ..defaults
        }
    }
}

impl Debug for ProviderSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("coingecko_base_url", &self.coingecko_base_url)
            .field(
                "coingecko_api_key",
                &self.coingecko_api_key.as_deref().map(mask_secret),
            )
            .field("solana_rpc_url", &self.solana_rpc_url)
            .field("alphavantage_base_url", &self.alphavantage_base_url)
            .field(
                "alphavantage_api_key",
                &mask_secret(&self.alphavantage_api_key),
            )
            .field("llm_url", &self.llm_url)
            .field("llm_model", &self.llm_model)
            .field("llm_api_key", &self.llm_api_key.as_deref().map(mask_secret))
            .field("news_url", &self.news_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Masks a secret for logs: first and last four characters survive on long values.
pub fn mask_secret(secret: &str) -> String {
    let chars = secret.chars().collect::<Vec<_>>();
    if chars.len() <= 8 {
        return String::from("****");
    }

    let head = chars[..4].iter().collect::<String>();
    let tail = chars[chars.len() - 4..].iter().collect::<String>();
    format!("{head}****{tail}")
}
