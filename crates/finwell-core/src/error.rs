use thiserror::Error;

/// Validation and contract errors exposed by `finwell-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid domain '{value}', expected one of stock, crypto, health, insurance, unknown")]
    InvalidDomain { value: String },
    #[error("invalid provider '{value}', expected one of coingecko, solana, alphavantage, asi, news")]
    InvalidProvider { value: String },
    #[error("invalid insurance kind '{value}'")]
    InvalidInsuranceKind { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("wallet address '{value}' is not a valid base58 account key")]
    InvalidWalletAddress { value: String },

    #[error("domain priority list cannot be empty")]
    EmptyDomainPriority,
    #[error("domain '{domain}' appears more than once in the priority list")]
    DuplicateDomainPriority { domain: String },
    #[error("domain '{domain}' cannot be part of the priority list")]
    UnroutableDomain { domain: String },
    #[error("domain '{domain}' has no keywords configured")]
    MissingKeywords { domain: String },
    #[error("{table} entry cannot have an empty '{field}'")]
    EmptyTableField {
        table: &'static str,
        field: &'static str,
    },
    #[error("max_sources must be at least 1")]
    InvalidSourceCap,
    #[error("insurance plan tiers must have ascending income limits and end with an open tier")]
    InvalidPlanTiers,

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("request_id must be at least 8 characters")]
    InvalidRequestId,
    #[error("trace_id must be 32 hex characters")]
    InvalidTraceId,
    #[error("schema_version must match vMAJOR.MINOR.PATCH: '{value}'")]
    InvalidSchemaVersion { value: String },

    #[error("error code cannot be empty")]
    EmptyErrorCode,
    #[error("error message cannot be empty")]
    EmptyErrorMessage,
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
