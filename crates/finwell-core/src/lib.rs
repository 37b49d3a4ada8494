//! # Finwell Core
//!
//! Query classification, sentiment aggregation and response formatting for the finwell
//! assistant, plus the thin provider adapters that feed it.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`aggregator`] | Mean-polarity aggregation over metric samples |
//! | [`config`] | Lookup tables and provider settings |
//! | [`dispatch`] | Extractor, handler table, aggregator and formatter wired together |
//! | [`domain`] | Domain types (Query, ClassificationResult, MetricSample, AggregateResult) |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`extractor`] | Domain and entity extraction from free text |
//! | [`formatter`] | Chat-style response rendering |
//! | [`handlers`] | Per-domain data collection |
//! | [`http_client`] | HTTP client abstraction |
//! | [`message`] | Chat transport payloads |
//! | [`metrics`] | Trend, market-cap and volume buckets |
//! | [`numfmt`] | Total number formatting helpers |
//! | [`providers`] | CoinGecko, Solana RPC, Alpha Vantage, news and LLM adapters |
//! | [`retry`] | Retry with backoff for provider calls |
//! | [`sentiment`] | Lexicon polarity scorer |
//!
//! ## Architecture
//!
//! ```text
//! text ──▶ IntentExtractor ──▶ (Domain, Entity)
//!                                  │
//!                                  ▼
//!                        DomainHandler (per domain) ──▶ providers ──▶ HttpClient
//!                                  │
//!                   facts + samples│
//!                                  ▼
//!                        MetricAggregator ──▶ ResponseFormatter ──▶ FormattedResponse
//! ```
//!
//! The extractor, aggregator and formatter are synchronous and hold only immutable
//! configuration, so they can be shared freely behind an `Arc`. Only the providers suspend.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use finwell_core::{Domain, IntentExtractor, PipelineConfig};
//!
//! let extractor = IntentExtractor::new(Arc::new(PipelineConfig::default()));
//! let result = extractor.classify("what's the balance of bitcoin");
//! assert_eq!(result.domain, Domain::Crypto);
//! ```

pub mod aggregator;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod handlers;
pub mod http_client;
pub mod message;
pub mod metrics;
pub mod numfmt;
pub mod providers;
pub mod retry;
pub mod sentiment;

pub use aggregator::{aggregate, AggregateDiagnostics, MetricAggregator};

pub use config::{
    mask_secret, DomainKeywords, InsuranceKind, InsurerEntry, PipelineConfig, PlanTier,
    ProviderSettings,
};

pub use dispatch::{parse_income, DispatchOutcome, Dispatcher};

pub use domain::{
    AggregateResult, ClassificationResult, Domain, Entity, HealthTopic, MetricSample, Query,
    SampleValue, SentimentCategory, Symbol, UtcDateTime,
};

pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};

pub use error::{CoreError, ValidationError};

pub use extractor::{AddressValidator, Base58AddressValidator, InsuranceFocus, IntentExtractor};

pub use formatter::{FactValue, Facts, FollowUp, FormattedResponse, ResponseFormatter};

pub use handlers::{DomainHandler, HandlerOutput};

pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, OfflineHttpClient,
    ReqwestHttpClient,
};

pub use message::{ChatAcknowledgement, ChatMessage, MessageContent};

pub use metrics::{MarketCapTier, MarketMood, PriceTrend, SentimentIntensity, VolumeInterest};

pub use providers::{ProviderId, SourceError, SourceErrorKind};

pub use retry::{Backoff, RetryConfig};

pub use sentiment::LexiconScorer;
