use std::sync::Arc;

use tracing::debug;

use super::{narrate, DomainHandler, HandlerFuture, HandlerOutput, SampleScorer};
use crate::config::PipelineConfig;
use crate::formatter::{FactValue, Facts};
use crate::metrics::{trend_texts, MarketCapTier, PriceTrend, SentimentIntensity, VolumeInterest};
use crate::numfmt::{format_currency, format_percent, format_price};
use crate::providers::{
    explorer_address_url, explorer_tx_url, CoinGeckoClient, LlmClient, NewsClient, PriceSnapshot,
    ProviderId, SolanaAction, SolanaRpcClient, SourceError, WalletBalance,
};
use crate::{AggregateResult, ClassificationResult, Domain, Entity, SentimentCategory};

const SYSTEM_PROMPT: &str = "You are a cryptocurrency market analyst. Keep the response concise \
(maximum 200 words), neutral and strictly based on the provided data.";
const SHOWN_SIGNATURES: usize = 3;

/// Token market reports from CoinGecko and wallet lookups over Solana RPC.
pub struct CryptoHandler {
    config: Arc<PipelineConfig>,
    coingecko: CoinGeckoClient,
    solana: SolanaRpcClient,
    news: Option<NewsClient>,
    llm: Option<Arc<LlmClient>>,
    scorer: SampleScorer,
}

impl CryptoHandler {
    pub fn new(
        config: Arc<PipelineConfig>,
        coingecko: CoinGeckoClient,
        solana: SolanaRpcClient,
    ) -> Self {
        Self {
            config,
            coingecko,
            solana,
            news: None,
            llm: None,
            scorer: SampleScorer::default(),
        }
    }

    pub fn with_news(mut self, news: NewsClient) -> Self {
        self.news = Some(news);
        self
    }

    pub fn with_llm(mut self, llm: Arc<LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_scorer(mut self, scorer: SampleScorer) -> Self {
        self.scorer = scorer;
        self
    }

    async fn token_report(&self, symbol: &str) -> Result<HandlerOutput, SourceError> {
        let id = self
            .config
            .token_by_symbol(symbol)
            .map(|token| token.id.clone())
            .unwrap_or_else(|| symbol.to_owned());

        let mut output = HandlerOutput::new();
        let snapshot = self.coingecko.coin(&id, symbol).await?;
        output.used(ProviderId::Coingecko);
        snapshot_facts(&snapshot, &mut output);

        match self.coingecko.market_chart(&id).await {
            Ok(series) => output.push_samples(
                trend_texts(&snapshot.name, &series.prices, &series.volumes),
                "CoinGecko Market Data",
            ),
            Err(error) => output.push_warning("coingecko market chart", &error),
        }
        output.push_samples(
            snapshot.community.texts(&snapshot.symbol),
            "CoinGecko Community Data",
        );

        if let Some(news) = &self.news {
            match news.samples(symbol, &id).await {
                Ok(samples) => {
                    output.used(ProviderId::News);
                    output.samples.extend(samples);
                }
                Err(error) => output.push_warning("news feed", &error),
            }
        }

        let aggregate = self.scorer.aggregate(&output.samples);
        debug!(symbol, samples = output.samples.len(), "collected crypto samples");

        let prompt = crypto_prompt(&snapshot, &aggregate);
        let analysis = narrate(
            self.llm.as_deref(),
            SYSTEM_PROMPT,
            &prompt,
            &mut output,
            || crypto_fallback_analysis(&snapshot, &aggregate),
        )
        .await;

        output.fact(Facts::ANALYSIS, FactValue::Text(analysis));
        output.fact(
            Facts::WEBSITE,
            FactValue::text(format!("coingecko.com/en/coins/{id}")),
        );
        Ok(output)
    }

    async fn wallet_report(
        &self,
        address: &str,
        action: SolanaAction,
    ) -> Result<HandlerOutput, SourceError> {
        let mut output = HandlerOutput::new();

        match action {
            SolanaAction::Balance => {
                let balance = self.solana.balance(address).await?;
                output.fact("Balance", FactValue::text(balance.to_string()));
            }
            SolanaAction::Transactions => {
                let signatures = self.solana.recent_signatures(address, None).await?;
                let failed = signatures.iter().filter(|item| item.failed).count();
                output.fact("Recent Transactions", FactValue::Count(signatures.len() as f64));
                output.fact("Failed", FactValue::Count(failed as f64));
                for (index, item) in signatures.iter().take(SHOWN_SIGNATURES).enumerate() {
                    let when = item
                        .block_time
                        .map(|time| time.format_long())
                        .unwrap_or_else(|| String::from("time unknown"));
                    output.fact(
                        format!("Transaction {}", index + 1),
                        FactValue::text(format!("{} ({when})", explorer_tx_url(&item.signature))),
                    );
                }
            }
            SolanaAction::Tokens => {
                let mut holdings = self.solana.token_accounts(address).await?;
                holdings.sort_by(|left, right| right.amount.total_cmp(&left.amount));
                output.fact("Token Accounts", FactValue::Count(holdings.len() as f64));
                if let Some(top) = holdings.iter().find(|holding| holding.amount > 0.0) {
                    output.fact(
                        "Largest Holding",
                        FactValue::text(format!("{} of mint {}", top.amount, top.mint)),
                    );
                }
            }
            SolanaAction::AccountInfo => match self.solana.account_info(address).await? {
                Some(account) => {
                    output.fact(
                        "Balance",
                        FactValue::text(WalletBalance::from_lamports(account.lamports).to_string()),
                    );
                    output.fact("Owner Program", FactValue::text(account.owner));
                    output.fact(
                        "Executable",
                        FactValue::text(if account.executable { "yes" } else { "no" }),
                    );
                    if let Some(space) = account.space {
                        output.fact("Data Size (bytes)", FactValue::Count(space as f64));
                    }
                }
                None => output.fact("Account", FactValue::text("not found on chain")),
            },
        }

        output.used(ProviderId::Solana);
        output.fact(Facts::WEBSITE, FactValue::text(explorer_address_url(address)));
        Ok(output)
    }
}

impl DomainHandler for CryptoHandler {
    fn domain(&self) -> Domain {
        Domain::Crypto
    }

    fn handle<'a>(&'a self, classification: &'a ClassificationResult) -> HandlerFuture<'a> {
        Box::pin(async move {
            match &classification.entity {
                Some(Entity::Token { symbol }) => self.token_report(symbol).await,
                Some(Entity::WalletAddress { address }) => {
                    self.wallet_report(address, SolanaAction::from_text(&classification.text))
                        .await
                }
                _ => Ok(HandlerOutput::new()),
            }
        })
    }
}

fn snapshot_facts(snapshot: &PriceSnapshot, output: &mut HandlerOutput) {
    output.fact("Price", FactValue::Price(snapshot.price_usd));
    output.fact("Market Cap", FactValue::Currency(snapshot.market_cap));
    output.fact("24h Volume", FactValue::Currency(snapshot.volume_24h));
    output.fact("24h Change", FactValue::Percent(snapshot.change_24h));
    output.fact("7d Change", FactValue::Percent(snapshot.change_7d));
    output.fact(
        "Trend",
        FactValue::text(PriceTrend::daily(snapshot.change_24h).to_string()),
    );
    output.fact(
        "Market Position",
        FactValue::text(MarketCapTier::from_market_cap(snapshot.market_cap).label()),
    );
    if let Some(interest) = VolumeInterest::from_ratio(snapshot.volume_24h, snapshot.market_cap) {
        output.fact("Trading Interest", FactValue::text(interest.label()));
    }
}

fn crypto_prompt(snapshot: &PriceSnapshot, aggregate: &AggregateResult) -> String {
    format!(
        "Analyze the following data about the cryptocurrency {name} ({symbol}), {position} \
currently in a {trend} trend.\n\n\
Price and market data:\n\
- Current price: {price}\n\
- 24h change: {change_24h}\n\
- 7d change: {change_7d}\n\
- 30d change: {change_30d}\n\
- 24h volume: {volume}\n\
- Market capitalization: {market_cap}\n\n\
Market sentiment analysis:\n\
- Category: {category}\n\
- Numeric score: {score:.2}\n\
- Based on {samples} data samples\n\
- Sources include: {sources}\n\n\
Provide a structured analysis with:\n\
1. Summary of the token's current situation and market positioning\n\
2. Main technical and fundamental factors affecting the price\n\
3. Short-term outlook based on the presented data\n\
4. Key points for investors interested in this asset",
        name = snapshot.name,
        symbol = snapshot.symbol,
        position = MarketCapTier::from_market_cap(snapshot.market_cap).label(),
        trend = PriceTrend::daily(snapshot.change_24h).label(),
        price = format_price(snapshot.price_usd),
        change_24h = format_percent(snapshot.change_24h),
        change_7d = format_percent(snapshot.change_7d),
        change_30d = format_percent(snapshot.change_30d),
        volume = format_currency(snapshot.volume_24h),
        market_cap = format_currency(snapshot.market_cap),
        category = aggregate.category.label(),
        score = aggregate.score,
        samples = aggregate.sample_size,
        sources = aggregate
            .sources
            .iter()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Deterministic narrative used when no LLM analysis is available.
pub fn crypto_fallback_analysis(snapshot: &PriceSnapshot, aggregate: &AggregateResult) -> String {
    let daily = PriceTrend::daily(snapshot.change_24h);
    let weekly = PriceTrend::weekly(snapshot.change_7d);
    let volume = match VolumeInterest::from_ratio(snapshot.volume_24h, snapshot.market_cap) {
        Some(interest) => format!("Trading shows {}.", interest.label()),
        None => String::from("Market capitalization data is unavailable for volume analysis."),
    };

    let mut text = format!(
        "Current Situation Summary:\n{name} ({symbol}) is {position} currently priced at {price}. \
The token moved {daily} over the last 24 hours ({change_24h}) and {weekly} over the last week \
({change_7d}). {volume}",
        name = snapshot.name,
        symbol = snapshot.symbol,
        position = MarketCapTier::from_market_cap(snapshot.market_cap).label(),
        price = format_price(snapshot.price_usd),
        daily = daily.label(),
        change_24h = format_percent(snapshot.change_24h),
        weekly = weekly.label(),
        change_7d = format_percent(snapshot.change_7d),
    );

    if aggregate.is_empty() {
        text.push_str("\n\nMarket Sentiment:\nNo sentiment data was available for this token.");
    } else {
        text.push_str(&format!(
            "\n\nMarket Sentiment:\nSentiment is {} with {} intensity, based on {} samples.",
            aggregate.category.label(),
            SentimentIntensity::from_score(aggregate.score).as_str(),
            aggregate.sample_size
        ));
    }

    let positive = matches!(
        aggregate.category,
        SentimentCategory::Positive | SentimentCategory::VeryPositive
    );
    let negative = matches!(
        aggregate.category,
        SentimentCategory::Negative | SentimentCategory::VeryNegative
    );
    let outlook = if positive && snapshot.change_24h > 0.0 {
        "Rising price and positive sentiment suggest potential for continued upward movement in \
the short term."
    } else if negative && snapshot.change_24h < 0.0 {
        "Falling price and negative sentiment suggest selling pressure may continue in the short \
term. Watch important support levels."
    } else if positive && snapshot.change_24h < 0.0 {
        "Despite the recent drop, positive sentiment may indicate a reversal or stabilization. \
This divergence deserves attention."
    } else if negative && snapshot.change_24h > 0.0 {
        "Despite the recent rise, negative sentiment suggests caution. Consider the possibility \
of profit-taking."
    } else {
        "The market seems undecided, with mixed signals. Observe trend breaks before making \
decisions."
    };
    text.push_str("\n\nShort-Term Outlook:\n");
    text.push_str(outlook);

    text.push_str(&format!(
        "\n\nKey Points to Watch:\n- Trading volume as confirmation of the current trend\n\
- News specific to {} that could move the price\n\
- The overall cryptocurrency market context",
        snapshot.symbol
    ));
    text
}
