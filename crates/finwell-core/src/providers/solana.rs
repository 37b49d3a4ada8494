use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{fetch_json, ProviderId, SourceError};
use crate::config::ProviderSettings;
use crate::http_client::{HttpClient, HttpRequest};
use crate::UtcDateTime;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const EXPLORER_URL: &str = "https://explorer.solana.com";
const DEFAULT_SIGNATURE_LIMIT: usize = 10;

pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

pub fn explorer_address_url(address: &str) -> String {
    format!("{EXPLORER_URL}/address/{address}")
}

pub fn explorer_tx_url(signature: &str) -> String {
    format!("{EXPLORER_URL}/tx/{signature}")
}

/// Which wallet lookup a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolanaAction {
    Balance,
    Transactions,
    Tokens,
    AccountInfo,
}

impl SolanaAction {
    /// Picks the lookup from lower-cased query text; balance is the default.
    pub fn from_text(normalized: &str) -> Self {
        let has = |words: &[&str]| words.iter().any(|word| normalized.contains(word));

        if has(&["transaction", "history", "recent", "activity"]) {
            Self::Transactions
        } else if has(&["holdings", "spl", "tokens"]) {
            Self::Tokens
        } else if has(&["account info", "info", "owner", "executable"]) {
            Self::AccountInfo
        } else {
            Self::Balance
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalletBalance {
    pub lamports: u64,
    pub sol: f64,
}

impl WalletBalance {
    pub fn from_lamports(lamports: u64) -> Self {
        Self {
            lamports,
            sol: lamports_to_sol(lamports),
        }
    }
}

impl Display for WalletBalance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.9} SOL ({} lamports)", self.sol, self.lamports)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<UtcDateTime>,
    pub failed: bool,
}

/// SPL token account balance; `amount` is already scaled by the mint decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    pub mint: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub lamports: u64,
    pub owner: String,
    pub executable: bool,
    pub space: Option<u64>,
}

/// Solana JSON-RPC client for read-only wallet lookups.
pub struct SolanaRpcClient {
    http: Arc<dyn HttpClient>,
    rpc_url: String,
    timeout_ms: u64,
}

impl SolanaRpcClient {
    pub fn new(http: Arc<dyn HttpClient>, rpc_url: impl Into<String>) -> Self {
        Self {
            http,
            rpc_url: rpc_url.into(),
            timeout_ms: 10_000,
        }
    }

    pub fn from_settings(http: Arc<dyn HttpClient>, settings: &ProviderSettings) -> Self {
        Self {
            timeout_ms: settings.timeout_ms,
            ..Self::new(http, settings.solana_rpc_url.as_str())
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, SourceError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let request = HttpRequest::post(self.rpc_url.as_str())
            .with_json_body(&body)
            .with_timeout_ms(self.timeout_ms);

        let envelope: RpcEnvelope =
            fetch_json(self.http.as_ref(), ProviderId::Solana, request).await?;
        if let Some(error) = envelope.error {
            return Err(SourceError::invalid_request(format!(
                "solana rpc error {}: {}",
                error.code, error.message
            )));
        }

        debug!(method, "solana rpc call succeeded");
        envelope.result.ok_or_else(|| {
            SourceError::invalid_response(format!("solana {method} response has no result"))
        })
    }

    pub async fn balance(&self, address: &str) -> Result<WalletBalance, SourceError> {
        let result = self.call("getBalance", json!([address])).await?;
        let lamports = result
            .get("value")
            .and_then(Value::as_u64)
            .ok_or_else(|| SourceError::invalid_response("no balance information found"))?;
        Ok(WalletBalance::from_lamports(lamports))
    }

    pub async fn recent_signatures(
        &self,
        address: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SignatureInfo>, SourceError> {
        let limit = limit.unwrap_or(DEFAULT_SIGNATURE_LIMIT);
        let result = self
            .call("getSignaturesForAddress", json!([address, {"limit": limit}]))
            .await?;
        let raw: Vec<RawSignature> = serde_json::from_value(result).map_err(|error| {
            SourceError::invalid_response(format!("malformed signature list: {error}"))
        })?;

        Ok(raw
            .into_iter()
            .map(|item| SignatureInfo {
                signature: item.signature,
                slot: item.slot,
                block_time: item.block_time.and_then(UtcDateTime::from_unix_seconds),
                failed: item.err.is_some_and(|err| !err.is_null()),
            })
            .collect())
    }

    pub async fn token_accounts(&self, address: &str) -> Result<Vec<TokenHolding>, SourceError> {
        let result = self
            .call(
                "getTokenAccountsByOwner",
                json!([address, {"programId": TOKEN_PROGRAM_ID}, {"encoding": "jsonParsed"}]),
            )
            .await?;

        let accounts = result
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| SourceError::invalid_response("no token accounts found"))?;

        Ok(accounts
            .iter()
            .filter_map(|account| {
                let info = account.pointer("/account/data/parsed/info")?;
                let mint = info.get("mint")?.as_str()?.to_owned();
                let amount = info
                    .pointer("/tokenAmount/uiAmount")
                    .and_then(Value::as_f64)
                    .unwrap_or_default();
                Some(TokenHolding { mint, amount })
            })
            .collect())
    }

    /// `None` when the account does not exist.
    pub async fn account_info(&self, address: &str) -> Result<Option<AccountSummary>, SourceError> {
        let result = self
            .call("getAccountInfo", json!([address, {"encoding": "jsonParsed"}]))
            .await?;

        match result.get("value") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => {
                let raw: RawAccount = serde_json::from_value(value.clone()).map_err(|error| {
                    SourceError::invalid_response(format!("malformed account info: {error}"))
                })?;
                Ok(Some(AccountSummary {
                    lamports: raw.lamports,
                    owner: raw.owner,
                    executable: raw.executable,
                    space: raw.space,
                }))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSignature {
    signature: String,
    #[serde(default)]
    slot: u64,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    err: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    lamports: u64,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    executable: bool,
    #[serde(default)]
    space: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpMethod;
    use crate::providers::testing::RecordingHttpClient;
    use crate::providers::SourceErrorKind;

    const ADDRESS: &str = "AtTjQKXo1CYTa2MuxPARtr382ZyhPU5YX4wMMpvaa1oy";

    fn client(body: &str) -> (Arc<RecordingHttpClient>, SolanaRpcClient) {
        let http = Arc::new(RecordingHttpClient::json(body));
        let client = SolanaRpcClient::new(http.clone(), "https://rpc.example.test");
        (http, client)
    }

    #[test]
    fn balance_renders_nine_decimals() {
        let balance = WalletBalance::from_lamports(1_500_000_001);
        assert_eq!(balance.to_string(), "1.500000001 SOL (1500000001 lamports)");
    }

    #[test]
    fn action_defaults_to_balance() {
        assert_eq!(SolanaAction::from_text("check this wallet"), SolanaAction::Balance);
        assert_eq!(
            SolanaAction::from_text("show recent transactions for wallet"),
            SolanaAction::Transactions
        );
        assert_eq!(SolanaAction::from_text("wallet spl holdings"), SolanaAction::Tokens);
        assert_eq!(SolanaAction::from_text("account info for wallet"), SolanaAction::AccountInfo);
    }

    #[tokio::test]
    async fn balance_posts_json_rpc_request() {
        let (http, client) = client(r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":2500000000},"id":1}"#);

        let balance = client.balance(ADDRESS).await.expect("balance should load");

        assert_eq!(balance.lamports, 2_500_000_000);
        assert_eq!(balance.sol, 2.5);
        let request = &http.recorded_requests()[0];
        assert_eq!(request.method, HttpMethod::Post);
        let body: Value =
            serde_json::from_str(request.body.as_deref().expect("body is set")).expect("json body");
        assert_eq!(body["method"], "getBalance");
        assert_eq!(body["params"][0], ADDRESS);
    }

    #[tokio::test]
    async fn rpc_error_maps_to_invalid_request() {
        let (_, client) = client(
            r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param: WrongSize"},"id":1}"#,
        );

        let err = client.balance("short").await.expect_err("must fail");
        assert_eq!(err.kind(), SourceErrorKind::InvalidRequest);
        assert!(err.message().contains("WrongSize"));
    }

    #[tokio::test]
    async fn parses_signatures_and_failure_flag() {
        let (_, client) = client(
            r#"{"jsonrpc":"2.0","id":1,"result":[
                {"signature":"5abc","slot":10,"blockTime":1709647389,"err":null},
                {"signature":"6def","slot":11,"blockTime":null,"err":{"InstructionError":[0,"Custom"]}}
            ]}"#,
        );

        let signatures = client
            .recent_signatures(ADDRESS, Some(2))
            .await
            .expect("signatures should load");

        assert_eq!(signatures.len(), 2);
        assert!(!signatures[0].failed);
        assert!(signatures[0].block_time.is_some());
        assert!(signatures[1].failed);
        assert_eq!(signatures[1].block_time, None);
    }

    #[tokio::test]
    async fn parses_token_holdings() {
        let (_, client) = client(
            r#"{"jsonrpc":"2.0","id":1,"result":{"value":[
                {"account":{"data":{"parsed":{"info":{"mint":"EPjFW","tokenAmount":{"uiAmount":12.5}}}}}},
                {"account":{"data":{"parsed":{"info":{"mint":"So111","tokenAmount":{"uiAmount":null}}}}}}
            ]}}"#,
        );

        let holdings = client.token_accounts(ADDRESS).await.expect("tokens should load");
        assert_eq!(
            holdings,
            vec![
                TokenHolding {
                    mint: String::from("EPjFW"),
                    amount: 12.5
                },
                TokenHolding {
                    mint: String::from("So111"),
                    amount: 0.0
                },
            ]
        );
    }

    #[tokio::test]
    async fn missing_account_is_none() {
        let (_, client) = client(r#"{"jsonrpc":"2.0","id":1,"result":{"value":null}}"#);
        let info = client.account_info(ADDRESS).await.expect("call succeeds");
        assert_eq!(info, None);
    }
}
