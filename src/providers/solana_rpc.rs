//! Solana JSON-RPC 2.0 adapter over HTTP.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

use crate::config::OnChainSettings;
use crate::error::CollectorError;

use super::{ChainRpcProvider, SignatureInfo, TokenBalance, TransactionDelta};

const PROVIDER: &str = "solana";

/// Error code some RPC providers use for throttling inside a 200 response.
const RPC_RATE_LIMIT_CODE: i64 = 429;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

// ============================================
// Result payloads
// ============================================

#[derive(Debug, Deserialize)]
struct WithContext<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UiTokenAmount {
    #[serde(default)]
    ui_amount: Option<f64>,
    #[serde(default)]
    ui_amount_string: Option<String>,
}

impl UiTokenAmount {
    fn value(&self) -> f64 {
        self.ui_amount
            .or_else(|| self.ui_amount_string.as_deref()?.parse().ok())
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureEntry {
    signature: String,
    #[serde(default)]
    block_time: Option<i64>,
    #[serde(default)]
    err: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenBalanceEntry {
    account_index: usize,
    mint: String,
    ui_token_amount: UiTokenAmount,
}

impl From<TokenBalanceEntry> for TokenBalance {
    fn from(entry: TokenBalanceEntry) -> Self {
        TokenBalance {
            account_index: entry.account_index,
            mint: entry.mint,
            ui_amount: entry.ui_token_amount.value(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionMeta {
    #[serde(default)]
    pre_balances: Vec<u64>,
    #[serde(default)]
    post_balances: Vec<u64>,
    #[serde(default)]
    pre_token_balances: Option<Vec<TokenBalanceEntry>>,
    #[serde(default)]
    post_token_balances: Option<Vec<TokenBalanceEntry>>,
}

#[derive(Debug, Deserialize)]
struct TransactionEntry {
    #[serde(default)]
    meta: Option<TransactionMeta>,
}

impl From<TransactionMeta> for TransactionDelta {
    fn from(meta: TransactionMeta) -> Self {
        let convert = |balances: Option<Vec<TokenBalanceEntry>>| -> Vec<TokenBalance> {
            balances
                .unwrap_or_default()
                .into_iter()
                .map(TokenBalance::from)
                .collect()
        };

        TransactionDelta {
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
            pre_token_balances: convert(meta.pre_token_balances),
            post_token_balances: convert(meta.post_token_balances),
        }
    }
}

// ============================================
// Client
// ============================================

pub struct SolanaRpcClient {
    client: Client,
    url: Url,
    next_id: AtomicU64,
}

impl SolanaRpcClient {
    pub fn new(settings: &OnChainSettings) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| CollectorError::provider(PROVIDER, e.to_string()))?;
        let url = Url::parse(&settings.rpc_url)
            .map_err(|e| CollectorError::provider(PROVIDER, format!("invalid rpc url: {}", e)))?;

        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Option<T>, CollectorError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| CollectorError::provider(PROVIDER, format!("{}: {}", method, e)))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(CollectorError::RateLimited {
                provider: PROVIDER,
                retry_after,
            });
        }
        if !status.is_success() {
            return Err(CollectorError::provider(
                PROVIDER,
                format!("{}: HTTP {}", method, status),
            ));
        }

        let body: JsonRpcResponse<T> = response.json().await.map_err(|e| {
            CollectorError::provider(PROVIDER, format!("{}: invalid response: {}", method, e))
        })?;

        into_result(method, body)
    }
}

fn into_result<T>(method: &str, body: JsonRpcResponse<T>) -> Result<Option<T>, CollectorError> {
    match body.error {
        Some(error) if error.code == RPC_RATE_LIMIT_CODE => Err(CollectorError::RateLimited {
            provider: PROVIDER,
            retry_after: None,
        }),
        Some(error) => Err(CollectorError::provider(
            PROVIDER,
            format!("{}: RPC error {}: {}", method, error.code, error.message),
        )),
        None => Ok(body.result),
    }
}

fn missing(method: &str) -> CollectorError {
    CollectorError::provider(PROVIDER, format!("{}: empty result", method))
}

#[async_trait]
impl ChainRpcProvider for SolanaRpcClient {
    async fn token_supply(&self, mint: &str) -> Result<f64, CollectorError> {
        let supply: WithContext<UiTokenAmount> = self
            .call("getTokenSupply", json!([mint]))
            .await?
            .ok_or_else(|| missing("getTokenSupply"))?;
        Ok(supply.value.value())
    }

    async fn signatures_for_address(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<SignatureInfo>, CollectorError> {
        let entries: Vec<SignatureEntry> = self
            .call(
                "getSignaturesForAddress",
                json!([address, { "limit": limit }]),
            )
            .await?
            .ok_or_else(|| missing("getSignaturesForAddress"))?;

        Ok(entries
            .into_iter()
            .map(|e| SignatureInfo {
                signature: e.signature,
                block_time: e.block_time,
                failed: e.err.map_or(false, |err| !err.is_null()),
            })
            .collect())
    }

    async fn transaction(&self, signature: &str) -> Result<Option<TransactionDelta>, CollectorError> {
        let entry: Option<TransactionEntry> = self
            .call(
                "getTransaction",
                json!([
                    signature,
                    { "encoding": "jsonParsed", "maxSupportedTransactionVersion": 0 }
                ]),
            )
            .await?;

        Ok(entry.and_then(|e| e.meta).map(TransactionDelta::from))
    }
}
