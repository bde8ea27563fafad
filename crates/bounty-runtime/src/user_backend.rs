use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use bounty_github::transport::truncate_for_error;

#[derive(Debug, Clone, PartialEq)]
/// Payout multiplier granted to a user for a repository. A `None` value means
/// the grant exists but carries no usable multiplier.
pub struct PayoutMultiplier {
    pub value: Option<f64>,
    pub reason: Option<String>,
}

#[async_trait]
/// User records living outside GitHub: wallet addresses and payout
/// multipliers. Lookup misses are `Ok(None)`; only transport and decode
/// problems are errors.
pub trait UserBackend: Send + Sync {
    async fn wallet_address(&self, user_id: u64) -> Result<Option<String>>;
    async fn payout_multiplier(
        &self,
        user_id: u64,
        repository_id: u64,
    ) -> Result<Option<PayoutMultiplier>>;
}

#[derive(Debug, Deserialize)]
struct UserWalletRow {
    #[serde(default)]
    wallets: Option<WalletRow>,
}

#[derive(Debug, Deserialize)]
struct WalletRow {
    #[serde(default)]
    address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationRow {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct AccessRow {
    #[serde(default)]
    multiplier: Option<f64>,
    #[serde(default)]
    multiplier_reason: Option<String>,
}

#[derive(Clone)]
/// PostgREST-backed implementation. Wallets hang off the user row; payout
/// multipliers are the newest access grant for any location row of the
/// repository.
pub struct PostgrestUserBackend {
    http: reqwest::Client,
    base_url: String,
}

impl PostgrestUserBackend {
    pub fn new(base_url: &str, api_key: &str, request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "apikey",
            reqwest::header::HeaderValue::from_str(api_key.trim())
                .context("invalid user backend api key")?,
        );
        headers.insert(
            reqwest::header::AUTHORIZATION,
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .context("invalid user backend authorization header")?,
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create user backend client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_rows<T>(
        &self,
        operation: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .send()
            .await
            .with_context(|| format!("user backend {operation} request failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "user backend {operation} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, 400)
            );
        }
        response
            .json::<Vec<T>>()
            .await
            .with_context(|| format!("failed to decode user backend {operation}"))
    }
}

#[async_trait]
impl UserBackend for PostgrestUserBackend {
    async fn wallet_address(&self, user_id: u64) -> Result<Option<String>> {
        let user_filter = format!("eq.{user_id}");
        let rows: Vec<UserWalletRow> = self
            .get_rows(
                "wallet lookup",
                "/rest/v1/users",
                &[("select", "wallets(address)"), ("id", user_filter.as_str())],
            )
            .await?;
        Ok(rows
            .into_iter()
            .next()
            .and_then(|row| row.wallets)
            .and_then(|wallet| wallet.address))
    }

    async fn payout_multiplier(
        &self,
        user_id: u64,
        repository_id: u64,
    ) -> Result<Option<PayoutMultiplier>> {
        let repository_filter = format!("eq.{repository_id}");
        let locations: Vec<LocationRow> = self
            .get_rows(
                "location lookup",
                "/rest/v1/locations",
                &[("select", "id"), ("repository_id", repository_filter.as_str())],
            )
            .await?;
        if locations.is_empty() {
            return Ok(None);
        }
        let ids = locations
            .iter()
            .map(|row| row.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let location_filter = format!("in.({ids})");
        let user_filter = format!("eq.{user_id}");
        let rows: Vec<AccessRow> = self
            .get_rows(
                "multiplier lookup",
                "/rest/v1/access",
                &[
                    ("select", "multiplier,multiplier_reason"),
                    ("location_id", location_filter.as_str()),
                    ("user_id", user_filter.as_str()),
                    ("order", "id.desc"),
                    ("limit", "1"),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| PayoutMultiplier {
            value: row.multiplier,
            reason: row.multiplier_reason,
        }))
    }
}
