// src/worker/client.rs

//! A thin asynchronous client over the coordinator's authenticated work
//! surface (§4.5, §6): lease, report, and found-confirm.

use crate::core::wallet::WalletDescriptor;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LeaseRequestBody<'a> {
    cpu_count: i64,
    client_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseResponse {
    pub success: bool,
    #[serde(default)]
    pub passwords: Vec<String>,
    #[serde(default)]
    pub encrypt: Option<WalletDescriptor>,
    #[serde(default)]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub password_found: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResultRequestBody<'a> {
    batch_id: &'a str,
    client_id: &'a str,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    found_password: Option<&'a str>,
    passwords: &'a [String],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultResponse {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub should_stop: Option<bool>,
    #[serde(default)]
    pub password_found: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FoundRequestBody<'a> {
    password: &'a str,
    client_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoundResponse {
    pub success: bool,
    pub password_found: bool,
}

/// A handle to the coordinator's HTTP endpoint, carrying the shared secret
/// presented on every mutating request as an `Authorization: Bearer` header.
pub struct CoordinatorClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl CoordinatorClient {
    pub fn new(base_url: impl Into<String>, api_token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            api_token,
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub async fn lease(&self, cpu_count: i64, worker_id: &str) -> Result<LeaseResponse> {
        let body = LeaseRequestBody {
            cpu_count,
            client_id: worker_id,
        };
        let request = self.authorize(self.http.post(self.url("/work/request")).json(&body));
        let response = request.send().await.context("lease request failed")?;
        parse_response(response).await
    }

    pub async fn report_result(
        &self,
        batch_id: &str,
        worker_id: &str,
        success: bool,
        found_password: Option<&str>,
        passwords: &[String],
    ) -> Result<ResultResponse> {
        let body = ResultRequestBody {
            batch_id,
            client_id: worker_id,
            success,
            found_password,
            passwords,
        };
        let request = self.authorize(self.http.post(self.url("/work/result")).json(&body));
        let response = request.send().await.context("result report failed")?;
        parse_response(response).await
    }

    pub async fn confirm_found(&self, worker_id: &str, passphrase: &str) -> Result<FoundResponse> {
        let body = FoundRequestBody {
            password: passphrase,
            client_id: worker_id,
        };
        let request = self.authorize(self.http.post(self.url("/work/found")).json(&body));
        let response = request.send().await.context("found-confirm request failed")?;
        parse_response(response).await
    }
}

async fn parse_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await.context("failed to read response body")?;
    if !status.is_success() {
        return Err(anyhow!("coordinator returned {status}: {body}"));
    }
    serde_json::from_str(&body).with_context(|| format!("malformed coordinator response: {body}"))
}
