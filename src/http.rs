//! Gerrit REST 客户端
//!
//! 基于 reqwest 的 `OwnershipLookup` 实现，以及当前用户查询。
//! 配置了用户名密码时走 Gerrit 的 `/a/` 认证前缀（HTTP Basic）。

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::{GateError, GateResult};
use crate::host::OwnershipLookup;
use crate::status::{strip_xssi_prefix, Account};

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct GerritClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Option<Credentials>,
}

#[derive(Debug, Deserialize)]
struct AccountInfo {
    #[serde(rename = "_account_id", default)]
    account_id: u64,
}

impl GerritClient {
    pub fn new(
        base_url: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> GateResult<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(GateError::Config(format!(
                "server must be an http:// or https:// URL: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("ownergate/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GerritClient {
            client,
            base_url,
            credentials,
        })
    }

    /// 相对 REST 路径 → 完整 URL
    pub fn url_for(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.credentials.is_some() {
            format!("{}/a/{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    async fn fetch(&self, path: &str) -> GateResult<(StatusCode, String)> {
        let url = self.url_for(path);
        debug!(%url, "GET");

        let mut request = self.client.get(&url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    /// 查询当前用户，未认证或账号 id 为 0 时返回匿名
    pub async fn current_account(&self) -> GateResult<Account> {
        let (status, body) = self.fetch("accounts/self").await?;

        if matches!(
            status,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
        ) {
            return Ok(Account::Anonymous);
        }
        if !status.is_success() {
            return Err(GateError::Status {
                code: status.as_u16(),
                path: "accounts/self".to_string(),
            });
        }

        Ok(parse_account(&body))
    }
}

impl OwnershipLookup for GerritClient {
    async fn get(&self, path: &str) -> GateResult<Option<String>> {
        let (status, body) = self.fetch(path).await?;

        if !status.is_success() {
            return Err(GateError::Status {
                code: status.as_u16(),
                path: path.to_string(),
            });
        }

        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }
}

/// 解析 `/accounts/self` 响应，无法解析时视为匿名
fn parse_account(body: &str) -> Account {
    let json = strip_xssi_prefix(body);
    serde_json::from_str::<AccountInfo>(json)
        .map(|info| Account::from_id(info.account_id))
        .unwrap_or(Account::Anonymous)
}
