use std::cell::Cell;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const USER_AGENT: &str = concat!("inventory-diff/", env!("CARGO_PKG_VERSION"));

/// Minimal JSON-RPC 2.0 client for the Zabbix API.
pub struct ZabbixClient {
    http: Client,
    endpoint: String,
    legacy_auth: bool,
    token: Option<String>,
    next_id: Cell<u64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: String,
}

impl ZabbixClient {
    /// `base_url` is the frontend URL, e.g. `http://monitoring/zabbix`.
    pub fn new(base_url: &str, timeout: Duration, legacy_auth: bool) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(ZabbixClient {
            http,
            endpoint: format!("{}/api_jsonrpc.php", base_url.trim_end_matches('/')),
            legacy_auth,
            token: None,
            next_id: Cell::new(1),
        })
    }

    /// Open a session; every later call is authenticated with it.
    pub async fn login(&mut self, login: &str, password: &str) -> Result<()> {
        let user_field = if self.legacy_auth { "user" } else { "username" };
        let params = json!({ user_field: login, "password": password });
        let token: String = self
            .call("user.login", params)
            .await
            .context("Zabbix login failed")?;
        self.token = Some(token);
        Ok(())
    }

    /// Invoke `method` and decode its `result`.
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let mut body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });

        let mut request = self
            .http
            .post(&self.endpoint)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json-rpc");

        if let Some(token) = &self.token {
            if self.legacy_auth {
                body["auth"] = Value::String(token.clone());
            } else {
                request = request.bearer_auth(token);
            }
        }

        debug!(method, id, "zabbix request");
        let response = request
            .json(&body)
            .send()
            .await
            .with_context(|| format!("{method}: request to {} failed", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("{method}: server answered HTTP {status}");
        }

        let rpc: RpcResponse<T> = response
            .json()
            .await
            .with_context(|| format!("{method}: malformed response"))?;

        if let Some(err) = rpc.error {
            bail!("{method}: {} ({}) {}", err.message, err.code, err.data);
        }
        rpc.result
            .with_context(|| format!("{method}: response has no result"))
    }
}
