use std::collections::HashMap;

use anyhow::Result;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::{debug, warn};

use super::client::ZabbixClient;
use crate::config::InventoryConfig;
use crate::engine::MonitoringSource;
use crate::models::{ChangeEvent, InventoryItem, RawSample, Window};

/// `history.get` value type for text items.
const HISTORY_TEXT: u8 = 4;

/// [`MonitoringSource`] backed by a logged-in [`ZabbixClient`].
pub struct ZabbixSource<'a> {
    client: ZabbixClient,
    inventory: &'a InventoryConfig,
}

impl<'a> ZabbixSource<'a> {
    pub fn new(client: ZabbixClient, inventory: &'a InventoryConfig) -> Self {
        Self { client, inventory }
    }
}

#[derive(Debug, Deserialize)]
struct ZHost {
    hostid: String,
    host: String,
}

#[derive(Debug, Deserialize)]
struct ZEvent {
    #[serde(deserialize_with = "i64_from_str")]
    clock: i64,
    #[serde(default)]
    hosts: Vec<ZHost>,
}

#[derive(Debug, Deserialize)]
struct ZItem {
    itemid: String,
    hostid: String,
    key_: String,
    #[serde(default)]
    hosts: Vec<ZHost>,
}

#[derive(Debug, Deserialize)]
struct ZHistory {
    itemid: String,
    #[serde(deserialize_with = "i64_from_str")]
    clock: i64,
    value: String,
}

/// The API encodes numbers as JSON strings.
fn i64_from_str<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

impl MonitoringSource for ZabbixSource<'_> {
    async fn change_events(&self, window: Window) -> Result<Vec<ChangeEvent>> {
        let params = json!({
            "time_from": window.from,
            "time_till": window.till,
            "object": 0,
            "value": 1,
            "suppressed": false,
            "sortfield": ["clock", "eventid"],
            "sortorder": "DESC",
            "output": ["eventid", "clock"],
            "filter": { "name": self.inventory.event_name },
            "selectHosts": ["host"],
        });
        let events: Vec<ZEvent> = self.client.call("event.get", params).await?;

        Ok(events
            .into_iter()
            .filter_map(|event| {
                let clock = event.clock;
                match event.hosts.into_iter().next() {
                    Some(host) => Some(ChangeEvent {
                        timestamp: clock,
                        host_id: host.hostid,
                        host_name: host.host,
                    }),
                    None => {
                        debug!(clock, "event without host");
                        None
                    }
                }
            })
            .collect())
    }

    async fn inventory_items(&self, host_ids: &[String]) -> Result<Vec<InventoryItem>> {
        let params = json!({
            "hostids": host_ids,
            "output": ["itemid", "hostid", "key_"],
            "sortfield": "itemid",
            "filter": { "key_": self.inventory.item_keys() },
            "selectHosts": ["host"],
        });
        let items: Vec<ZItem> = self.client.call("item.get", params).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| {
                let Some(format) = self.inventory.format_for_key(&item.key_) else {
                    warn!(item = %item.itemid, key = %item.key_, "unexpected item key");
                    return None;
                };
                let host_name = item
                    .hosts
                    .into_iter()
                    .next()
                    .map(|h| h.host)
                    .unwrap_or_else(|| item.hostid.clone());
                Some(InventoryItem {
                    item_id: item.itemid,
                    host_id: item.hostid,
                    host_name,
                    format,
                })
            })
            .collect())
    }

    async fn history(
        &self,
        items: &[InventoryItem],
        window: Window,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>> {
        let by_id: HashMap<&str, &InventoryItem> =
            items.iter().map(|i| (i.item_id.as_str(), i)).collect();
        let item_ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();

        let sort_order = if limit.is_some() { "DESC" } else { "ASC" };
        let mut params = json!({
            "itemids": item_ids,
            "history": HISTORY_TEXT,
            "sortfield": "clock",
            "sortorder": sort_order,
            "time_from": window.from,
            "time_till": window.till,
            "output": ["itemid", "clock", "value"],
        });
        if let Some(limit) = limit {
            params["limit"] = json!(limit);
        }

        let rows: Vec<ZHistory> = self.client.call("history.get", params).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let Some(item) = by_id.get(row.itemid.as_str()) else {
                    warn!(item = %row.itemid, "history for unrequested item");
                    return None;
                };
                Some(RawSample {
                    host_id: item.host_id.clone(),
                    format: item.format,
                    item_id: row.itemid,
                    timestamp: row.clock,
                    value: row.value,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::FormatTag;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, rpc_method: &str, result: serde_json::Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "result": result, "id": 1
            })))
            .mount(server)
            .await;
    }

    fn client(server: &MockServer) -> ZabbixClient {
        ZabbixClient::new(&server.uri(), Duration::from_secs(5), false).unwrap()
    }

    #[tokio::test]
    async fn test_change_events_decode_string_clocks() {
        let server = MockServer::start().await;
        mount(
            &server,
            "event.get",
            json!([
                { "eventid": "9", "clock": "1653585600", "hosts": [{ "hostid": "10", "host": "web-1" }] },
                { "eventid": "8", "clock": "1653585000", "hosts": [] }
            ]),
        )
        .await;

        let inventory = InventoryConfig::default();
        let source = ZabbixSource::new(client(&server), &inventory);
        let events = source
            .change_events(Window::new(1_653_500_000, 1_653_600_000))
            .await
            .unwrap();

        assert_eq!(
            events,
            vec![ChangeEvent {
                timestamp: 1_653_585_600,
                host_id: "10".to_string(),
                host_name: "web-1".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_items_map_keys_to_formats() {
        let server = MockServer::start().await;
        mount(
            &server,
            "item.get",
            json!([
                { "itemid": "100", "hostid": "10", "key_": "ubuntu.soft", "hosts": [{ "hostid": "10", "host": "web-1" }] },
                { "itemid": "101", "hostid": "11", "key_": "system.sw.packages", "hosts": [{ "hostid": "11", "host": "db-1" }] },
                { "itemid": "102", "hostid": "11", "key_": "system.uname", "hosts": [] }
            ]),
        )
        .await;

        let inventory = InventoryConfig::default();
        let source = ZabbixSource::new(client(&server), &inventory);
        let items = source
            .inventory_items(&["10".to_string(), "11".to_string()])
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].format, FormatTag::Newline);
        assert_eq!(items[0].host_name, "web-1");
        assert_eq!(items[1].format, FormatTag::BracketedCsv);
        assert_eq!(items[1].host_name, "db-1");
    }

    #[tokio::test]
    async fn test_history_joins_items() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "history.get",
                "params": { "history": 4, "sortorder": "DESC", "limit": 2 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "result": [
                    { "itemid": "100", "clock": "200", "value": "a=2" },
                    { "itemid": "100", "clock": "100", "value": "a=1" },
                    { "itemid": "999", "clock": "150", "value": "stray" }
                ],
                "id": 1
            })))
            .mount(&server)
            .await;

        let inventory = InventoryConfig::default();
        let source = ZabbixSource::new(client(&server), &inventory);
        let items = vec![InventoryItem {
            item_id: "100".to_string(),
            host_id: "10".to_string(),
            host_name: "web-1".to_string(),
            format: FormatTag::Newline,
        }];

        let samples = source
            .history(&items, Window::new(0, 300), Some(2))
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].host_id, "10");
        assert_eq!(samples[0].timestamp, 200);
        assert_eq!(samples[1].value, "a=1");
    }
}
