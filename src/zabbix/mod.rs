//! Zabbix JSON-RPC backend for the engine.
//!
//! - [`client`] — transport: login, authenticated calls, error mapping.
//! - [`source`] — `event.get` / `item.get` / `history.get` as a
//!   [`MonitoringSource`](crate::engine::MonitoringSource).

pub mod client;
pub mod source;
