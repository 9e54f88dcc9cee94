//! rtbridged - bridges a device inventory to Request Tracker.
//!
//! Keeps one asset record per inventory device in an RT catalog and
//! deduplicates device tickets in an RT queue, driven by inventory
//! events, a periodic timer, and the HTTP command surface.

pub mod asset_sync;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod inventory;
pub mod query;
pub mod routes;
pub mod rt_client;
pub mod server;
pub mod ticket_dedup;
