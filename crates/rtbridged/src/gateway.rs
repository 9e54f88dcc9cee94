//! Gateway contract towards the ticketing system.
//!
//! The reconciliation engine only ever talks to this trait; `RtClient`
//! implements it over RT REST 2.0, the test suite implements it with
//! in-memory fakes.

use async_trait::async_trait;
use rtbridge_common::BridgeError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Custom-field name/value pairs sent on create and update calls.
///
/// Ordered map so payloads (and test assertions) are deterministic.
pub type FieldMap = BTreeMap<String, String>;

/// A ticket as returned by search or create.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TicketRecord {
    pub id: u64,
    #[serde(default)]
    pub status: String,
}

/// An asset reference as returned by search, create or list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct AssetRecord {
    pub id: u64,
}

/// Remote calls the engine needs. Every method is a single round trip;
/// none of them retry, cache, or hold state.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Open tickets in `queue` whose dedup field equals `device_id`.
    async fn search_tickets(
        &self,
        queue: &str,
        device_id: &str,
    ) -> Result<Vec<TicketRecord>, BridgeError>;

    async fn create_ticket(
        &self,
        queue: &str,
        subject: &str,
        content: &str,
        custom_fields: &FieldMap,
    ) -> Result<TicketRecord, BridgeError>;

    async fn add_comment(&self, ticket_id: u64, text: &str) -> Result<(), BridgeError>;

    /// The asset in `catalog` whose dedup field equals `device_id`, if any.
    async fn search_asset(
        &self,
        catalog: &str,
        device_id: &str,
    ) -> Result<Option<AssetRecord>, BridgeError>;

    async fn create_asset(
        &self,
        catalog: &str,
        name: &str,
        custom_fields: &FieldMap,
    ) -> Result<AssetRecord, BridgeError>;

    /// Update name and custom fields on an existing asset. Fields absent
    /// from the map are left untouched remotely.
    async fn update_asset(
        &self,
        asset_id: u64,
        name: &str,
        custom_fields: &FieldMap,
    ) -> Result<(), BridgeError>;

    /// Mark an asset's status as deleted.
    async fn retire_asset(&self, asset_id: u64) -> Result<(), BridgeError>;

    async fn link_ticket_to_asset(&self, ticket_id: u64, asset_id: u64)
        -> Result<(), BridgeError>;

    /// All non-retired assets in `catalog`.
    async fn list_assets(&self, catalog: &str) -> Result<Vec<AssetRecord>, BridgeError>;

    /// The dedup field value stored on an asset, if the asset exists and
    /// carries one.
    async fn asset_device_id(&self, asset_id: u64) -> Result<Option<String>, BridgeError>;

    /// One cheap authenticated request, used once at startup.
    async fn test_connection(&self) -> Result<(), BridgeError>;

    /// Human-facing URL of a ticket, for command responses.
    fn ticket_url(&self, ticket_id: u64) -> String;
}
