//! Asset reconciliation: one catalog record per inventory device.
//!
//! Every call re-searches the catalog instead of trusting a cached
//! asset id; the inventory and RT are independently mutable and a
//! cached id can point at a deleted or re-created record. The extra
//! search per sync is the price of converging against external edits.

use crate::config::SyncContext;
use crate::gateway::{FieldMap, Gateway};
use crate::inventory::Inventory;
use crate::query::{ADDRESS_FIELD, AREA_FIELD, DEVICE_ID_FIELD};
use rtbridge_common::{BridgeError, DeviceSnapshot, SyncDisposition};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Reconcile one device against the catalog.
///
/// Resolves the snapshot fresh from the inventory (a miss is a
/// `DeviceNotFound` error, never a silent skip), then searches for the
/// device's asset and updates it, or creates it when absent. Non-physical
/// registry entries are reported as `Skipped` and never mirrored.
pub async fn sync_device(
    gateway: &dyn Gateway,
    inventory: &dyn Inventory,
    ctx: &SyncContext,
    device_id: &str,
) -> Result<SyncDisposition, BridgeError> {
    let snapshot = inventory
        .get_device(device_id)
        .await
        .ok_or_else(|| BridgeError::DeviceNotFound(device_id.to_string()))?;

    if !snapshot.is_physical() {
        debug!(
            "skipping non-physical entry {device_id} (entry_type={:?})",
            snapshot.entry_type
        );
        return Ok(SyncDisposition::Skipped);
    }

    let fields = snapshot_fields(&snapshot, &ctx.address);

    match gateway.search_asset(&ctx.catalog, device_id).await? {
        Some(asset) => {
            gateway
                .update_asset(asset.id, snapshot.name(), &fields)
                .await?;
            debug!("updated asset {} for device {device_id}", asset.id);
        }
        None => {
            let mut fields = fields;
            fields.insert(DEVICE_ID_FIELD.to_string(), device_id.to_string());
            let asset = gateway
                .create_asset(&ctx.catalog, snapshot.name(), &fields)
                .await?;
            debug!("created asset {} for device {device_id}", asset.id);
        }
    }

    Ok(SyncDisposition::Synced)
}

/// Custom-field payload for a snapshot: only populated fields enter the
/// map, so an empty snapshot field never clears a remote value.
pub fn snapshot_fields(snapshot: &DeviceSnapshot, address: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    let mut put = |name: &str, value: &Option<String>| {
        if let Some(v) = value.as_deref() {
            if !v.is_empty() {
                fields.insert(name.to_string(), v.to_string());
            }
        }
    };
    put("Manufacturer", &snapshot.manufacturer);
    put("Model", &snapshot.model);
    put("SerialNumber", &snapshot.serial_number);
    put("SoftwareVersion", &snapshot.sw_version);
    put("HardwareVersion", &snapshot.hw_version);
    put("ConfigUrl", &snapshot.config_url);
    put("MacAddress", &snapshot.mac_address);
    put(AREA_FIELD, &snapshot.area);
    if !address.is_empty() {
        fields.insert(ADDRESS_FIELD.to_string(), address.to_string());
    }
    fields
}

/// Mark the asset of a removed device as deleted.
///
/// Returns whether an asset was found and retired. Absence is normal
/// (the device may never have synced) and is not an error.
pub async fn retire_device_asset(
    gateway: &dyn Gateway,
    ctx: &SyncContext,
    device_id: &str,
) -> Result<bool, BridgeError> {
    let Some(asset) = gateway.search_asset(&ctx.catalog, device_id).await? else {
        debug!("no asset to retire for removed device {device_id}");
        return Ok(false);
    };
    gateway.retire_asset(asset.id).await?;
    info!("retired asset {} for removed device {device_id}", asset.id);
    Ok(true)
}

/// Retire catalog assets whose dedup key no longer names a physical
/// inventory device. Returns the number retired.
///
/// Batch-surface semantics: every per-asset failure is logged and
/// skipped, nothing propagates.
pub async fn cleanup_orphaned_assets(
    gateway: &dyn Gateway,
    inventory: &dyn Inventory,
    ctx: &SyncContext,
) -> u32 {
    let valid: HashSet<String> = inventory
        .list_devices()
        .await
        .into_iter()
        .filter(DeviceSnapshot::is_physical)
        .map(|d| d.id)
        .collect();

    let assets = match gateway.list_assets(&ctx.catalog).await {
        Ok(assets) => assets,
        Err(err) => {
            warn!("asset cleanup skipped, listing failed: {err}");
            return 0;
        }
    };

    let mut retired = 0;
    for asset in assets {
        let device_id = match gateway.asset_device_id(asset.id).await {
            Ok(Some(id)) => id,
            // Assets without a dedup key were not created by us.
            Ok(None) => continue,
            Err(err) => {
                warn!("cleanup: cannot read asset {}: {err}", asset.id);
                continue;
            }
        };
        if valid.contains(&device_id) {
            continue;
        }
        match gateway.retire_asset(asset.id).await {
            Ok(()) => {
                info!(
                    "retired orphaned asset {} (device {device_id} gone or non-physical)",
                    asset.id
                );
                retired += 1;
            }
            Err(err) => warn!("cleanup: failed to retire asset {}: {err}", asset.id),
        }
    }
    retired
}
