//! Device inventory: trait plus the in-process registry implementation.
//!
//! The registry is the daemon's source of truth for devices. It is
//! mutated through the HTTP surface, persisted to a JSON file so a
//! restart does not lose the catalog, and publishes every mutation on a
//! broadcast channel that the trigger coordinator subscribes to.

use async_trait::async_trait;
use rtbridge_common::{DeviceSnapshot, InventoryAction, InventoryEvent};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

/// Capacity of the event channel; a lagging subscriber drops the oldest
/// events, which a later scheduled pass repairs anyway.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Read access to the device inventory, as the engine sees it.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Fresh snapshot of one device, if it exists.
    async fn get_device(&self, id: &str) -> Option<DeviceSnapshot>;

    /// Fresh snapshots of every device.
    async fn list_devices(&self) -> Vec<DeviceSnapshot>;
}

pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, DeviceSnapshot>>,
    events: broadcast::Sender<InventoryEvent>,
    path: Option<PathBuf>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            devices: RwLock::new(HashMap::new()),
            events,
            path: None,
        }
    }

    /// Registry backed by a JSON file. A missing file starts empty; a
    /// corrupt file is an error, not a silent wipe.
    pub fn with_persistence(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let mut registry = Self::new();
        if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let devices: Vec<DeviceSnapshot> = serde_json::from_str(&raw)?;
            debug!("loaded {} devices from {:?}", devices.len(), path);
            registry.devices = RwLock::new(
                devices.into_iter().map(|d| (d.id.clone(), d)).collect(),
            );
        }
        registry.path = Some(path);
        Ok(registry)
    }

    /// New receiver on the mutation stream.
    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.events.subscribe()
    }

    /// Insert or replace a device; emits `Added` or `Updated`.
    pub async fn upsert(&self, snapshot: DeviceSnapshot) -> InventoryAction {
        let action = {
            let mut devices = self.devices.write().await;
            let action = if devices.contains_key(&snapshot.id) {
                InventoryAction::Updated
            } else {
                InventoryAction::Added
            };
            devices.insert(snapshot.id.clone(), snapshot.clone());
            action
        };
        self.persist().await;
        self.emit(action, &snapshot.id);
        action
    }

    /// Remove a device; emits `Removed` if it was present.
    pub async fn remove(&self, device_id: &str) -> bool {
        let removed = self.devices.write().await.remove(device_id).is_some();
        if removed {
            self.persist().await;
            self.emit(InventoryAction::Removed, device_id);
        }
        removed
    }

    fn emit(&self, action: InventoryAction, device_id: &str) {
        // Nobody subscribed yet is fine; send only fails then.
        let _ = self.events.send(InventoryEvent {
            action,
            device_id: device_id.to_string(),
        });
    }

    async fn persist(&self) {
        let Some(path) = &self.path else { return };
        let mut devices: Vec<DeviceSnapshot> =
            self.devices.read().await.values().cloned().collect();
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        if let Err(err) = write_registry_file(path, &devices) {
            warn!("failed to persist device registry to {:?}: {err}", path);
        }
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn write_registry_file(path: &Path, devices: &[DeviceSnapshot]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(devices)?)?;
    Ok(())
}

#[async_trait]
impl Inventory for DeviceRegistry {
    async fn get_device(&self, id: &str) -> Option<DeviceSnapshot> {
        self.devices.read().await.get(id).cloned()
    }

    async fn list_devices(&self) -> Vec<DeviceSnapshot> {
        let mut devices: Vec<DeviceSnapshot> =
            self.devices.read().await.values().cloned().collect();
        // Stable enumeration order for logs and batch summaries.
        devices.sort_by(|a, b| a.id.cmp(&b.id));
        devices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_upsert_distinguishes_add_and_update() {
        let registry = DeviceRegistry::new();
        let snap = DeviceSnapshot::bare("dev-1");
        assert_eq!(registry.upsert(snap.clone()).await, InventoryAction::Added);
        assert_eq!(registry.upsert(snap).await, InventoryAction::Updated);
    }

    #[tokio::test]
    async fn test_remove_emits_only_when_present() {
        let registry = DeviceRegistry::new();
        registry.upsert(DeviceSnapshot::bare("dev-1")).await;

        let mut rx = registry.subscribe();
        assert!(registry.remove("dev-1").await);
        assert!(!registry.remove("dev-1").await);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.action, InventoryAction::Removed);
        assert_eq!(event.device_id, "dev-1");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_persistence_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");

        let registry = DeviceRegistry::with_persistence(&path).unwrap();
        let mut snap = DeviceSnapshot::bare("dev-1");
        snap.display_name = Some("Boiler".to_string());
        registry.upsert(snap).await;
        registry.upsert(DeviceSnapshot::bare("dev-2")).await;

        let reloaded = DeviceRegistry::with_persistence(&path).unwrap();
        let devices = reloaded.list_devices().await;
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].id, "dev-1");
        assert_eq!(devices[0].display_name.as_deref(), Some("Boiler"));
    }

    #[tokio::test]
    async fn test_events_include_action() {
        let registry = DeviceRegistry::new();
        let mut rx = registry.subscribe();

        registry.upsert(DeviceSnapshot::bare("dev-1")).await;
        registry.upsert(DeviceSnapshot::bare("dev-1")).await;

        assert_eq!(rx.recv().await.unwrap().action, InventoryAction::Added);
        assert_eq!(rx.recv().await.unwrap().action, InventoryAction::Updated);
    }
}
