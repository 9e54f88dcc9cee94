//! Inventory device model.

use serde::{Deserialize, Serialize};

/// Immutable view of one inventory device at sync time.
///
/// Produced fresh from the registry on every sync call; never cached
/// across calls. Only `id` is guaranteed, everything else is whatever
/// the inventory happened to know about the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Opaque stable identifier, unique within the inventory.
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub sw_version: Option<String>,
    #[serde(default)]
    pub hw_version: Option<String>,
    #[serde(default)]
    pub config_url: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    /// Set for non-physical entries (services, integration stubs).
    /// Such entries are skipped by asset reconciliation.
    #[serde(default)]
    pub entry_type: Option<String>,
}

impl DeviceSnapshot {
    /// A snapshot with only the id populated.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            manufacturer: None,
            model: None,
            serial_number: None,
            sw_version: None,
            hw_version: None,
            config_url: None,
            mac_address: None,
            area: None,
            entry_type: None,
        }
    }

    /// Human-readable name: user/inventory assigned name, else the raw id.
    pub fn name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(n) if !n.is_empty() => n,
            _ => &self.id,
        }
    }

    /// True for real hardware; false for services, add-ons and other
    /// synthetic registry entries.
    pub fn is_physical(&self) -> bool {
        self.entry_type.as_deref().map_or(true, str::is_empty)
    }
}

/// What happened to a device in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryAction {
    Added,
    Updated,
    Removed,
}

/// One entry on the inventory notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub action: InventoryAction,
    pub device_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_falls_back_to_id() {
        let mut snap = DeviceSnapshot::bare("dev-1");
        assert_eq!(snap.name(), "dev-1");

        snap.display_name = Some(String::new());
        assert_eq!(snap.name(), "dev-1");

        snap.display_name = Some("Kitchen light".to_string());
        assert_eq!(snap.name(), "Kitchen light");
    }

    #[test]
    fn test_is_physical() {
        let mut snap = DeviceSnapshot::bare("dev-1");
        assert!(snap.is_physical());

        snap.entry_type = Some("service".to_string());
        assert!(!snap.is_physical());
    }
}
