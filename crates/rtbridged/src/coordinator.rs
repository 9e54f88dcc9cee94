//! Trigger coordination across the three sync sources.
//!
//! One coordinator owns the gateway, the inventory, and the resolved
//! sync context, and exposes the three entry points: event-driven
//! single-device sync, the scheduled full pass, and the manual command
//! surface. The search-then-act protocol of the engine is not atomic,
//! so every per-device operation runs under that device's in-process
//! lock; two overlapping triggers for the same id serialize instead of
//! racing a duplicate create.

use crate::asset_sync;
use crate::config::SyncContext;
use crate::gateway::Gateway;
use crate::inventory::Inventory;
use crate::ticket_dedup;
use rtbridge_common::{
    BridgeError, InventoryAction, InventoryEvent, SyncDisposition, SyncOutcome, TicketOutcome,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// One async mutex per device id, created on first use and kept for the
/// daemon's lifetime (bounded by inventory size).
#[derive(Default)]
pub struct DeviceLocks {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeviceLocks {
    /// Take the lock for `device_id`, waiting if another reconciliation
    /// for the same device is in flight.
    pub async fn acquire(&self, device_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().expect("device lock registry poisoned");
            map.entry(device_id.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct Coordinator {
    gateway: Arc<dyn Gateway>,
    inventory: Arc<dyn Inventory>,
    ctx: Arc<SyncContext>,
    locks: DeviceLocks,
}

impl Coordinator {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        inventory: Arc<dyn Inventory>,
        ctx: SyncContext,
    ) -> Self {
        Self {
            gateway,
            inventory,
            ctx: Arc::new(ctx),
            locks: DeviceLocks::default(),
        }
    }

    /// Single-action command surface: find-or-create a ticket for the
    /// device. Typed failures propagate to the caller; there is no
    /// partial result.
    pub async fn create_or_update_ticket(
        &self,
        device_id: &str,
        subject: &str,
        text: &str,
    ) -> Result<TicketOutcome, BridgeError> {
        // An empty id carries no identity to serialize on.
        let _guard = if device_id.is_empty() {
            None
        } else {
            Some(self.locks.acquire(device_id).await)
        };

        let (ticket_id, action) = ticket_dedup::ensure_ticket(
            self.gateway.as_ref(),
            self.inventory.as_ref(),
            &self.ctx,
            device_id,
            subject,
            text,
        )
        .await?;

        Ok(TicketOutcome {
            ticket_id,
            ticket_url: self.gateway.ticket_url(ticket_id),
            action,
        })
    }

    /// Batch command surface: sync one device when an id is given,
    /// otherwise the whole inventory. Never fails at the call level;
    /// failures only show up in the counters.
    pub async fn sync_assets(&self, device_id: Option<&str>) -> SyncOutcome {
        match device_id {
            Some(id) => SyncOutcome::single(self.sync_one(id).await),
            None => self.sync_all().await,
        }
    }

    /// Full-catalog pass: every device sequentially, then orphan
    /// cleanup. A single device's failure never aborts the batch.
    async fn sync_all(&self) -> SyncOutcome {
        let mut outcome = SyncOutcome::default();
        let devices = self.inventory.list_devices().await;
        debug!("full sync pass over {} devices", devices.len());

        for device in &devices {
            outcome.record(self.sync_one(&device.id).await);
        }

        outcome.retired =
            asset_sync::cleanup_orphaned_assets(self.gateway.as_ref(), self.inventory.as_ref(), &self.ctx)
                .await;

        info!(
            "asset sync complete: {} synced, {} failed, {} skipped, {} retired",
            outcome.synced, outcome.failed, outcome.skipped, outcome.retired
        );
        outcome
    }

    /// Reconcile one device under its lock, converting the error channel
    /// into the batch disposition (None = failed).
    async fn sync_one(&self, device_id: &str) -> Option<SyncDisposition> {
        let _guard = self.locks.acquire(device_id).await;
        match asset_sync::sync_device(
            self.gateway.as_ref(),
            self.inventory.as_ref(),
            &self.ctx,
            device_id,
        )
        .await
        {
            Ok(disposition) => Some(disposition),
            Err(err) => {
                error!("failed to sync device {device_id}: {err}");
                None
            }
        }
    }

    /// Event entry point. Errors are logged and swallowed so the
    /// notification pipeline is never destabilized by a remote failure.
    pub async fn handle_event(&self, event: InventoryEvent) {
        match event.action {
            InventoryAction::Added | InventoryAction::Updated => {
                if self.sync_one(&event.device_id).await.is_some() {
                    debug!("synced device {} after {:?} event", event.device_id, event.action);
                }
            }
            InventoryAction::Removed => {
                let _guard = self.locks.acquire(&event.device_id).await;
                if let Err(err) = asset_sync::retire_device_asset(
                    self.gateway.as_ref(),
                    &self.ctx,
                    &event.device_id,
                )
                .await
                {
                    error!("failed to retire asset for {}: {err}", event.device_id);
                }
            }
        }
    }

    /// Subscribe to the inventory stream; each event is handled in its
    /// own task so a slow remote call never blocks event delivery.
    pub fn spawn_event_loop(
        self: &Arc<Self>,
        mut events: broadcast::Receiver<InventoryEvent>,
    ) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let coordinator = Arc::clone(&coordinator);
                        tokio::spawn(async move { coordinator.handle_event(event).await });
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // The next scheduled pass repairs whatever we missed.
                        warn!("inventory event stream lagged, {missed} events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("inventory event stream closed, stopping event loop");
                        break;
                    }
                }
            }
        })
    }

    /// Periodic full pass every `interval_hours`.
    pub fn spawn_scheduled_sync(self: &Arc<Self>, interval_hours: u64) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            let period = Duration::from_secs(interval_hours * 3600);
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; the startup pass is not
            // wanted here, the event stream covers fresh changes.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                info!("starting scheduled asset sync");
                coordinator.sync_all().await;
            }
        })
    }
}
