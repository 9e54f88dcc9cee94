//! Ticket deduplication: search-then-comment-or-create.
//!
//! The invariant this module maintains is "at most one open ticket per
//! device": before creating a ticket it searches the queue for an open
//! one carrying the same device id in the dedup field, and appends a
//! comment to it instead of creating a second one. The remote system
//! offers no uniqueness guarantee of its own, so the caller must hold
//! the device's lock across the whole call (see the coordinator).

use crate::config::SyncContext;
use crate::gateway::{FieldMap, Gateway};
use crate::inventory::Inventory;
use crate::query::{ADDRESS_FIELD, AREA_FIELD, DEVICE_ID_FIELD};
use rtbridge_common::{BridgeError, TicketAction};
use tracing::{debug, warn};

/// Find an open ticket for `device_id` and comment on it, or create a
/// new one. Returns the ticket id and what was done.
///
/// An empty `device_id` disables deduplication entirely: no search is
/// issued, the ticket is created without a dedup field, and no linking
/// is attempted. Any gateway failure propagates to the caller; nothing
/// is retried or rolled back.
pub async fn ensure_ticket(
    gateway: &dyn Gateway,
    inventory: &dyn Inventory,
    ctx: &SyncContext,
    device_id: &str,
    subject: &str,
    text: &str,
) -> Result<(u64, TicketAction), BridgeError> {
    if device_id.is_empty() {
        let content = build_content(text, None, &ctx.address);
        let mut fields = FieldMap::new();
        if !ctx.address.is_empty() {
            fields.insert(ADDRESS_FIELD.to_string(), ctx.address.clone());
        }
        let ticket = gateway
            .create_ticket(&ctx.queue, subject, &content, &fields)
            .await?;
        debug!("created ticket {} without device identity", ticket.id);
        return Ok((ticket.id, TicketAction::Created));
    }

    let mut open = gateway.search_tickets(&ctx.queue, device_id).await?;
    // Remote ordering is unspecified; pick the oldest ticket id so the
    // choice is deterministic across runs.
    open.sort_by_key(|t| t.id);

    if let Some(existing) = open.first() {
        gateway.add_comment(existing.id, text).await?;
        debug!("commented on open ticket {} for {device_id}", existing.id);
        return Ok((existing.id, TicketAction::Commented));
    }

    let area = inventory
        .get_device(device_id)
        .await
        .and_then(|snap| snap.area)
        .unwrap_or_default();

    let content = build_content(text, Some(&area), &ctx.address);
    let mut fields = FieldMap::new();
    fields.insert(DEVICE_ID_FIELD.to_string(), device_id.to_string());
    if !area.is_empty() {
        fields.insert(AREA_FIELD.to_string(), area);
    }
    if !ctx.address.is_empty() {
        fields.insert(ADDRESS_FIELD.to_string(), ctx.address.clone());
    }

    let ticket = gateway
        .create_ticket(&ctx.queue, subject, &content, &fields)
        .await?;
    debug!("created ticket {} for {device_id}", ticket.id);

    link_to_asset(gateway, ctx, ticket.id, device_id).await;

    Ok((ticket.id, TicketAction::Created))
}

/// Attach a freshly created ticket to the device's asset record.
///
/// Best-effort by design: a commented ticket is assumed to be linked
/// already from its creation, and a link failure never undoes the
/// ticket, it is only logged.
async fn link_to_asset(gateway: &dyn Gateway, ctx: &SyncContext, ticket_id: u64, device_id: &str) {
    let asset = match gateway.search_asset(&ctx.catalog, device_id).await {
        Ok(Some(asset)) => asset,
        Ok(None) => {
            warn!("no asset for device {device_id}; ticket {ticket_id} left unlinked");
            return;
        }
        Err(err) => {
            warn!("asset lookup for {device_id} failed: {err}; ticket {ticket_id} left unlinked");
            return;
        }
    };
    match gateway.link_ticket_to_asset(ticket_id, asset.id).await {
        Ok(()) => debug!("linked ticket {ticket_id} to asset {}", asset.id),
        Err(err) => warn!("failed to link ticket {ticket_id} to asset {}: {err}", asset.id),
    }
}

/// Ticket body: the caller's text, plus a trailing location block when
/// the site address or the device's area is known.
fn build_content(text: &str, area: Option<&str>, address: &str) -> String {
    let area = area.unwrap_or_default();
    if area.is_empty() && address.is_empty() {
        return text.to_string();
    }
    let mut parts = vec![text.to_string(), String::new()];
    if !address.is_empty() {
        parts.push(format!("Location: {address}"));
    }
    if !area.is_empty() {
        parts.push(format!("Area: {area}"));
    }
    parts.join("\n")
}
