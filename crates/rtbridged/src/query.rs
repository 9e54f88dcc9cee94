//! TicketSQL query construction.
//!
//! RT's search sub-language quotes string values with double quotes, so
//! every value interpolated into a query is escaped here first. Device
//! ids and free text both come from outside and must never be able to
//! break out of their quoted position.

/// Custom field holding the inventory device id on tickets and assets.
pub const DEVICE_ID_FIELD: &str = "DeviceId";

/// Custom field holding the device's area name.
pub const AREA_FIELD: &str = "Area";

/// Custom field holding the configured street address.
pub const ADDRESS_FIELD: &str = "Address";

/// Ticket states still considered active for deduplication.
pub const OPEN_STATUSES: &[&str] = &["new", "open", "stalled"];

/// Escape a value for interpolation into a TicketSQL string literal.
///
/// Backslashes first, then double quotes, so an input backslash cannot
/// resurrect a quote we already escaped.
pub fn escape_ticketsql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Query selecting open tickets in `queue` whose dedup field equals
/// `device_id`.
pub fn open_ticket_query(queue: &str, device_id: &str) -> String {
    let statuses = OPEN_STATUSES
        .iter()
        .map(|s| format!("Status=\"{s}\""))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!(
        "Queue=\"{}\" AND ({statuses}) AND CF.{{{DEVICE_ID_FIELD}}}=\"{}\"",
        escape_ticketsql(queue),
        escape_ticketsql(device_id),
    )
}

/// Query selecting the asset in `catalog` whose dedup field equals
/// `device_id`.
pub fn asset_query(catalog: &str, device_id: &str) -> String {
    format!(
        "Catalog=\"{}\" AND CF.{{{DEVICE_ID_FIELD}}}=\"{}\"",
        escape_ticketsql(catalog),
        escape_ticketsql(device_id),
    )
}

/// Query selecting every non-retired asset in `catalog`.
pub fn active_assets_query(catalog: &str) -> String {
    format!(
        "Catalog=\"{}\" AND Status!=\"deleted\"",
        escape_ticketsql(catalog),
    )
}
