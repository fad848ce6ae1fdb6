use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AddressKind, Advertisement};

/// One classified, persisted observation of a device.
///
/// Immutable once written. The store enforces `UNIQUE (seen_at, digest)`,
/// so re-inserting the same sighting is a benign no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sighting {
    pub seen_at: DateTime<Utc>,
    pub digest: String,
    /// Address exactly as observed, not normalized.
    pub address: String,
    pub address_kind: AddressKind,
    pub is_connectable: bool,
    pub local_name: Option<String>,
    pub tx_power: Option<i16>,
    /// Comma-joined service UUIDs, empty string when none were advertised.
    pub service_uuids: String,
    /// Hex manufacturer payload, `None` when absent.
    pub manufacturer_data: Option<String>,
    pub rssi: i16,
}

impl Sighting {
    pub fn from_advertisement(
        seen_at: DateTime<Utc>,
        digest: String,
        adv: &Advertisement,
    ) -> Self {
        Self {
            seen_at,
            digest,
            address: adv.address.clone(),
            address_kind: adv.address_kind,
            is_connectable: adv.is_connectable,
            local_name: adv.local_name.clone(),
            tx_power: adv.tx_power,
            service_uuids: adv.service_uuids.join(","),
            manufacturer_data: adv.manufacturer_hex(),
            rssi: adv.rssi,
        }
    }
}
