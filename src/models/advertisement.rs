use serde::{Deserialize, Serialize};

/// Whether the advertiser used its fixed public address or a
/// privacy-randomized one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AddressKind {
    Public,
    Random,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Public => "public",
            AddressKind::Random => "random",
        }
    }
}

/// One decoded BLE advertisement, as delivered by the radio driver.
///
/// Every field that the protocol allows a device to omit is an `Option`;
/// the fingerprint, classifier and store all map an absent field to the
/// same empty token so identity stays stable across sightings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advertisement {
    /// Lowercase hex address as observed. Randomized per session by many
    /// devices, so never used as identity on its own.
    pub address: String,
    pub address_kind: AddressKind,
    pub is_connectable: bool,
    pub local_name: Option<String>,
    /// Advertised transmit power in dBm.
    pub tx_power: Option<i16>,
    /// Service UUIDs, set semantics. Sorted before hashing so advertising
    /// order never changes the identity digest.
    pub service_uuids: Vec<String>,
    /// Vendor payload with the little-endian company identifier in the
    /// first two bytes, exactly as it appeared on the air.
    pub manufacturer_data: Option<Vec<u8>>,
    /// Received signal strength in dBm. 0 when the platform withholds it.
    pub rssi: i16,
    /// Opaque per-session identifier assigned by the driver. Debug only;
    /// not stable across address rotations.
    pub source_id: String,
}

impl Advertisement {
    /// Manufacturer payload as lowercase hex, or `None` when absent.
    pub fn manufacturer_hex(&self) -> Option<String> {
        self.manufacturer_data.as_deref().map(hex::encode)
    }
}
