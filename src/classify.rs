//! Phone-or-not heuristic.
//!
//! Rules run as an ordered short-circuit chain; the first match fixes the
//! reported reason. The ordering is part of the contract, not an
//! optimization: an advertisement matching several rules must always
//! report the same reason.
//!
//! This is a heuristic. Phones that advertise none of these signals are
//! missed, and a speaker named "pixel stand" is a false positive. Both are
//! accepted.

use crate::models::Advertisement;

/// Bluetooth SIG company identifier assigned to Apple.
pub const APPLE_COMPANY_ID: u16 = 0x004c;

/// Apple Notification Center Service, advertised by iOS devices.
pub const ANCS_SERVICE_UUID: &str = "7905f431-b5ce-4e99-a40f-4b1e122d00d0";

/// Lowercase substrings of local names that indicate a handset.
pub const PHONE_NAME_PATTERNS: &[&str] = &[
    "iphone", "pixel", "galaxy", "oneplus", "xiaomi", "redmi", "huawei", "motorola",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchReason {
    /// Manufacturer payload carries Apple's company identifier.
    VendorId,
    /// Service UUIDs include ANCS.
    AncsService,
    /// Local name contains a known handset substring.
    NamePattern,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::VendorId => "vendor-id",
            MatchReason::AncsService => "ancs-service",
            MatchReason::NamePattern => "name-pattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Phone(MatchReason),
    NotPhone,
}

impl Classification {
    pub fn is_phone(&self) -> bool {
        matches!(self, Classification::Phone(_))
    }
}

/// Decide whether an advertisement likely came from a phone.
///
/// Never consults rssi, tx power or address kind.
pub fn classify(adv: &Advertisement) -> Classification {
    if matches_vendor_id(adv) {
        return Classification::Phone(MatchReason::VendorId);
    }
    if matches_ancs(adv) {
        return Classification::Phone(MatchReason::AncsService);
    }
    if matches_name_pattern(adv) {
        return Classification::Phone(MatchReason::NamePattern);
    }
    Classification::NotPhone
}

fn matches_vendor_id(adv: &Advertisement) -> bool {
    match adv.manufacturer_data.as_deref() {
        Some(payload) if payload.len() >= 2 => {
            u16::from_le_bytes([payload[0], payload[1]]) == APPLE_COMPANY_ID
        }
        _ => false,
    }
}

fn matches_ancs(adv: &Advertisement) -> bool {
    adv.service_uuids
        .iter()
        .any(|uuid| uuid.eq_ignore_ascii_case(ANCS_SERVICE_UUID))
}

fn matches_name_pattern(adv: &Advertisement) -> bool {
    let Some(name) = adv.local_name.as_deref() else {
        return false;
    };
    let name = name.to_lowercase();
    PHONE_NAME_PATTERNS.iter().any(|p| name.contains(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddressKind;

    fn advert() -> Advertisement {
        Advertisement {
            address: "aa:bb:cc:dd:ee:ff".into(),
            address_kind: AddressKind::Random,
            is_connectable: true,
            local_name: None,
            tx_power: None,
            service_uuids: Vec::new(),
            manufacturer_data: None,
            rssi: -55,
            source_id: "peer-1".into(),
        }
    }

    #[test]
    fn apple_vendor_id_is_phone() {
        let mut adv = advert();
        adv.manufacturer_data = Some(vec![0x4c, 0x00, 0x12, 0x02]);
        assert_eq!(classify(&adv), Classification::Phone(MatchReason::VendorId));
    }

    #[test]
    fn vendor_id_is_little_endian() {
        // 0x4c in the *second* byte is company 0x4c00, not Apple.
        let mut adv = advert();
        adv.manufacturer_data = Some(vec![0x00, 0x4c]);
        assert_eq!(classify(&adv), Classification::NotPhone);
    }

    #[test]
    fn short_payload_skips_vendor_rule() {
        let mut adv = advert();
        adv.manufacturer_data = Some(vec![0x4c]);
        assert_eq!(classify(&adv), Classification::NotPhone);
    }

    #[test]
    fn ancs_uuid_is_phone_case_insensitive() {
        let mut adv = advert();
        adv.service_uuids = vec![ANCS_SERVICE_UUID.to_uppercase()];
        assert_eq!(
            classify(&adv),
            Classification::Phone(MatchReason::AncsService)
        );
    }

    #[test]
    fn name_pattern_is_phone() {
        let mut adv = advert();
        adv.local_name = Some("Dana's Pixel 8".into());
        assert_eq!(
            classify(&adv),
            Classification::Phone(MatchReason::NamePattern)
        );
    }

    #[test]
    fn vendor_rule_wins_over_name_rule() {
        let mut adv = advert();
        adv.manufacturer_data = Some(vec![0x4c, 0x00]);
        adv.local_name = Some("iPhone".into());
        assert_eq!(classify(&adv), Classification::Phone(MatchReason::VendorId));
    }

    #[test]
    fn speaker_is_not_a_phone() {
        let mut adv = advert();
        adv.local_name = Some("Bob's Speaker".into());
        assert_eq!(classify(&adv), Classification::NotPhone);
    }

    #[test]
    fn strong_signal_alone_is_not_a_phone() {
        let mut adv = advert();
        adv.rssi = -20;
        adv.tx_power = Some(4);
        assert_eq!(classify(&adv), Classification::NotPhone);
    }
}
