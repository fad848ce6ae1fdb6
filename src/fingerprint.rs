//! Content-hash device identity.
//!
//! BLE devices rotate their hardware address for privacy, so the address is
//! useless as a dedup key. Instead we hash the advertisement fields that
//! tend to stay stable across rotations. The digest is deliberately weak:
//! sparse advertisements collide across distinct devices, and a device that
//! changes its advertised services drifts to a new digest. Both are
//! accepted; the memory horizon bounds the damage either way.

use sha2::{Digest, Sha256};

use crate::models::Advertisement;

/// Token contributed by an absent optional field. Fixed so that
/// "no name" hashes identically on every sighting.
const ABSENT: &str = "";

/// Derive the identity digest for an advertisement.
///
/// Pure and deterministic: equal canonical fields always yield an equal
/// digest. Returns 32 lowercase hex chars (a Sha256 truncated to 128 bits;
/// collision-tolerant content hashing, not cryptography).
pub fn fingerprint(adv: &Advertisement) -> String {
    let mut services: Vec<&str> = adv.service_uuids.iter().map(String::as_str).collect();
    services.sort_unstable();

    let canonical = format!(
        "{}|{}|{}|{}|{}",
        adv.local_name.as_deref().unwrap_or(ABSENT),
        adv.manufacturer_hex().unwrap_or_default(),
        services.join(","),
        adv.address_kind.as_str(),
        adv.is_connectable,
    );

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..16])
}
