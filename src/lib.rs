//! footfall — passive BLE presence scanner.
//!
//! Opens bounded radio-listening windows on a fixed period, fingerprints
//! every advertisement into a privacy-robust identity digest, suppresses
//! digests seen within a sliding memory horizon, classifies the survivors
//! as phone / not-phone, and appends qualifying sightings to a SQLite
//! store that the reporting tools read independently.

pub mod cache;
pub mod classify;
pub mod db;
pub mod fingerprint;
pub mod ignore;
pub mod models;
pub mod radio;
pub mod scanner;
pub mod settings;
pub mod utils;
