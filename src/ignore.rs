//! Static ignore list of hardware addresses.
//!
//! Loaded once at startup from a plain text file, one address per line,
//! `#` comments allowed. Addresses may be colon-hex, dash-hex or bare hex
//! in any case; everything is normalized before comparison.
//!
//! This only suppresses devices that advertise with a public address. A
//! device using randomized addresses never matches a static list; the
//! memory cache is what keeps those from being recorded repeatedly.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use log::{info, warn};

#[derive(Debug, Default)]
pub struct IgnoreList {
    addresses: HashSet<String>,
}

/// Strip separators and lowercase, so `AA:BB:CC:DD:EE:FF`,
/// `aa-bb-cc-dd-ee-ff` and `aabbccddeeff` all compare equal.
fn normalize(address: &str) -> String {
    address
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

impl IgnoreList {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the list from `path`. A missing or unreadable file is not an
    /// error: the filter degrades to ignoring nothing.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    "ignore list {} not readable ({err}); ignoring nothing",
                    path.display()
                );
                return Self::empty();
            }
        };

        let mut addresses = HashSet::new();
        for line in contents.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let normalized = normalize(line);
            if normalized.is_empty() {
                warn!("skipping malformed ignore list entry '{line}'");
                continue;
            }
            addresses.insert(normalized);
        }

        info!(
            "loaded {} ignored address(es) from {}",
            addresses.len(),
            path.display()
        );
        Self { addresses }
    }

    pub fn is_ignored(&self, address: &str) -> bool {
        if self.addresses.is_empty() {
            return false;
        }
        self.addresses.contains(&normalize(address))
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_list(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("footfall-ignore-{}.txt", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_ignores_nothing() {
        let list = IgnoreList::load(Path::new("/nonexistent/ignore.txt"));
        assert!(list.is_empty());
        assert!(!list.is_ignored("aa:bb:cc:dd:ee:ff"));
    }

    #[test]
    fn formats_and_case_are_equivalent() {
        let path = temp_list("AA:BB:CC:DD:EE:FF\n");
        let list = IgnoreList::load(&path);
        assert!(list.is_ignored("aa:bb:cc:dd:ee:ff"));
        assert!(list.is_ignored("AA-BB-CC-DD-EE-FF"));
        assert!(list.is_ignored("aabbccddeeff"));
        assert!(!list.is_ignored("aa:bb:cc:dd:ee:00"));
        fs::remove_file(path).ok();
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let path = temp_list("# front desk printer\n\n11-22-33-44-55-66  # lobby beacon\n");
        let list = IgnoreList::load(&path);
        assert_eq!(list.len(), 1);
        assert!(list.is_ignored("112233445566"));
        fs::remove_file(path).ok();
    }
}
