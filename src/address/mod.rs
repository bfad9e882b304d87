//! Bitcoin address extraction
//!
//! Candidate tokens are located with regular expressions and then validated
//! with the `bitcoin` crate's address parser, so random base58-looking text
//! and onion labels are dropped. Legacy P2PKH (`1...`) and P2SH (`3...`)
//! tokens go through base58check, segwit tokens (`bc1...`) through bech32 or
//! bech32m.

use bitcoin::address::NetworkUnchecked;
use bitcoin::{Address, Network};
use regex::Regex;
use std::collections::BTreeSet;

/// Legacy tokens: 26 to 35 characters of the base58 alphabet
const LEGACY_PATTERN: &str = r"\b[13][1-9A-HJ-NP-Za-km-z]{25,34}\b";

/// Segwit tokens: HRP `bc`, 14 to 74 characters in total
const SEGWIT_PATTERN: &str = r"(?i)\bbc1[02-9ac-hj-np-z]{11,71}\b";

/// Scans text for valid-format Bitcoin addresses
///
/// Holds the compiled patterns, so build it once and share it between
/// workers. Extraction is pure: the same text always yields the same set.
#[derive(Debug, Clone)]
pub struct AddressExtractor {
    legacy: Regex,
    segwit: Regex,
}

impl AddressExtractor {
    pub fn new() -> Self {
        Self {
            legacy: Regex::new(LEGACY_PATTERN).expect("legacy address pattern compiles"),
            segwit: Regex::new(SEGWIT_PATTERN).expect("segwit address pattern compiles"),
        }
    }

    /// Returns every valid address token in `text`
    ///
    /// Segwit addresses are reported lowercase. Text without valid tokens
    /// yields an empty set.
    ///
    /// # Examples
    ///
    /// ```
    /// use onion_sieve::address::AddressExtractor;
    ///
    /// let extractor = AddressExtractor::new();
    /// let found = extractor.extract("donate: 1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa");
    /// assert!(found.contains("1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa"));
    /// ```
    pub fn extract(&self, text: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();

        for candidate in self.legacy.find_iter(text) {
            if is_mainnet_address(candidate.as_str()) {
                found.insert(candidate.as_str().to_string());
            }
        }

        for candidate in self.segwit.find_iter(text) {
            if is_mainnet_address(candidate.as_str()) {
                found.insert(candidate.as_str().to_ascii_lowercase());
            }
        }

        found
    }
}

impl Default for AddressExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Checksum and network check for a single candidate token
fn is_mainnet_address(token: &str) -> bool {
    token
        .parse::<Address<NetworkUnchecked>>()
        .ok()
        .and_then(|address| address.require_network(Network::Bitcoin).ok())
        .is_some()
}
