//! Link-layer (MAC) addresses
//!
//! Text form is always what ifconfig(8) prints: six lowercase two-digit hex
//! octets separated by colons.

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Number of octets in an Ethernet address
pub const LLADDR_LEN: usize = 6;

/// Length of the canonical text form ("aa:bb:cc:dd:ee:ff")
pub const LLADDR_TEXT_LEN: usize = 17;

/// A six-byte link address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkAddress([u8; LLADDR_LEN]);

impl LinkAddress {
    pub fn new(octets: [u8; LLADDR_LEN]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; LLADDR_LEN] {
        self.0
    }
}

impl FromStr for LinkAddress {
    type Err = Error;

    /// Parse colon separated hex octets
    ///
    /// Each octet may be one or two hex digits in either case, as link_addr(3)
    /// allows, but there must be exactly six of them.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != LLADDR_LEN {
            return Err(Error::InvalidArgument(format!(
                "Invalid MAC address format: {}",
                s
            )));
        }

        let mut octets = [0u8; LLADDR_LEN];
        for (octet, part) in octets.iter_mut().zip(&parts) {
            if part.is_empty() || part.len() > 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::InvalidArgument(format!(
                    "Invalid MAC address octet \"{}\" in {}",
                    part, s
                )));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|e| Error::InvalidArgument(format!("Invalid MAC address: {}", e)))?;
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for LinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_canonical() {
        let mac: LinkAddress = "02:00:00:00:00:01".parse().unwrap();
        assert_eq!(mac.octets(), [2, 0, 0, 0, 0, 1]);
        assert_eq!(mac.to_string(), "02:00:00:00:00:01");
    }

    // single digit octets are accepted on input as link_addr(3) does;
    // output is always two digits
    #[test]
    fn test_accepts_single_digit_octets_like_link_addr() {
        let mac: LinkAddress = "2:A:0b:FF:0:1".parse().unwrap();
        assert_eq!(mac.to_string(), "02:0a:0b:ff:00:01");
    }

    #[test]
    fn test_rejects_wrong_token_count() {
        assert!("02:00:00:00:00".parse::<LinkAddress>().is_err());
        assert!("02:00:00:00:00:01:02".parse::<LinkAddress>().is_err());
        assert!("".parse::<LinkAddress>().is_err());
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!("02:00:00:00:00:0g".parse::<LinkAddress>().is_err());
        assert!("02:00:00:00:00:+1".parse::<LinkAddress>().is_err());
        assert!("02:00:00:00::01".parse::<LinkAddress>().is_err());
        assert!("020:00:00:00:00:01".parse::<LinkAddress>().is_err());
    }

    proptest! {
        #[test]
        fn prop_text_round_trip(octets in any::<[u8; 6]>()) {
            let text = LinkAddress::new(octets).to_string();
            prop_assert_eq!(text.len(), LLADDR_TEXT_LEN);
            let parsed: LinkAddress = text.parse().unwrap();
            prop_assert_eq!(parsed.octets(), octets);
            prop_assert_eq!(parsed.to_string(), text);
        }

        #[test]
        fn prop_uppercase_input_normalizes(octets in any::<[u8; 6]>()) {
            let upper = LinkAddress::new(octets).to_string().to_uppercase();
            let parsed: LinkAddress = upper.parse().unwrap();
            prop_assert_eq!(parsed.to_string(), upper.to_lowercase());
        }
    }
}
