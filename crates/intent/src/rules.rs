//! Field-level validation rules
//!
//! Each rule takes the raw document value and either returns the
//! normalized value or a message describing the violation.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

static DOTTED_QUAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$").expect("static regex")
});

static HOSTNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("static regex"));

/// Characters rejected in descriptions; they break NED markup downstream
pub const FORBIDDEN_DESCRIPTION_CHARS: [char; 5] = ['<', '>', '&', '"', '\''];

/// Maximum hostname length
pub const MAX_HOSTNAME_LEN: usize = 63;

/// Largest loopback interface number
pub const MAX_LOOPBACK_ID: i64 = 2_147_483_647;

/// Largest 4-byte AS number
pub const MAX_ASN: i64 = 4_294_967_295;

/// Parse a dotted quad: four decimal octets of 1-3 digits, each 0-255
pub fn dotted_quad(value: &str) -> Result<Ipv4Addr, String> {
    if !DOTTED_QUAD.is_match(value) {
        return Err(format!(
            "invalid IPv4 address: {value}. Expected four dot-separated octets"
        ));
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(value.split('.')) {
        let num: u16 = part
            .parse()
            .map_err(|_| format!("invalid IPv4 address: {value}"))?;
        *slot = u8::try_from(num)
            .map_err(|_| format!("invalid IPv4 address: {value}. Octets must be 0-255"))?;
    }

    Ok(Ipv4Addr::from(octets))
}

/// A dotted quad usable as an interface address
///
/// Rejects 0.0.0.0/8 and everything from 224.0.0.0 up (multicast and
/// reserved space).
pub fn host_address(value: &str) -> Result<Ipv4Addr, String> {
    let addr = dotted_quad(value)?;
    let first = addr.octets()[0];
    if first == 0 {
        return Err(format!(
            "IPv4 address {value} cannot start with 0 (reserved)"
        ));
    }
    if first >= 224 {
        return Err(format!("IPv4 address {value} is in reserved range (224+)"));
    }
    Ok(addr)
}

/// A contiguous dotted-decimal subnet mask, stored as its prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Netmask {
    prefix: u8,
}

impl Netmask {
    /// Build a mask from a prefix length (0-32)
    pub fn from_prefix(prefix: u8) -> Option<Self> {
        (prefix <= 32).then_some(Self { prefix })
    }

    /// Parse one of the 33 canonical masks, `0.0.0.0` through `255.255.255.255`
    pub fn parse(value: &str) -> Option<Self> {
        (0..=32u8)
            .map(|prefix| Self { prefix })
            .find(|mask| mask.to_addr().to_string() == value)
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix
    }

    pub fn to_addr(&self) -> Ipv4Addr {
        let bits = if self.prefix == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(self.prefix))
        };
        Ipv4Addr::from(bits)
    }
}

impl fmt::Display for Netmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_addr())
    }
}

impl From<Netmask> for String {
    fn from(mask: Netmask) -> Self {
        mask.to_string()
    }
}

impl TryFrom<String> for Netmask {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        netmask(&value)
    }
}

pub fn netmask(value: &str) -> Result<Netmask, String> {
    Netmask::parse(value).ok_or_else(|| {
        format!("Invalid subnet mask: {value}. Must be a valid dotted-decimal mask.")
    })
}

/// Hostname: 1-63 characters, alphanumerics, hyphens and underscores only
pub fn hostname(value: &str) -> Result<String, String> {
    if value.is_empty() {
        return Err("hostname cannot be empty".to_string());
    }
    if value.len() > MAX_HOSTNAME_LEN {
        return Err(format!(
            "hostname {value} exceeds {MAX_HOSTNAME_LEN} characters"
        ));
    }
    if !HOSTNAME.is_match(value) {
        return Err(format!(
            "Invalid hostname: {value}. Only alphanumeric, hyphens, underscores allowed."
        ));
    }
    Ok(value.to_string())
}

/// Free-text description with a length cap and no markup characters
pub fn description(value: &str, max_len: usize) -> Result<String, String> {
    let len = value.chars().count();
    if len > max_len {
        return Err(format!(
            "description is {len} characters, maximum is {max_len}"
        ));
    }
    if value.contains(FORBIDDEN_DESCRIPTION_CHARS) {
        return Err(format!(
            "Description contains invalid characters: {}",
            FORBIDDEN_DESCRIPTION_CHARS
                .iter()
                .map(char::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        ));
    }
    Ok(value.to_string())
}

/// Optional text bounded by a character count
pub fn bounded_text(value: &str, min_len: usize, max_len: usize) -> Result<String, String> {
    let len = value.chars().count();
    if len < min_len || len > max_len {
        return Err(format!(
            "must be between {min_len} and {max_len} characters, got {len}"
        ));
    }
    Ok(value.to_string())
}

pub fn loopback_id(value: i64) -> Result<u32, String> {
    if !(0..=MAX_LOOPBACK_ID).contains(&value) {
        return Err(format!(
            "loopback id {value} out of range 0..={MAX_LOOPBACK_ID}"
        ));
    }
    u32::try_from(value).map_err(|e| e.to_string())
}

pub fn asn(value: i64) -> Result<u32, String> {
    if !(1..=MAX_ASN).contains(&value) {
        return Err(format!("AS number {value} out of range 1..={MAX_ASN}"));
    }
    u32::try_from(value).map_err(|e| e.to_string())
}

/// Values appearing more than once, in first-seen order
pub fn duplicates<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut dups = Vec::new();
    for value in values {
        if !seen.insert(value) && reported.insert(value) {
            dups.push(value.to_string());
        }
    }
    dups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted_quad() {
        assert_eq!(dotted_quad("10.0.0.1"), Ok(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(dotted_quad("010.0.0.1"), Ok(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(dotted_quad("300.1.1.1").is_err());
        assert!(dotted_quad("10.0.0").is_err());
        assert!(dotted_quad("10.0.0.1.5").is_err());
        assert!(dotted_quad("a.b.c.d").is_err());
        assert!(dotted_quad("1000.0.0.1").is_err());
    }

    #[test]
    fn test_host_address_rejects_reserved_ranges() {
        assert!(host_address("10.100.100.1").is_ok());
        assert!(host_address("223.255.255.255").is_ok());
        assert!(host_address("0.1.1.1").unwrap_err().contains("reserved"));
        assert!(host_address("224.1.1.1").unwrap_err().contains("224+"));
        assert!(host_address("255.255.255.255").is_err());
    }

    #[test]
    fn test_netmask_canonical_set() {
        let accepted: Vec<_> = (0..=32).filter_map(Netmask::from_prefix).collect();
        assert_eq!(accepted.len(), 33);
        for mask in &accepted {
            assert_eq!(Netmask::parse(&mask.to_string()), Some(*mask));
        }

        assert_eq!(Netmask::parse("255.255.255.0").unwrap().prefix_len(), 24);
        assert_eq!(Netmask::parse("0.0.0.0").unwrap().prefix_len(), 0);
        assert_eq!(Netmask::parse("255.255.255.255").unwrap().prefix_len(), 32);
        assert!(Netmask::parse("255.255.255.256").is_none());
        assert!(Netmask::parse("255.0.255.0").is_none());
        assert!(Netmask::parse("255.255.255.1").is_none());
        assert!(netmask("255.255.255.256").unwrap_err().contains("Invalid subnet mask"));
    }

    #[test]
    fn test_hostname() {
        assert!(hostname("dist-rtr01").is_ok());
        assert!(hostname("core_sw_2").is_ok());
        assert!(hostname("").is_err());
        assert!(hostname("rtr.example").is_err());
        assert!(hostname("rtr 1").is_err());
        assert!(hostname(&"a".repeat(63)).is_ok());
        assert!(hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_description() {
        assert!(description("Management loopback", 240).is_ok());
        for bad in ["<b>", "a > b", "R&D", "say \"hi\"", "it's"] {
            assert!(description(bad, 240).is_err(), "{bad} should be rejected");
        }
        assert!(description(&"x".repeat(240), 240).is_ok());
        assert!(description(&"x".repeat(241), 240).is_err());
    }

    #[test]
    fn test_numeric_ranges() {
        assert_eq!(loopback_id(0), Ok(0));
        assert_eq!(loopback_id(MAX_LOOPBACK_ID), Ok(2_147_483_647));
        assert!(loopback_id(-1).is_err());
        assert!(loopback_id(MAX_LOOPBACK_ID + 1).is_err());

        assert_eq!(asn(1), Ok(1));
        assert_eq!(asn(MAX_ASN), Ok(u32::MAX));
        assert!(asn(0).is_err());
        assert!(asn(MAX_ASN + 1).is_err());
    }

    #[test]
    fn test_duplicates() {
        let found = duplicates(["a", "b", "a", "c", "b", "a"]);
        assert_eq!(found, vec!["a".to_string(), "b".to_string()]);
        assert!(duplicates(["x", "y"]).is_empty());
    }
}
