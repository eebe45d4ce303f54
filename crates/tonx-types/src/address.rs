//! TON account addresses: workchain plus a 32-byte account hash, with the
//! friendly (tagged, CRC-protected base64) and raw `wc:hex` codecs.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

const TAG_BOUNCEABLE: u8 = 0x11;
const TAG_NON_BOUNCEABLE: u8 = 0x51;
const TAG_TESTNET_ONLY: u8 = 0x80;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    pub const fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }

    /// Parses the 48-character friendly form (either base64 alphabet). The
    /// testnet-only flag is accepted and dropped; the CRC must match.
    pub fn from_friendly(value: &str) -> Result<Self, ValidationError> {
        let normalized: String = value
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        let bytes = URL_SAFE_NO_PAD
            .decode(normalized.trim_end_matches('='))
            .map_err(|err| ValidationError::InvalidAddress(err.to_string()))?;
        if bytes.len() != 36 {
            return Err(ValidationError::InvalidLength {
                kind: "Address",
                expected: 36,
                actual: bytes.len(),
            });
        }
        let tag = bytes[0] & !TAG_TESTNET_ONLY;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(ValidationError::InvalidAddress(format!(
                "unknown address tag 0x{:02x}",
                bytes[0]
            )));
        }
        let expected = crc16(&bytes[..34]);
        let actual = u16::from_be_bytes([bytes[34], bytes[35]]);
        if expected != actual {
            return Err(ValidationError::InvalidAddress(
                "address checksum mismatch".to_string(),
            ));
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[2..34]);
        Ok(Self {
            workchain: bytes[1] as i8,
            hash,
        })
    }

    /// Parses the raw `workchain:hex_hash` form.
    pub fn from_raw(value: &str) -> Result<Self, ValidationError> {
        let (wc, hash_hex) = value
            .split_once(':')
            .ok_or_else(|| ValidationError::InvalidAddress("missing workchain".to_string()))?;
        let workchain: i8 = wc
            .parse()
            .map_err(|_| ValidationError::InvalidAddress(format!("bad workchain `{wc}`")))?;
        let bytes = hex::decode(hash_hex)
            .map_err(|err| ValidationError::InvalidAddress(err.to_string()))?;
        if bytes.len() != 32 {
            return Err(ValidationError::InvalidLength {
                kind: "Address",
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes);
        Ok(Self { workchain, hash })
    }

    /// Friendly bounceable form, url-safe alphabet.
    pub fn to_friendly(&self) -> String {
        let mut bytes = [0u8; 36];
        bytes[0] = TAG_BOUNCEABLE;
        bytes[1] = self.workchain as u8;
        bytes[2..34].copy_from_slice(&self.hash);
        let crc = crc16(&bytes[..34]);
        bytes[34..36].copy_from_slice(&crc.to_be_bytes());
        URL_SAFE_NO_PAD.encode(bytes)
    }

    pub fn to_raw(&self) -> String {
        format!("{}:{}", self.workchain, hex::encode(self.hash))
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.contains(':') {
            Self::from_raw(value)
        } else {
            Self::from_friendly(value)
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_friendly())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_raw())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_friendly())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(DeError::custom)
    }
}

/// CRC-16/XMODEM, as used by the friendly address checksum.
fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for byte in data {
        crc ^= (*byte as u16) << 8;
        for _ in 0..8 {
            if crc & 0x8000 != 0 {
                crc = (crc << 1) ^ 0x1021;
            } else {
                crc <<= 1;
            }
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use super::Address;

    #[test]
    fn friendly_round_trip() {
        let address = Address::new(0, [0x7d; 32]);
        let friendly = address.to_friendly();
        assert_eq!(friendly.len(), 48);
        assert_eq!(Address::from_friendly(&friendly).unwrap(), address);
    }

    #[test]
    fn raw_round_trip_with_masterchain() {
        let address = Address::new(-1, [0x03; 32]);
        let raw = address.to_raw();
        assert!(raw.starts_with("-1:"));
        assert_eq!(Address::from_raw(&raw).unwrap(), address);
    }

    #[test]
    fn parse_dispatches_on_shape() {
        let address = Address::new(0, [0x42; 32]);
        assert_eq!(address.to_friendly().parse::<Address>().unwrap(), address);
        assert_eq!(address.to_raw().parse::<Address>().unwrap(), address);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut friendly = Address::new(0, [0x11; 32]).to_friendly().into_bytes();
        friendly[10] = if friendly[10] == b'A' { b'B' } else { b'A' };
        let corrupted = String::from_utf8(friendly).unwrap();
        assert!(Address::from_friendly(&corrupted).is_err());
    }
}
