use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 32-byte key material: the byte container plus length-checked
/// construction. Formatting is per type, since seeds must never end up in
/// log output.
macro_rules! impl_key_bytes {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const LEN: usize = 32;

            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn from_slice(bytes: &[u8]) -> Result<Self, ValidationError> {
                if bytes.len() != Self::LEN {
                    return Err(ValidationError::InvalidLength {
                        kind: stringify!($name),
                        expected: Self::LEN,
                        actual: bytes.len(),
                    });
                }
                let mut out = [0u8; 32];
                out.copy_from_slice(bytes);
                Ok(Self(out))
            }

            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub const fn into_inner(self) -> [u8; 32] {
                self.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(value: [u8; 32]) -> Self {
                Self::new(value)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = ValidationError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                Self::from_slice(value)
            }
        }
    };
}

/// Public keys render as url-safe base64, the form they take on the wire.
macro_rules! impl_key_display {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&URL_SAFE_NO_PAD.encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }
    };
}

impl_key_bytes!(AppPublicKey);
impl_key_bytes!(WalletPublicKey);
impl_key_bytes!(SessionSeed);

impl_key_display!(AppPublicKey);
impl_key_display!(WalletPublicKey);

// The seed is the session secret; its bytes stay out of any formatter.
impl fmt::Debug for SessionSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionSeed(..)")
    }
}

impl AppPublicKey {
    /// Url-safe base64 form used as the session identifier on the wire and
    /// in deep links.
    pub fn to_url_safe(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    pub fn from_url_safe(value: &str) -> Result<Self, ValidationError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(value.trim_end_matches('='))
            .map_err(|err| ValidationError::InvalidBase64(err.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl WalletPublicKey {
    pub fn from_base64(value: &str) -> Result<Self, ValidationError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(value)
            .map_err(|err| ValidationError::InvalidBase64(err.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.0)
    }
}
