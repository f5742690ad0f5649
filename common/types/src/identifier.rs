use serde::{Deserialize, Serialize};
use std::fmt;

/// The cryptographic scheme backing a given key. Carried alongside an
/// [`Identifier`] wherever the distinction matters (registry lookups don't
/// need it — a hex string is a hex string — but metadata loading and
/// Commit-Boost proxy directories are keyed by it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyType {
    Bls,
    Secp256k1,
}

impl KeyType {
    /// Directory name Commit-Boost proxy keystores are grouped under,
    /// `<proxy_root>/<consensus_id>/<BLS|SECP256K1>/...` (`spec.md` §4.4).
    pub fn directory_name(&self) -> &'static str {
        match self {
            KeyType::Bls => "BLS",
            KeyType::Secp256k1 => "SECP256K1",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.directory_name())
    }
}

/// A normalised public-key identifier: lowercase hex, `0x`-prefixed.
///
/// Per `spec.md` §4.1, the registry always stores and exposes identifiers in
/// this canonical form regardless of how a caller cased or prefixed the
/// input. `Identifier::normalise` is the single place that rule lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Normalises arbitrary hex input (with or without `0x`/`0X`, any case)
    /// into the canonical `0x`-prefixed lowercase form.
    pub fn normalise(raw: &str) -> Self {
        let stripped = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        Identifier(format!("0x{}", stripped.to_ascii_lowercase()))
    }

    /// Builds a canonical identifier directly from public-key bytes, with no
    /// stripping needed since there is no prefix to strip.
    pub fn from_public_key_bytes(bytes: &[u8]) -> Self {
        Identifier(format!("0x{}", hex::encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its `0x` prefix, lowercase hex.
    pub fn strip_0x(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Identifier::normalise(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_strips_prefix_and_lowercases() {
        let a = Identifier::normalise("0xABCDEF");
        let b = Identifier::normalise("0XabcDEF");
        let c = Identifier::normalise("ABCDEF");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.as_str(), "0xabcdef");
    }
}
