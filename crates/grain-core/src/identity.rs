//! Contributor identities: ids, validated names, subtypes.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::MAX_NAME_LENGTH;
use crate::error::LedgerError;

/// An opaque 16-byte identity identifier, rendered as 32 hex characters.
///
/// Ids are immutable once created and are never reused, even after the
/// identity is merged away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityId([u8; 16]);

impl IdentityId {
    /// Generate a fresh random id.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create an id from a byte array.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Return the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for IdentityId {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)
            .map_err(|_| LedgerError::MalformedLogEntry {
                line: 0,
                reason: format!("invalid identity id: {s}"),
            })?;
        let bytes: [u8; 16] = bytes.try_into().map_err(|_| LedgerError::MalformedLogEntry {
            line: 0,
            reason: format!("identity id must be 16 bytes: {s}"),
        })?;
        Ok(Self(bytes))
    }
}

impl Serialize for IdentityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IdentityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

/// What kind of contributor an identity represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySubtype {
    /// A human contributor.
    Person,
    /// A project or organization.
    Project,
    /// An automated contributor.
    Bot,
}

/// A validated identity display name.
///
/// Names are 1–40 characters of ASCII alphanumerics, dashes and
/// underscores. Validation happens at construction; a stored name is
/// always well-formed.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityName(String);

impl IdentityName {
    /// Validate and wrap a display name.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidName`] if the name is empty, longer than
    /// [`MAX_NAME_LENGTH`], or contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, LedgerError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name.len() <= MAX_NAME_LENGTH
            && name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(name))
        } else {
            Err(LedgerError::InvalidName(name))
        }
    }

    /// The name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for IdentityName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(D::Error::custom)
    }
}

/// A contributor identity.
///
/// The id never changes. Renames move the previous name into `aliases`;
/// merges fold the absorbed identity's name and aliases in as well, so a
/// canonical identity retains every name it has ever answered to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Immutable unique identifier.
    pub id: IdentityId,
    /// Current display name, unique across the ledger (aliases included).
    pub name: IdentityName,
    /// Contributor kind.
    pub subtype: IdentitySubtype,
    /// Prior names, retained through renames and merges.
    pub aliases: Vec<IdentityName>,
}

impl Identity {
    /// Create a new identity with a fresh random id and no aliases.
    pub fn new(name: IdentityName, subtype: IdentitySubtype) -> Self {
        Self {
            id: IdentityId::random(),
            name,
            subtype,
            aliases: Vec::new(),
        }
    }
}
