//! Protocol version negotiation.
//!
//! Clients announce only their major version in `Connect`; the server accepts
//! any client whose major version matches its own.

use crate::codec::ProtocolError;

/// Current protocol version.
pub const PROTOCOL_VERSION: Version = Version::new(1, 0);

/// Protocol version information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Version {
    /// Major version - breaking changes increment this.
    pub major: u8,
    /// Minor version - backwards-compatible changes increment this.
    pub minor: u8,
}

impl Version {
    #[must_use]
    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Accept a client's announced major version.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnsupportedVersion`] if the major versions differ.
    pub fn negotiate(&self, client_major: u8) -> Result<u8, ProtocolError> {
        if client_major == self.major {
            Ok(self.major)
        } else {
            Err(ProtocolError::UnsupportedVersion(client_major))
        }
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Default for Version {
    fn default() -> Self {
        PROTOCOL_VERSION
    }
}
