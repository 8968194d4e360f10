//! Status service messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Version of the platform a node is running.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Patch version.
    pub patch: u32,
    /// Pre-release tag such as `beta`. May be empty.
    #[serde(default)]
    pub pre: String,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}.{}", self.major, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        Ok(())
    }
}

/// Request of `StatusService.GetVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetVersionRequest {}

/// Response of `StatusService.GetVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetVersionResponse {
    /// The version of the answering node.
    pub version: Version,
}
