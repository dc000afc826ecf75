//! Host framework version used to gate version-dependent warnings.
//!
//! Comparison is numeric per component. Missing components are zero, so
//! `5.6` and `5.6.0` are equal and `5.10.0` sorts after `5.9.0`.

use crate::error::AuditError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl HostVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Newest release line the rule set knows about; every gate is open.
    pub const LATEST: HostVersion = HostVersion::new(6, 0, 0);
}

impl Default for HostVersion {
    fn default() -> Self {
        Self::LATEST
    }
}

impl FromStr for HostVersion {
    type Err = AuditError;

    /// Accepts `5`, `5.8`, `5.8.13`, `v5.8.13` and suffixed forms such as
    /// `5.8.13-dev` or `5.8.x-dev`, where a non-numeric component reads as 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let core = body.split(['-', '+']).next().unwrap_or_default();
        if core.is_empty() {
            return Err(AuditError::InvalidVersion(s.to_string()));
        }
        let mut parts = [0u64; 3];
        for (i, part) in core.split('.').enumerate() {
            if i >= 3 {
                return Err(AuditError::InvalidVersion(s.to_string()));
            }
            parts[i] = match part.parse::<u64>() {
                Ok(n) => n,
                Err(_) if i > 0 && part.eq_ignore_ascii_case("x") => 0,
                Err(_) => return Err(AuditError::InvalidVersion(s.to_string())),
            };
        }
        Ok(HostVersion::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
