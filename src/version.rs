//! Release version parsing and ordering.
//!
//! GEOS tags are plain dotted versions (`3.5.0`, `3.11.1`). Several build
//! behaviors are gated on ordered comparison against fixed thresholds, so
//! versions compare component-by-component like tuples.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VersionError {
    #[error("invalid version format: {0}")]
    InvalidFormat(String),
}

/// A dotted release version as an ordered sequence of numeric components.
///
/// Unlike strict semver there is no fixed component count: `"3.5"` stays
/// two components and round-trips back to `"3.5"`, not `"3.5.0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(components: Vec<u64>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }

    /// Whether this version sorts strictly below `major.minor.patch`.
    ///
    /// Used for threshold gating, e.g. `below(3, 6, 0)` selects the legacy
    /// build paths.
    pub fn below(&self, major: u64, minor: u64, patch: u64) -> bool {
        let threshold = [major, minor, patch];
        self.0.as_slice().cmp(&threshold[..]) == Ordering::Less
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionError::InvalidFormat("empty version".to_string()));
        }

        let components = s
            .split('.')
            .map(|part| {
                part.parse::<u64>()
                    .map_err(|_| VersionError::InvalidFormat(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Version(components))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic over components; a shorter prefix sorts first
        // (3.5 < 3.5.0), same as tuple comparison.
        self.0.cmp(&other.0)
    }
}
