//! Region-scoped cache keys.
//!
//! Every backend key carries the name of the region it belongs to, so two
//! regions can hold the same logical key without colliding and a region can
//! be cleared by prefix. The encoded form is `"{region}::{key}"`, the layout
//! Redis-backed cache managers use for named caches.

use std::fmt;

/// Separator between the region name and the logical key.
pub const SEPARATOR: &str = "::";

/// A cache key bound to a named region.
///
/// The fields are private: a key can only be built through [`RegionScopedKey::new`],
/// so no backend operation can run without naming its region.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegionScopedKey {
    region: String,
    key: String,
}

impl RegionScopedKey {
    pub fn new(region: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            key: key.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Encode as `"{region}::{key}"`.
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.region.len() + SEPARATOR.len() + self.key.len());
        out.push_str(&self.region);
        out.push_str(SEPARATOR);
        out.push_str(&self.key);
        out
    }

    /// Prefix shared by every key in `region`.
    pub fn region_prefix(region: &str) -> String {
        format!("{}{}", region, SEPARATOR)
    }
}

impl fmt::Display for RegionScopedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.region, SEPARATOR, self.key)
    }
}
