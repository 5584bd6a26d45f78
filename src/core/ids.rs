//! Identifier newtypes for builds, staging stacks, matches, and candidate
//! actions.
//!
//! All ids are opaque: the engine compares them for equality and never
//! interprets the numeric value. Build and stack ids are allocated per match
//! and never reused within it.

use serde::{Deserialize, Serialize};

/// Identifier for a build on the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildId(pub u32);

impl BuildId {
    /// Create a new build ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Build({})", self.0)
    }
}

/// Identifier for a pending staging stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackId(pub u32);

impl StackId {
    /// Create a new stack ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stack({})", self.0)
    }
}

/// Identifier for a hosted match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchId(pub u64);

impl MatchId {
    /// Create a new match ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Match({})", self.0)
    }
}

/// Identifier for a candidate action awaiting player confirmation.
///
/// Valid only until the proposal it belongs to is resolved or superseded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u32);

impl ActionId {
    /// Create a new action ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ActionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Action({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", BuildId::new(3)), "Build(3)");
        assert_eq!(format!("{}", StackId::new(1)), "Stack(1)");
        assert_eq!(format!("{}", MatchId::new(9)), "Match(9)");
        assert_eq!(format!("{}", ActionId::new(0)), "Action(0)");
    }

    #[test]
    fn test_raw() {
        assert_eq!(BuildId::new(7).raw(), 7);
        assert_eq!(StackId::new(2).raw(), 2);
    }

    #[test]
    fn test_serialization() {
        let id = BuildId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: BuildId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
