//! Role and permission-level hierarchies.
//!
//! Roles form a closed, ordered hierarchy checked by numeric rank
//! (`rank(actual) >= rank(required)`), never by string comparison.

use serde::{Deserialize, Serialize};

/// Application-wide user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular user.
    Member,
    /// Can manage other users' work within their teams.
    Manager,
    /// Full administrative access, bypasses resource-level checks.
    Admin,
}

impl Role {
    /// Numeric rank used for hierarchy comparisons.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Member => 1,
            Self::Manager => 2,
            Self::Admin => 3,
        }
    }

    /// Returns `true` if this role satisfies the `required` role.
    #[must_use]
    pub fn satisfies(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }

    /// Canonical lowercase name, as persisted in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }

    /// Parses a role from its canonical name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(Self::Member),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Per-resource permission level for explicit grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Read-only access to the resource.
    View,
    /// May modify the resource.
    Edit,
    /// May modify, share, and delete the resource.
    Manage,
}

impl PermissionLevel {
    /// Numeric rank used for hierarchy comparisons.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::View => 1,
            Self::Edit => 2,
            Self::Manage => 3,
        }
    }

    /// Returns `true` if this level satisfies the `required` level.
    #[must_use]
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self.rank() >= required.rank()
    }

    /// Builds a level from its persisted numeric rank.
    #[must_use]
    pub fn from_rank(rank: i32) -> Option<Self> {
        match rank {
            1 => Some(Self::View),
            2 => Some(Self::Edit),
            3 => Some(Self::Manage),
            _ => None,
        }
    }
}

/// Role within a single project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectRole {
    /// Read-only project member.
    Viewer,
    /// Regular contributing member.
    Contributor,
    /// Project owner.
    Owner,
}

impl ProjectRole {
    /// Numeric rank used for hierarchy comparisons.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Self::Viewer => 1,
            Self::Contributor => 2,
            Self::Owner => 3,
        }
    }

    /// Returns `true` if this role satisfies the `required` role.
    #[must_use]
    pub fn satisfies(self, required: ProjectRole) -> bool {
        self.rank() >= required.rank()
    }

    /// Canonical lowercase name, as persisted in storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Contributor => "contributor",
            Self::Owner => "owner",
        }
    }

    /// Parses a project role from its canonical name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "viewer" => Some(Self::Viewer),
            "contributor" => Some(Self::Contributor),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }
}
