//! Ownership variants and the access control value object

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::{Actor, TeamId, UserId};

/// The four mutually exclusive access levels a resource can be assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipVariant {
    /// Only administrators can manage the resource
    #[default]
    #[serde(rename = "administrators")]
    AdministratorsOnly,
    /// Only the actor who created the resource can manage it
    Private,
    /// An explicit set of users and teams can manage the resource
    Restricted,
    /// Every user with access to the environment can manage the resource
    Public,
}

impl OwnershipVariant {
    /// Every variant, in selector order
    pub const ALL: [OwnershipVariant; 4] = [
        OwnershipVariant::AdministratorsOnly,
        OwnershipVariant::Private,
        OwnershipVariant::Restricted,
        OwnershipVariant::Public,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipVariant::AdministratorsOnly => "administrators",
            OwnershipVariant::Private => "private",
            OwnershipVariant::Restricted => "restricted",
            OwnershipVariant::Public => "public",
        }
    }

    /// Short option label shown on the selector
    pub fn label(&self) -> &'static str {
        match self {
            OwnershipVariant::AdministratorsOnly => "administrators",
            OwnershipVariant::Private => "me",
            OwnershipVariant::Restricted => "restricted",
            OwnershipVariant::Public => "public",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            OwnershipVariant::AdministratorsOnly => "Administrators",
            OwnershipVariant::Private => "Private",
            OwnershipVariant::Restricted => "Restricted",
            OwnershipVariant::Public => "Public",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            OwnershipVariant::AdministratorsOnly => {
                "I want to restrict the management of this resource to administrators only"
            }
            OwnershipVariant::Private => "I want this resource to be manageable by myself only",
            OwnershipVariant::Restricted => {
                "I want to restrict the management of this resource to a set of users and/or teams"
            }
            OwnershipVariant::Public => {
                "I want any user with access to this environment to be able to manage this resource"
            }
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            OwnershipVariant::AdministratorsOnly => "eye-off",
            OwnershipVariant::Private => "user",
            OwnershipVariant::Restricted => "users",
            OwnershipVariant::Public => "globe",
        }
    }
}

impl std::fmt::Display for OwnershipVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OwnershipVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrators" | "admins" => Ok(OwnershipVariant::AdministratorsOnly),
            "private" | "me" => Ok(OwnershipVariant::Private),
            "restricted" => Ok(OwnershipVariant::Restricted),
            "public" => Ok(OwnershipVariant::Public),
            _ => Err(format!("Invalid ownership: {}", s)),
        }
    }
}

/// Client-side declaration of the desired ownership of a resource.
///
/// Never mutated in place: every change produces a new value that the hosting
/// form merges into its own state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessControlFormData {
    pub ownership: OwnershipVariant,
    #[serde(rename = "authorizedUsers", default)]
    pub authorized_user_ids: BTreeSet<UserId>,
    #[serde(rename = "authorizedTeams", default)]
    pub authorized_team_ids: BTreeSet<TeamId>,
}

impl AccessControlFormData {
    /// Initial value for a new resource
    pub fn administrators_only() -> Self {
        Self::default()
    }

    pub fn private(owner: UserId) -> Self {
        Self {
            ownership: OwnershipVariant::Private,
            authorized_user_ids: BTreeSet::from([owner]),
            authorized_team_ids: BTreeSet::new(),
        }
    }

    pub fn public() -> Self {
        Self {
            ownership: OwnershipVariant::Public,
            ..Self::default()
        }
    }

    pub fn restricted<U, T>(users: U, teams: T) -> Self
    where
        U: IntoIterator<Item = UserId>,
        T: IntoIterator<Item = TeamId>,
    {
        Self {
            ownership: OwnershipVariant::Restricted,
            authorized_user_ids: users.into_iter().collect(),
            authorized_team_ids: teams.into_iter().collect(),
        }
    }

    /// True when no principal is explicitly listed
    pub fn has_no_principals(&self) -> bool {
        self.authorized_user_ids.is_empty() && self.authorized_team_ids.is_empty()
    }

    /// Check the per-variant principal list invariants for the given actor
    pub fn is_consistent_for(&self, actor: &Actor) -> bool {
        match self.ownership {
            OwnershipVariant::Private => {
                self.authorized_user_ids.len() == 1
                    && self.authorized_user_ids.contains(&actor.id)
                    && self.authorized_team_ids.is_empty()
            }
            OwnershipVariant::AdministratorsOnly | OwnershipVariant::Public => {
                self.has_no_principals()
            }
            // Explicit lists, possibly empty while the selection is in progress
            OwnershipVariant::Restricted => true,
        }
    }
}

/// UI-facing projection of one ownership variant; derived, never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipOption {
    pub variant: OwnershipVariant,
    pub label: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub available_to_actor: bool,
}

impl OwnershipOption {
    pub fn new(variant: OwnershipVariant, available_to_actor: bool) -> Self {
        Self {
            variant,
            label: variant.label().to_string(),
            title: variant.title().to_string(),
            description: variant.description().to_string(),
            icon: variant.icon().to_string(),
            available_to_actor,
        }
    }
}
