//! Data models for principals, actors and directory requests

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

macro_rules! principal_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map($name)
                    .map_err(|_| format!("Invalid {}: {}", stringify!($name), s))
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                $name(id)
            }
        }
    };
}

principal_id!(
    /// Identifier of a user
    UserId
);
principal_id!(
    /// Identifier of a team
    TeamId
);
principal_id!(
    /// Identifier of a container environment
    EnvironmentId
);

/// Role of a user within the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Standard,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Standard => "standard",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(Role::Administrator),
            "standard" => Ok(Role::Standard),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// A user as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrator
    }
}

/// A team as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

/// The principal currently operating the console
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub is_admin: bool,
    #[serde(default)]
    pub team_ids: BTreeSet<TeamId>,
}

impl Actor {
    pub fn administrator(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
            team_ids: BTreeSet::new(),
        }
    }

    pub fn standard<I, T>(id: impl Into<UserId>, teams: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TeamId>,
    {
        Self {
            id: id.into(),
            is_admin: false,
            team_ids: teams.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_member_of(&self, team: TeamId) -> bool {
        self.team_ids.contains(&team)
    }

    /// Number of teams the actor belongs to
    pub fn team_count(&self) -> usize {
        self.team_ids.len()
    }
}

/// Request to create a user
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Standard
}

/// Request to create a team
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<UserId>,
}

/// Request to replace the principals granted access to an environment
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EnvironmentAccessRequest {
    #[serde(default)]
    pub user_ids: Vec<UserId>,
    #[serde(default)]
    pub team_ids: Vec<TeamId>,
}

/// Query parameters for directory listings
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DirectoryQuery {
    pub environment_id: Option<EnvironmentId>,
}
