//! Stored ownership declarations for created resources

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::ownership::{AccessControlFormData, OwnershipVariant};
use crate::models::{Actor, TeamId, UserId};

/// Kind of resource an ownership declaration is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Container,
    ContainerGroup,
    Service,
    Volume,
    Network,
    Secret,
    Config,
    Stack,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Container => "container",
            ResourceType::ContainerGroup => "container_group",
            ResourceType::Service => "service",
            ResourceType::Volume => "volume",
            ResourceType::Network => "network",
            ResourceType::Secret => "secret",
            ResourceType::Config => "config",
            ResourceType::Stack => "stack",
        }
    }
}

impl std::str::FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "container" => Ok(ResourceType::Container),
            "container_group" => Ok(ResourceType::ContainerGroup),
            "service" => Ok(ResourceType::Service),
            "volume" => Ok(ResourceType::Volume),
            "network" => Ok(ResourceType::Network),
            "secret" => Ok(ResourceType::Secret),
            "config" => Ok(ResourceType::Config),
            "stack" => Ok(ResourceType::Stack),
            _ => Err(format!("Invalid resource type: {}", s)),
        }
    }
}

/// Ownership declaration persisted for a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceControl {
    pub id: Uuid,
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub administrators_only: bool,
    pub public: bool,
    pub user_ids: BTreeSet<UserId>,
    pub team_ids: BTreeSet<TeamId>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl ResourceControl {
    /// Build the declaration for `values` as submitted by `created_by`
    pub fn declare(
        resource_id: impl Into<String>,
        resource_type: ResourceType,
        values: &AccessControlFormData,
        created_by: UserId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            resource_id: resource_id.into(),
            resource_type,
            administrators_only: values.ownership == OwnershipVariant::AdministratorsOnly,
            public: values.ownership == OwnershipVariant::Public,
            user_ids: values.authorized_user_ids.clone(),
            team_ids: values.authorized_team_ids.clone(),
            created_by,
            created_at: Utc::now(),
        }
    }

    /// Ownership as seen by `actor`. A lone user reads back as private only
    /// for that user; anyone else sees the explicit restricted list.
    pub fn ownership(&self, actor: &Actor) -> OwnershipVariant {
        if self.public {
            OwnershipVariant::Public
        } else if self.administrators_only {
            OwnershipVariant::AdministratorsOnly
        } else if self.team_ids.is_empty()
            && self.user_ids.len() == 1
            && self.user_ids.contains(&actor.id)
        {
            OwnershipVariant::Private
        } else {
            OwnershipVariant::Restricted
        }
    }

    /// Form value seeding `actor`'s editor for this existing resource
    pub fn form_data(&self, actor: &Actor) -> AccessControlFormData {
        match self.ownership(actor) {
            OwnershipVariant::Public => AccessControlFormData::public(),
            OwnershipVariant::AdministratorsOnly => AccessControlFormData::administrators_only(),
            variant => AccessControlFormData {
                ownership: variant,
                authorized_user_ids: self.user_ids.clone(),
                authorized_team_ids: self.team_ids.clone(),
            },
        }
    }
}

/// Request to persist the ownership of a created resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceControlRequest {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub access_control: AccessControlFormData,
}

/// A stored declaration together with the form value it maps back to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceControlResponse {
    pub resource_control: ResourceControl,
    pub access_control: AccessControlFormData,
}

impl ResourceControlResponse {
    pub fn for_actor(resource_control: ResourceControl, actor: &Actor) -> Self {
        let access_control = resource_control.form_data(actor);
        Self {
            resource_control,
            access_control,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_from_str() {
        assert_eq!("stack".parse::<ResourceType>().unwrap(), ResourceType::Stack);
        assert_eq!(
            "container_group".parse::<ResourceType>().unwrap(),
            ResourceType::ContainerGroup
        );
        assert!("pod".parse::<ResourceType>().is_err());
        assert_eq!(ResourceType::Volume.as_str(), "volume");
    }

    #[test]
    fn test_declare_flags() {
        let admins = ResourceControl::declare(
            "c1",
            ResourceType::Container,
            &AccessControlFormData::default(),
            UserId(1),
        );
        assert!(admins.administrators_only);
        assert!(!admins.public);

        let public = ResourceControl::declare(
            "v1",
            ResourceType::Volume,
            &AccessControlFormData::public(),
            UserId(1),
        );
        assert!(public.public);
        assert!(!public.administrators_only);
    }

    #[test]
    fn test_ownership_derived_from_stored_lists() {
        let private = ResourceControl::declare(
            "c1",
            ResourceType::Container,
            &AccessControlFormData::private(UserId(4)),
            UserId(4),
        );
        let owner = Actor::standard(4u64, [1u64]);
        assert_eq!(private.ownership(&owner), OwnershipVariant::Private);
        assert_eq!(private.form_data(&owner), AccessControlFormData::private(UserId(4)));

        let restricted = ResourceControl::declare(
            "s1",
            ResourceType::Stack,
            &AccessControlFormData::restricted([UserId(4), UserId(5)], []),
            UserId(1),
        );
        assert_eq!(
            restricted.ownership(&Actor::standard(4u64, [1u64])),
            OwnershipVariant::Restricted
        );

        let team_only = ResourceControl::declare(
            "s2",
            ResourceType::Stack,
            &AccessControlFormData::restricted([], [TeamId(7)]),
            UserId(1),
        );
        assert_eq!(
            team_only.form_data(&Actor::administrator(1u64)),
            AccessControlFormData::restricted([], [TeamId(7)])
        );
    }

    #[test]
    fn test_single_user_restricted_round_trips_for_other_actors() {
        let admin = Actor::administrator(1u64);
        let declared = AccessControlFormData::restricted([UserId(2)], []);
        let control =
            ResourceControl::declare("c9", ResourceType::Container, &declared, admin.id);

        let seeded = control.form_data(&admin);
        assert_eq!(seeded, declared);
        assert!(seeded.is_consistent_for(&admin));

        // The named user sees their own private resource
        let named = Actor::standard(2u64, [1u64]);
        assert_eq!(control.form_data(&named), AccessControlFormData::private(UserId(2)));
        assert!(control.form_data(&named).is_consistent_for(&named));
    }

    #[test]
    fn test_response_carries_form_data() {
        let control = ResourceControl::declare(
            "n1",
            ResourceType::Network,
            &AccessControlFormData::public(),
            UserId(1),
        );
        let response = ResourceControlResponse::for_actor(control, &Actor::administrator(1u64));
        assert_eq!(response.access_control, AccessControlFormData::public());
    }
}
