//! Principal selection model
//!
//! Decides which principal sub-fields an actor may edit under restricted
//! ownership and merges explicit user/team selections into the value object.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ownership::{AccessControlFormData, OwnershipVariant};
use crate::models::{Actor, Team, TeamId, UserId};

/// A principal selection sub-field rendered beneath the ownership selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubField {
    Users,
    Teams,
}

/// The set of sub-fields visible to an actor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubFields(BTreeSet<SubField>);

impl SubFields {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: SubField) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = SubField> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<SubField> for SubFields {
    fn from_iter<I: IntoIterator<Item = SubField>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Help text variant shown on the team selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamTooltip {
    Default,
    MultipleTeams,
}

impl TeamTooltip {
    pub fn message(&self) -> &'static str {
        match self {
            TeamTooltip::Default => "You can select which teams will be able to manage this resource.",
            TeamTooltip::MultipleTeams => {
                "Because you are a member of multiple teams, you may choose which teams can manage this resource."
            }
        }
    }
}

/// Which sub-fields `actor` may edit.
///
/// Only administrators browse the user list. The team list is shown to
/// administrators and to members of more than one team. The team count is
/// taken from [`Actor::team_ids`], not from the directory's (possibly
/// environment-filtered) team list.
pub fn visible_sub_fields(actor: &Actor) -> SubFields {
    let mut fields = BTreeSet::new();
    if actor.is_admin {
        fields.insert(SubField::Users);
    }
    if actor.is_admin || actor.team_count() > 1 {
        fields.insert(SubField::Teams);
    }
    SubFields(fields)
}

/// Sub-fields actually rendered for the current value: none unless restricted
pub fn rendered_sub_fields(data: &AccessControlFormData, actor: &Actor) -> SubFields {
    match data.ownership {
        OwnershipVariant::Restricted => visible_sub_fields(actor),
        _ => SubFields::none(),
    }
}

pub fn team_tooltip(actor: &Actor) -> TeamTooltip {
    if !actor.is_admin && actor.team_count() > 1 {
        TeamTooltip::MultipleTeams
    } else {
        TeamTooltip::Default
    }
}

/// Teams offered by the team selector: every team for administrators, the
/// actor's own teams otherwise
pub fn selectable_teams(actor: &Actor, teams: &[Team]) -> Vec<Team> {
    teams
        .iter()
        .filter(|team| actor.is_admin || actor.is_member_of(team.id))
        .cloned()
        .collect()
}

/// Replace the authorized users. Ids are trusted as listed by the directory.
pub fn set_authorized_users<I>(current: &AccessControlFormData, ids: I) -> AccessControlFormData
where
    I: IntoIterator<Item = UserId>,
{
    AccessControlFormData {
        authorized_user_ids: ids.into_iter().collect(),
        ..current.clone()
    }
}

/// Replace the authorized teams. Ids are trusted as listed by the directory.
pub fn set_authorized_teams<I>(current: &AccessControlFormData, ids: I) -> AccessControlFormData
where
    I: IntoIterator<Item = TeamId>,
{
    AccessControlFormData {
        authorized_team_ids: ids.into_iter().collect(),
        ..current.clone()
    }
}
