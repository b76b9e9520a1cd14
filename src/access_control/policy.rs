//! Ownership policy engine
//!
//! Computes the ownership options offered to an actor and the canonical state
//! transition applied when the actor switches variant.

use std::collections::BTreeSet;

use super::ownership::{AccessControlFormData, OwnershipOption, OwnershipVariant};
use crate::models::{Actor, Team};

/// Compute the ordered ownership options offered to `actor`.
///
/// The order is fixed and never depends on the actor's role. `PUBLIC` is only
/// listed when `allow_public_option` is set by the caller for the resource type.
pub fn compute_options(
    actor: &Actor,
    teams: &[Team],
    allow_public_option: bool,
) -> Vec<OwnershipOption> {
    OwnershipVariant::ALL
        .iter()
        .copied()
        .filter(|variant| allow_public_option || *variant != OwnershipVariant::Public)
        .map(|variant| OwnershipOption::new(variant, is_available(actor, teams, variant)))
        .collect()
}

fn is_available(actor: &Actor, teams: &[Team], variant: OwnershipVariant) -> bool {
    match variant {
        // A non-admin outside every team has nothing to pick under RESTRICTED
        OwnershipVariant::Restricted => {
            actor.is_admin || teams.iter().any(|team| actor.is_member_of(team.id))
        }
        _ => true,
    }
}

/// Switch `current` to `variant` on behalf of `actor`.
///
/// Total over every variant pair. Prior principal selections are always
/// discarded: `PRIVATE` grants the actor alone, every other variant starts with
/// empty user and team sets, so the result never depends on the current value.
pub fn apply_transition(
    _current: &AccessControlFormData,
    variant: OwnershipVariant,
    actor: &Actor,
) -> AccessControlFormData {
    match variant {
        OwnershipVariant::Private => AccessControlFormData::private(actor.id),
        OwnershipVariant::Restricted
        | OwnershipVariant::AdministratorsOnly
        | OwnershipVariant::Public => AccessControlFormData {
            ownership: variant,
            authorized_user_ids: BTreeSet::new(),
            authorized_team_ids: BTreeSet::new(),
        },
    }
}
