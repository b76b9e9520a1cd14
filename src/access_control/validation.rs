//! Validation schema applied by hosting forms before submission

use super::form::{FieldErrors, FormErrors};
use super::ownership::{AccessControlFormData, OwnershipVariant};
use super::selection::{visible_sub_fields, SubField};
use crate::models::Actor;

pub const MISSING_PRINCIPAL: &str = "You must specify at least one team or user.";
pub const MISSING_TEAM: &str = "You must specify at least one team.";

/// Validate `values` as submitted by `actor`.
///
/// Only restricted ownership can be invalid: the actor must have picked at
/// least one principal through a sub-field they can actually see.
pub fn validate(values: &AccessControlFormData, actor: &Actor) -> FormErrors {
    if values.ownership != OwnershipVariant::Restricted {
        return FormErrors::None;
    }

    let fields = visible_sub_fields(actor);
    if fields.contains(SubField::Users) {
        if values.has_no_principals() {
            return FormErrors::Object(MISSING_PRINCIPAL.to_string());
        }
    } else if fields.contains(SubField::Teams) && values.authorized_team_ids.is_empty() {
        return FormErrors::Fields(FieldErrors {
            authorized_teams: Some(MISSING_TEAM.to_string()),
            ..FieldErrors::default()
        });
    }

    FormErrors::None
}
