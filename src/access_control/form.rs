//! Access control form model
//!
//! Composes the policy engine and the selection model, owns the value handed
//! to the hosting form, and renders externally supplied validation errors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ownership::{AccessControlFormData, OwnershipOption, OwnershipVariant};
use super::policy::{apply_transition, compute_options};
use super::selection::{self, SubField, TeamTooltip};
use crate::directory::DirectoryState;
use crate::models::{Actor, EnvironmentId, Team, TeamId, User, UserId};

/// Validation errors supplied by the hosting form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormErrors {
    #[default]
    None,
    /// Error attached to the value as a whole
    Object(String),
    /// Errors attached to named sub-fields
    Fields(FieldErrors),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldErrors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ownership: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_users: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorized_teams: Option<String>,
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        match self {
            FormErrors::None => true,
            FormErrors::Object(_) => false,
            FormErrors::Fields(fields) => {
                fields.ownership.is_none()
                    && fields.authorized_users.is_none()
                    && fields.authorized_teams.is_none()
            }
        }
    }

    fn field(&self, field: SubField) -> Option<String> {
        match self {
            FormErrors::Fields(fields) => match field {
                SubField::Users => fields.authorized_users.clone(),
                SubField::Teams => fields.authorized_teams.clone(),
            },
            _ => None,
        }
    }

    fn object(&self) -> Option<String> {
        match self {
            FormErrors::Object(message) => Some(message.clone()),
            _ => None,
        }
    }
}

/// Initial props passed by the hosting form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormProps {
    #[serde(default)]
    pub values: AccessControlFormData,
    #[serde(default)]
    pub is_public_visible: bool,
    #[serde(default)]
    pub errors: FormErrors,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub environment_id: Option<EnvironmentId>,
}

/// Rendering projection of the form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormView {
    pub ownership_field: String,
    pub selected: OwnershipVariant,
    pub options: Vec<OwnershipOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users_field: Option<UsersFieldView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teams_field: Option<TeamsFieldView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_banner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsersFieldView {
    pub name: String,
    pub users: Vec<User>,
    pub selected: BTreeSet<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamsFieldView {
    pub name: String,
    pub teams: Vec<Team>,
    pub selected: BTreeSet<TeamId>,
    pub tooltip: TeamTooltip,
    pub tooltip_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ownership editor bound to one actor.
///
/// Every mutating call computes a new value and synchronously hands it to
/// `on_change` before returning.
pub struct AccessControlForm<F>
where
    F: FnMut(&AccessControlFormData),
{
    actor: Actor,
    values: AccessControlFormData,
    errors: FormErrors,
    is_public_visible: bool,
    namespace: Option<String>,
    environment_id: Option<EnvironmentId>,
    on_change: F,
}

impl<F> AccessControlForm<F>
where
    F: FnMut(&AccessControlFormData),
{
    pub fn new(actor: Actor, props: FormProps, on_change: F) -> Self {
        Self {
            actor,
            values: props.values,
            errors: props.errors,
            is_public_visible: props.is_public_visible,
            namespace: props.namespace,
            environment_id: props.environment_id,
            on_change,
        }
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn values(&self) -> &AccessControlFormData {
        &self.values
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn environment_id(&self) -> Option<EnvironmentId> {
        self.environment_id
    }

    /// Point the form at another environment. The value is untouched, so
    /// `on_change` is not called; the host reloads the directory.
    pub fn set_environment_id(&mut self, environment_id: Option<EnvironmentId>) {
        self.environment_id = environment_id;
    }

    /// Switch ownership variant, resetting principal selections
    pub fn select_ownership(&mut self, variant: OwnershipVariant) -> &AccessControlFormData {
        tracing::debug!(
            actor = %self.actor.id,
            from = %self.values.ownership,
            to = %variant,
            "Ownership changed"
        );
        let next = apply_transition(&self.values, variant, &self.actor);
        self.commit(next)
    }

    pub fn set_authorized_users<I>(&mut self, ids: I) -> &AccessControlFormData
    where
        I: IntoIterator<Item = UserId>,
    {
        let next = selection::set_authorized_users(&self.values, ids);
        self.commit(next)
    }

    pub fn set_authorized_teams<I>(&mut self, ids: I) -> &AccessControlFormData
    where
        I: IntoIterator<Item = TeamId>,
    {
        let next = selection::set_authorized_teams(&self.values, ids);
        self.commit(next)
    }

    /// Replace the validation errors reported by the hosting form
    pub fn set_errors(&mut self, errors: FormErrors) {
        self.errors = errors;
    }

    /// Field name as seen by the hosting form
    pub fn field_name(&self, name: &str) -> String {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => format!("{}.{}", namespace, name),
            _ => name.to_string(),
        }
    }

    /// Options offered by the ownership selector
    pub fn options(&self, teams: &[Team]) -> Vec<OwnershipOption> {
        compute_options(&self.actor, teams, self.is_public_visible)
    }

    /// Render the form, or `None` while the directory has not loaded
    pub fn render(&self, directory: &DirectoryState) -> Option<FormView> {
        let directory = directory.ready()?;
        let fields = selection::rendered_sub_fields(&self.values, &self.actor);
        let restricted = self.values.ownership == OwnershipVariant::Restricted;

        let users_field = fields.contains(SubField::Users).then(|| UsersFieldView {
            name: self.field_name("authorizedUsers"),
            users: directory.users.clone(),
            selected: self.values.authorized_user_ids.clone(),
            error: self.errors.field(SubField::Users),
        });

        let teams_field = fields.contains(SubField::Teams).then(|| {
            let tooltip = selection::team_tooltip(&self.actor);
            TeamsFieldView {
                name: self.field_name("authorizedTeams"),
                teams: selection::selectable_teams(&self.actor, &directory.teams),
                selected: self.values.authorized_team_ids.clone(),
                tooltip,
                tooltip_message: tooltip.message().to_string(),
                error: self.errors.field(SubField::Teams),
            }
        });

        Some(FormView {
            ownership_field: self.field_name("ownership"),
            selected: self.values.ownership,
            options: self.options(&directory.teams),
            users_field,
            teams_field,
            error_banner: if restricted { self.errors.object() } else { None },
        })
    }

    fn commit(&mut self, next: AccessControlFormData) -> &AccessControlFormData {
        self.values = next;
        (self.on_change)(&self.values);
        &self.values
    }
}
