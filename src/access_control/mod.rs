//! Resource ownership model
//!
//! Decides who may view and manage a created resource and exposes a role-aware
//! selection model over it. The policy engine and the selection model are pure
//! functions over [`AccessControlFormData`]; [`AccessControlForm`] composes them
//! and notifies the hosting form on every change.

pub mod form;
pub mod ownership;
pub mod policy;
pub mod resource_control;
pub mod selection;
pub mod validation;

pub use form::{AccessControlForm, FieldErrors, FormErrors, FormProps, FormView};
pub use ownership::{AccessControlFormData, OwnershipOption, OwnershipVariant};
pub use policy::{apply_transition, compute_options};
pub use resource_control::{
    CreateResourceControlRequest, ResourceControl, ResourceControlResponse, ResourceType,
};
pub use selection::{visible_sub_fields, SubField, SubFields, TeamTooltip};
pub use validation::validate;
