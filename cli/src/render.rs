//! Plain-text rendering of the ownership form

use std::fmt::Write;

use accessctl::access_control::{FormErrors, FormView, OwnershipOption, OwnershipVariant};

/// One line per option, marking the selected one
pub fn render_options(options: &[OwnershipOption], selected: Option<OwnershipVariant>) -> String {
    let mut out = String::new();
    for option in options {
        let marker = if Some(option.variant) == selected {
            "(x)"
        } else {
            "( )"
        };
        let availability = if option.available_to_actor {
            ""
        } else {
            " [unavailable]"
        };
        let _ = writeln!(
            out,
            "{} {:<14} {}{}",
            marker,
            option.variant.as_str(),
            option.title,
            availability
        );
        let _ = writeln!(out, "      {}", option.description);
    }
    out
}

pub fn render_view(view: &FormView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}:", view.ownership_field);
    out.push_str(&render_options(&view.options, Some(view.selected)));

    if let Some(users) = &view.users_field {
        let _ = writeln!(out, "{}:", users.name);
        for user in &users.users {
            let marker = if users.selected.contains(&user.id) {
                "[x]"
            } else {
                "[ ]"
            };
            let _ = writeln!(out, "  {} {:>4}  {}", marker, user.id.0, user.username);
        }
        if let Some(error) = &users.error {
            let _ = writeln!(out, "  ! {}", error);
        }
    }

    if let Some(teams) = &view.teams_field {
        let _ = writeln!(out, "{}:  ({})", teams.name, teams.tooltip_message);
        for team in &teams.teams {
            let marker = if teams.selected.contains(&team.id) {
                "[x]"
            } else {
                "[ ]"
            };
            let _ = writeln!(out, "  {} {:>4}  {}", marker, team.id.0, team.name);
        }
        if let Some(error) = &teams.error {
            let _ = writeln!(out, "  ! {}", error);
        }
    }

    if let Some(banner) = &view.error_banner {
        let _ = writeln!(out, "! {}", banner);
    }
    out
}

/// Summary of errors for when no view can be rendered
pub fn render_errors(errors: &FormErrors) -> String {
    match errors {
        FormErrors::None => String::new(),
        FormErrors::Object(message) => message.clone(),
        FormErrors::Fields(fields) => [
            ("ownership", &fields.ownership),
            ("authorizedUsers", &fields.authorized_users),
            ("authorizedTeams", &fields.authorized_teams),
        ]
        .iter()
        .filter_map(|(name, error)| error.as_ref().map(|e| format!("{}: {}", name, e)))
        .collect::<Vec<_>>()
        .join("; "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessctl::access_control::{compute_options, FieldErrors};
    use accessctl::models::Actor;

    #[test]
    fn test_render_options_marks_selection() {
        let options = compute_options(&Actor::administrator(1u64), &[], false);
        let text = render_options(&options, Some(OwnershipVariant::Private));

        assert!(text.contains("(x) private"));
        assert!(text.contains("( ) administrators"));
        assert!(!text.contains("public"));
    }

    #[test]
    fn test_render_options_flags_unavailable_restricted() {
        let options = compute_options(&Actor::standard(2u64, Vec::<u64>::new()), &[], true);
        let text = render_options(&options, None);

        let restricted = text
            .lines()
            .find(|line| line.contains(" restricted "))
            .unwrap();
        assert!(restricted.ends_with("[unavailable]"));
    }

    #[test]
    fn test_render_errors() {
        assert_eq!(render_errors(&FormErrors::None), "");
        assert_eq!(
            render_errors(&FormErrors::Fields(FieldErrors {
                authorized_teams: Some("You must specify at least one team.".to_string()),
                ..FieldErrors::default()
            })),
            "authorizedTeams: You must specify at least one team."
        );
    }
}
