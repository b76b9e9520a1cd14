//! Interactive ownership editor

use accessctl::access_control::{
    validate, AccessControlForm, AccessControlFormData, CreateResourceControlRequest, FormProps,
    OwnershipVariant, ResourceType,
};
use accessctl::directory::DirectoryLoader;
use accessctl::models::{TeamId, UserId};
use anyhow::Result;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

use crate::client::{AccessClient, ClientError};
use crate::render;

const HELP: &str = "\
Commands:
  ownership <administrators|private|restricted|public>
  users <id...>        authorized users (restricted only)
  teams <id...>        authorized teams (restricted only)
  show                 print the form
  reload               reload users and teams
  submit <resource-id> <resource-type>
  help
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ownership(OwnershipVariant),
    Users(Vec<UserId>),
    Teams(Vec<TeamId>),
    Show,
    Reload,
    Submit {
        resource_id: String,
        resource_type: ResourceType,
    },
    Help,
    Quit,
}

/// Parse one prompt line. Ids may be separated by spaces or commas.
pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Show);
    };
    let rest: Vec<&str> = words.collect();

    match head {
        "ownership" | "o" => match rest.as_slice() {
            [variant] => Ok(Command::Ownership(variant.parse()?)),
            _ => Err("Usage: ownership <variant>".to_string()),
        },
        "users" | "u" => Ok(Command::Users(parse_ids(&rest)?)),
        "teams" | "t" => Ok(Command::Teams(parse_ids(&rest)?)),
        "show" => Ok(Command::Show),
        "reload" => Ok(Command::Reload),
        "submit" => match rest.as_slice() {
            [resource_id, resource_type] => Ok(Command::Submit {
                resource_id: resource_id.to_string(),
                resource_type: resource_type.parse()?,
            }),
            _ => Err("Usage: submit <resource-id> <resource-type>".to_string()),
        },
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_ids<T>(words: &[&str]) -> Result<Vec<T>, String>
where
    T: std::str::FromStr<Err = String>,
{
    words
        .iter()
        .flat_map(|word| word.split(','))
        .filter(|id| !id.is_empty())
        .map(str::parse)
        .collect()
}

/// Run the prompt until `quit`, end of input or a successful submit
pub async fn run(client: AccessClient, props: FormProps) -> Result<()> {
    let environment_id = props.environment_id;
    let mut loader = DirectoryLoader::new();
    let mut form = AccessControlForm::new(
        client.actor().clone(),
        props,
        |values: &AccessControlFormData| match serde_json::to_string(values) {
            Ok(json) => println!("changed {}", json),
            Err(e) => tracing::warn!("Failed to encode form value: {}", e),
        },
    );

    if let Err(e) = loader.load(client.directory(), environment_id).await {
        eprintln!("Failed to load users and teams: {}", e);
    }
    show(&form, &loader);

    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("accessctl".to_string()),
        DefaultPromptSegment::Empty,
    );

    loop {
        let line = match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => line,
            Ok(_) => break,
            Err(e) => {
                tracing::error!("Prompt error: {}", e);
                break;
            }
        };

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        let is_mutation = matches!(
            command,
            Command::Ownership(_) | Command::Users(_) | Command::Teams(_) | Command::Submit { .. }
        );
        if is_mutation && loader.state().is_loading() {
            eprintln!("Users and teams are not loaded yet; try `reload`");
            continue;
        }

        match command {
            Command::Ownership(variant) => {
                form.select_ownership(variant);
                show(&form, &loader);
            }
            Command::Users(ids) => {
                form.set_authorized_users(ids);
                show(&form, &loader);
            }
            Command::Teams(ids) => {
                form.set_authorized_teams(ids);
                show(&form, &loader);
            }
            Command::Show => show(&form, &loader),
            Command::Reload => {
                if let Err(e) = loader.load(client.directory(), environment_id).await {
                    eprintln!("Failed to load users and teams: {}", e);
                }
                show(&form, &loader);
            }
            Command::Submit {
                resource_id,
                resource_type,
            } => {
                let errors = validate(form.values(), client.actor());
                form.set_errors(errors.clone());
                if !errors.is_empty() {
                    eprintln!("{}", render::render_errors(&errors));
                    show(&form, &loader);
                    continue;
                }

                let request = CreateResourceControlRequest {
                    resource_id,
                    resource_type,
                    access_control: form.values().clone(),
                };
                match client.submit(&request).await {
                    Ok(response) => {
                        println!(
                            "Created resource control {} ({})",
                            response.resource_control.id, response.access_control.ownership
                        );
                        break;
                    }
                    Err(ClientError::Rejected(errors)) => {
                        eprintln!("{}", render::render_errors(&errors));
                        form.set_errors(errors);
                        show(&form, &loader);
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    Ok(())
}

fn show<F>(form: &AccessControlForm<F>, loader: &DirectoryLoader)
where
    F: FnMut(&AccessControlFormData),
{
    match form.render(loader.state()) {
        Some(view) => print!("{}", render::render_view(&view)),
        None => println!("Loading users and teams..."),
    }
}
