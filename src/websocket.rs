//! WebSocket editing sessions
//!
//! Each socket drives one [`AccessControlForm`] on behalf of the hosting form.
//! Every change notification is forwarded as a `changed` message in the order
//! the operations were received, followed by the refreshed view.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::access_control::{
    validate, AccessControlForm, AccessControlFormData, CreateResourceControlRequest, FormErrors,
    FormProps, FormView, OwnershipVariant, ResourceControlResponse, ResourceType,
};
use crate::directory::DirectoryLoader;
use crate::error::{AppError, Result};
use crate::models::{EnvironmentId, TeamId, UserId};
use crate::store::ScopedDirectory;
use crate::AppState;

/// Messages sent by the client
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start editing on behalf of an actor
    Open {
        actor_id: UserId,
        #[serde(default)]
        environment_id: Option<EnvironmentId>,
        #[serde(default)]
        is_public_visible: bool,
        #[serde(default)]
        namespace: Option<String>,
        /// Initial value; defaults to administrators only
        #[serde(default)]
        values: Option<AccessControlFormData>,
        /// Seed the form from an existing resource control instead
        #[serde(default)]
        resource_control_id: Option<Uuid>,
    },
    SelectOwnership {
        ownership: OwnershipVariant,
    },
    SetAuthorizedUsers {
        user_ids: Vec<UserId>,
    },
    SetAuthorizedTeams {
        team_ids: Vec<TeamId>,
    },
    /// Reload the directory, e.g. after the environment changed
    Reload {
        #[serde(default)]
        environment_id: Option<EnvironmentId>,
    },
    Submit {
        resource_id: String,
        resource_type: ResourceType,
    },
}

/// Messages sent by the server
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The directory is loading; nothing can be rendered yet
    Loading {
        environment_id: Option<EnvironmentId>,
    },
    View {
        view: FormView,
    },
    /// One notification per mutating operation
    Changed {
        values: AccessControlFormData,
    },
    Invalid {
        errors: FormErrors,
        #[serde(skip_serializing_if = "Option::is_none")]
        view: Option<FormView>,
    },
    Submitted {
        resource_control: ResourceControlResponse,
    },
    Error {
        message: String,
    },
}

type ChangeCallback = Box<dyn FnMut(&AccessControlFormData) + Send>;

/// Per-socket editing state
struct Session {
    form: AccessControlForm<ChangeCallback>,
    directory: ScopedDirectory,
    loader: DirectoryLoader,
    changes: mpsc::UnboundedReceiver<AccessControlFormData>,
}

impl Session {
    /// Current view, or a loading marker while the directory is unavailable
    fn view_message(&self) -> ServerMessage {
        match self.form.render(self.loader.state()) {
            Some(view) => ServerMessage::View { view },
            None => ServerMessage::Loading {
                environment_id: self.loader.environment_id(),
            },
        }
    }

    fn drain_changes(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(values) = self.changes.try_recv() {
            messages.push(ServerMessage::Changed { values });
        }
        messages
    }

    fn ensure_loaded(&self) -> Result<()> {
        if self.loader.state().is_loading() {
            return Err(AppError::BadRequest(
                "Directory is still loading".to_string(),
            ));
        }
        Ok(())
    }

    /// Load the directory; a failure is reported and leaves the form loading
    async fn load(&mut self, environment_id: Option<EnvironmentId>) -> Vec<ServerMessage> {
        match self.loader.load(&self.directory, environment_id).await {
            Ok(_) => vec![self.view_message()],
            Err(e) => vec![
                ServerMessage::Error {
                    message: format!("Failed to load users and teams: {}", e),
                },
                self.view_message(),
            ],
        }
    }
}

/// WebSocket handler
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session: Option<Session> = None;

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
        };

        let replies = match serde_json::from_str::<ClientMessage>(&msg) {
            Ok(client_msg) => match handle_message(&state, &mut session, client_msg).await {
                Ok(replies) => replies,
                Err(e) => vec![ServerMessage::Error {
                    message: e.to_string(),
                }],
            },
            Err(e) => vec![ServerMessage::Error {
                message: format!("Invalid message: {}", e),
            }],
        };

        for reply in replies {
            let text = match serde_json::to_string(&reply) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to encode message: {}", e);
                    continue;
                }
            };
            if let Err(e) = sender.send(Message::Text(text)).await {
                tracing::error!("Failed to send message: {}", e);
                return;
            }
        }
    }
}

async fn handle_message(
    state: &AppState,
    session: &mut Option<Session>,
    msg: ClientMessage,
) -> Result<Vec<ServerMessage>> {
    if let Some(open) = session.as_mut() {
        return apply(state, open, msg).await;
    }

    let ClientMessage::Open {
        actor_id,
        environment_id,
        is_public_visible,
        namespace,
        values,
        resource_control_id,
    } = msg
    else {
        return Err(AppError::BadRequest("No open session".to_string()));
    };

    let actor = state.store.actor(actor_id).await?;
    let values = match resource_control_id {
        Some(id) => state.store.get_resource_control(id).await?.form_data(&actor),
        None => values.unwrap_or_default(),
    };

    let (tx, changes) = mpsc::unbounded_channel();
    let on_change: ChangeCallback = Box::new(move |values: &AccessControlFormData| {
        let _ = tx.send(values.clone());
    });
    let props = FormProps {
        values,
        is_public_visible,
        errors: FormErrors::None,
        namespace,
        environment_id,
    };

    tracing::debug!(actor = %actor.id, "Opening access control session");
    let mut opened = Session {
        form: AccessControlForm::new(actor.clone(), props, on_change),
        directory: ScopedDirectory::new(state.store.clone(), actor),
        loader: DirectoryLoader::new(),
        changes,
    };
    let replies = opened.load(environment_id).await;
    *session = Some(opened);
    Ok(replies)
}

async fn apply(
    state: &AppState,
    session: &mut Session,
    msg: ClientMessage,
) -> Result<Vec<ServerMessage>> {
    match msg {
        ClientMessage::Open { .. } => {
            return Err(AppError::BadRequest("Session already open".to_string()));
        }
        ClientMessage::SelectOwnership { ownership } => {
            session.ensure_loaded()?;
            session.form.select_ownership(ownership);
        }
        ClientMessage::SetAuthorizedUsers { user_ids } => {
            session.ensure_loaded()?;
            session.form.set_authorized_users(user_ids);
        }
        ClientMessage::SetAuthorizedTeams { team_ids } => {
            session.ensure_loaded()?;
            session.form.set_authorized_teams(team_ids);
        }
        ClientMessage::Reload { environment_id } => {
            session.form.set_environment_id(environment_id);
            return Ok(session.load(environment_id).await);
        }
        ClientMessage::Submit {
            resource_id,
            resource_type,
        } => {
            session.ensure_loaded()?;
            let actor = session.form.actor().clone();
            let errors = validate(session.form.values(), &actor);
            session.form.set_errors(errors.clone());
            if !errors.is_empty() {
                return Ok(vec![ServerMessage::Invalid {
                    errors,
                    view: session.form.render(session.loader.state()),
                }]);
            }

            let request = CreateResourceControlRequest {
                resource_id,
                resource_type,
                access_control: session.form.values().clone(),
            };
            let control = crate::api::submit_resource_control(state, &actor, request).await?;
            return Ok(vec![ServerMessage::Submitted {
                resource_control: ResourceControlResponse::for_actor(control, &actor),
            }]);
        }
    }

    let mut replies = session.drain_changes();
    replies.push(session.view_message());
    Ok(replies)
}
