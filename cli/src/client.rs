//! REST client for an accessctl server

use accessctl::access_control::{
    CreateResourceControlRequest, FormErrors, ResourceControlResponse,
};
use accessctl::directory::{HttpDirectory, ACTOR_HEADER};
use accessctl::error::DirectoryError;
use accessctl::models::{Actor, UserId};
use reqwest::{Client, StatusCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The server refused the declaration; errors go back into the form
    #[error("Declaration rejected")]
    Rejected(FormErrors),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Connection to one server on behalf of one actor
pub struct AccessClient {
    client: Client,
    directory: HttpDirectory,
    actor: Actor,
}

impl AccessClient {
    /// Resolve the actor against the server
    pub async fn connect(server: &str, actor_id: UserId) -> Result<Self, ClientError> {
        let url = url::Url::parse(server)?;
        tracing::info!("Connecting to {} as user {}", url, actor_id);

        let directory = HttpDirectory::new(url.as_str(), actor_id);
        let actor = directory.current_actor().await?;
        tracing::debug!(teams = actor.team_count(), admin = actor.is_admin, "Actor resolved");

        Ok(Self {
            client: Client::new(),
            directory,
            actor,
        })
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn directory(&self) -> &HttpDirectory {
        &self.directory
    }

    /// Persist a declaration
    pub async fn submit(
        &self,
        request: &CreateResourceControlRequest,
    ) -> Result<ResourceControlResponse, ClientError> {
        let response = self
            .client
            .post(format!("{}/api/resource_controls", self.directory.base_url()))
            .header(ACTOR_HEADER, self.actor.id.to_string())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST {
            if let Ok(errors) = serde_json::from_str::<FormErrors>(&body) {
                return Err(ClientError::Rejected(errors));
            }
        }
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }
}
