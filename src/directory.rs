//! Principal directory: the users and teams visible to an actor
//!
//! The ownership selector renders nothing until both lists are loaded. A load
//! that fails leaves the selector in its loading state; the hosting layer is
//! expected to surface the error.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;
use crate::models::{Actor, EnvironmentId, Team, User, UserId};

/// Header carrying the authenticated actor on directory requests
pub const ACTOR_HEADER: &str = "x-actor-id";

/// Source of users and teams for an environment
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn list_users(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<User>, DirectoryError>;

    async fn list_teams(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<Team>, DirectoryError>;
}

/// Both directory lists, loaded together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directory {
    pub users: Vec<User>,
    pub teams: Vec<Team>,
}

/// Load state gating the ownership selector
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DirectoryState {
    #[default]
    Loading,
    Ready(Directory),
}

impl DirectoryState {
    pub fn ready(&self) -> Option<&Directory> {
        match self {
            DirectoryState::Ready(directory) => Some(directory),
            DirectoryState::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DirectoryState::Loading)
    }
}

/// Fetch users and teams concurrently. Either failure fails the whole load.
pub async fn fetch_directory<D>(
    directory: &D,
    environment_id: Option<EnvironmentId>,
) -> Result<Directory, DirectoryError>
where
    D: PrincipalDirectory + ?Sized,
{
    let (users, teams) = futures::try_join!(
        directory.list_users(environment_id),
        directory.list_teams(environment_id)
    )?;
    Ok(Directory { users, teams })
}

/// Ticket identifying one directory load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
    environment_id: Option<EnvironmentId>,
}

impl LoadTicket {
    pub fn environment_id(&self) -> Option<EnvironmentId> {
        self.environment_id
    }
}

/// What happened to a finished load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was started; the response was dropped
    Stale,
    Failed,
}

/// Tracks the directory state for one selector.
///
/// Each load is tagged with a generation; only the response of the most
/// recently started load may populate the state.
#[derive(Debug, Default)]
pub struct DirectoryLoader {
    state: DirectoryState,
    generation: u64,
    environment_id: Option<EnvironmentId>,
}

impl DirectoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DirectoryState {
        &self.state
    }

    pub fn environment_id(&self) -> Option<EnvironmentId> {
        self.environment_id
    }

    /// Start a load for `environment_id`, invalidating any load in flight
    pub fn begin(&mut self, environment_id: Option<EnvironmentId>) -> LoadTicket {
        self.generation += 1;
        if self.environment_id != environment_id {
            self.state = DirectoryState::Loading;
        }
        self.environment_id = environment_id;
        LoadTicket {
            generation: self.generation,
            environment_id,
        }
    }

    pub fn finish(
        &mut self,
        ticket: LoadTicket,
        result: Result<Directory, DirectoryError>,
    ) -> LoadOutcome {
        if ticket.generation != self.generation {
            tracing::warn!(
                environment_id = ?ticket.environment_id,
                "Dropping stale directory response"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(directory) => {
                tracing::debug!(
                    users = directory.users.len(),
                    teams = directory.teams.len(),
                    "Directory loaded"
                );
                self.state = DirectoryState::Ready(directory);
                LoadOutcome::Applied
            }
            Err(e) => self.fail(&e),
        }
    }

    fn fail(&mut self, error: &DirectoryError) -> LoadOutcome {
        tracing::warn!("Directory load failed: {}", error);
        self.state = DirectoryState::Loading;
        LoadOutcome::Failed
    }

    /// Begin, fetch and finish a load in one call.
    ///
    /// Hosts that run several loads concurrently use [`begin`](Self::begin)
    /// and [`finish`](Self::finish) instead.
    pub async fn load<D>(
        &mut self,
        directory: &D,
        environment_id: Option<EnvironmentId>,
    ) -> Result<LoadOutcome, DirectoryError>
    where
        D: PrincipalDirectory + ?Sized,
    {
        let ticket = self.begin(environment_id);
        match fetch_directory(directory, environment_id).await {
            Ok(loaded) => Ok(self.finish(ticket, Ok(loaded))),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }
}

/// In-memory directory, mostly for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    users: Vec<User>,
    teams: Vec<Team>,
    failure: Option<String>,
}

impl StaticDirectory {
    pub fn new(users: Vec<User>, teams: Vec<Team>) -> Self {
        Self {
            users,
            teams,
            failure: None,
        }
    }

    /// A directory whose every request fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), DirectoryError> {
        match &self.failure {
            Some(message) => Err(DirectoryError::Unavailable(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PrincipalDirectory for StaticDirectory {
    async fn list_users(
        &self,
        _environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<User>, DirectoryError> {
        self.check()?;
        Ok(self.users.clone())
    }

    async fn list_teams(
        &self,
        _environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<Team>, DirectoryError> {
        self.check()?;
        Ok(self.teams.clone())
    }
}

/// REST client for an accessctl server's directory endpoints
pub struct HttpDirectory {
    client: Client,
    base_url: String,
    actor_id: UserId,
}

impl HttpDirectory {
    pub fn new(base_url: impl Into<String>, actor_id: UserId) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            actor_id,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve the authenticated actor
    pub async fn current_actor(&self) -> Result<Actor, DirectoryError> {
        self.get(format!("{}/api/me", self.base_url), None).await
    }

    async fn get<T>(
        &self,
        url: String,
        environment_id: Option<EnvironmentId>,
    ) -> Result<T, DirectoryError>
    where
        T: serde::de::DeserializeOwned,
    {
        let mut request = self
            .client
            .get(url)
            .header(ACTOR_HEADER, self.actor_id.to_string());
        if let Some(environment_id) = environment_id {
            request = request.query(&[("environment_id", environment_id.0)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl PrincipalDirectory for HttpDirectory {
    async fn list_users(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<User>, DirectoryError> {
        self.get(format!("{}/api/users", self.base_url), environment_id)
            .await
    }

    async fn list_teams(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<Team>, DirectoryError> {
        self.get(format!("{}/api/teams", self.base_url), environment_id)
            .await
    }
}
