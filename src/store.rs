//! Database store for principals and resource controls

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::access_control::resource_control::{ResourceControl, ResourceType};
use crate::directory::PrincipalDirectory;
use crate::error::{AppError, DirectoryError, Result};
use crate::models::{
    Actor, CreateTeamRequest, CreateUserRequest, EnvironmentAccessRequest, EnvironmentId, Role,
    Team, TeamId, User, UserId,
};

/// Database store
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))
    }

    // User operations

    pub async fn create_user(&self, request: CreateUserRequest) -> Result<User> {
        let username = request.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::BadRequest("Username cannot be empty".to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, role, created_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&username)
        .bind(request.role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| conflict(e, format!("User {} already exists", username)))?;

        Ok(User {
            id: UserId(result.last_insert_rowid() as u64),
            username,
            role: request.role,
        })
    }

    pub async fn count_users(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, role
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id.0 as i64)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        row.try_into()
    }

    /// Resolve a user into an actor with its team memberships
    pub async fn actor(&self, id: UserId) -> Result<Actor> {
        let user = self.get_user(id).await?;
        let team_ids = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT team_id FROM team_memberships WHERE user_id = ?
            "#,
        )
        .bind(id.0 as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(Actor {
            id: user.id,
            is_admin: user.is_admin(),
            team_ids: team_ids.into_iter().map(|t| TeamId(t as u64)).collect(),
        })
    }

    /// Users visible to `actor`, optionally restricted to an environment.
    ///
    /// Non-administrators only ever see themselves.
    pub async fn list_users(
        &self,
        actor: &Actor,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<User>> {
        if !actor.is_admin {
            return Ok(vec![self.get_user(actor.id).await?]);
        }

        let rows = match environment_id {
            None => {
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT id, username, role
                    FROM users
                    ORDER BY id ASC
                    "#,
                )
                .fetch_all(&self.pool)
                .await?
            }
            Some(environment_id) => {
                sqlx::query_as::<_, UserRow>(
                    r#"
                    SELECT id, username, role
                    FROM users
                    WHERE role = 'administrator'
                       OR id IN (SELECT user_id FROM environment_users WHERE environment_id = ?)
                       OR id IN (
                           SELECT tm.user_id
                           FROM team_memberships tm
                           JOIN environment_teams et ON et.team_id = tm.team_id
                           WHERE et.environment_id = ?
                       )
                    ORDER BY id ASC
                    "#,
                )
                .bind(environment_id.0 as i64)
                .bind(environment_id.0 as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    // Team operations

    pub async fn create_team(&self, request: CreateTeamRequest) -> Result<Team> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Team name cannot be empty".to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO teams (name, created_at)
            VALUES (?, ?)
            "#,
        )
        .bind(&name)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict(e, format!("Team {} already exists", name)))?;
        let team_id = result.last_insert_rowid();

        let members: BTreeSet<UserId> = request.member_ids.into_iter().collect();
        for user_id in members {
            sqlx::query(
                r#"
                INSERT INTO team_memberships (team_id, user_id)
                VALUES (?, ?)
                "#,
            )
            .bind(team_id)
            .bind(user_id.0 as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(Team {
            id: TeamId(team_id as u64),
            name,
        })
    }

    /// Teams visible to `actor`: all of them for administrators, the actor's
    /// own teams otherwise; optionally restricted to an environment
    pub async fn list_teams(
        &self,
        actor: &Actor,
        environment_id: Option<EnvironmentId>,
    ) -> Result<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(
            r#"
            SELECT id, name
            FROM teams
            WHERE (? OR id IN (SELECT team_id FROM team_memberships WHERE user_id = ?))
              AND (? IS NULL OR id IN (SELECT team_id FROM environment_teams WHERE environment_id = ?))
            ORDER BY id ASC
            "#,
        )
        .bind(actor.is_admin)
        .bind(actor.id.0 as i64)
        .bind(environment_id.map(|e| e.0 as i64))
        .bind(environment_id.map(|e| e.0 as i64))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    // Environment access

    /// Replace the users and teams granted access to an environment
    pub async fn set_environment_access(
        &self,
        environment_id: EnvironmentId,
        request: EnvironmentAccessRequest,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let environment = environment_id.0 as i64;

        sqlx::query("DELETE FROM environment_users WHERE environment_id = ?")
            .bind(environment)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM environment_teams WHERE environment_id = ?")
            .bind(environment)
            .execute(&mut *tx)
            .await?;

        let users: BTreeSet<UserId> = request.user_ids.into_iter().collect();
        for user_id in users {
            sqlx::query("INSERT INTO environment_users (environment_id, user_id) VALUES (?, ?)")
                .bind(environment)
                .bind(user_id.0 as i64)
                .execute(&mut *tx)
                .await?;
        }

        let teams: BTreeSet<TeamId> = request.team_ids.into_iter().collect();
        for team_id in teams {
            sqlx::query("INSERT INTO environment_teams (environment_id, team_id) VALUES (?, ?)")
                .bind(environment)
                .bind(team_id.0 as i64)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    // Resource control operations

    pub async fn create_resource_control(&self, control: &ResourceControl) -> Result<()> {
        let user_ids = serde_json::to_string(&control.user_ids)
            .map_err(|e| AppError::Internal(format!("Invalid user ids: {}", e)))?;
        let team_ids = serde_json::to_string(&control.team_ids)
            .map_err(|e| AppError::Internal(format!("Invalid team ids: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO resource_controls (id, resource_id, resource_type, administrators_only, public, user_ids, team_ids, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(control.id.to_string())
        .bind(&control.resource_id)
        .bind(control.resource_type.as_str())
        .bind(control.administrators_only)
        .bind(control.public)
        .bind(user_ids)
        .bind(team_ids)
        .bind(control.created_by.0 as i64)
        .bind(control.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            conflict(
                e,
                format!(
                    "{} {} already has an access control",
                    control.resource_type.as_str(),
                    control.resource_id
                ),
            )
        })?;

        Ok(())
    }

    pub async fn get_resource_control(&self, id: Uuid) -> Result<ResourceControl> {
        let row = sqlx::query_as::<_, ResourceControlRow>(
            r#"
            SELECT id, resource_id, resource_type, administrators_only, public, user_ids, team_ids, created_by, created_at
            FROM resource_controls
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource control {} not found", id)))?;

        row.try_into()
    }

    pub async fn find_resource_control(
        &self,
        resource_id: &str,
        resource_type: ResourceType,
    ) -> Result<Option<ResourceControl>> {
        let row = sqlx::query_as::<_, ResourceControlRow>(
            r#"
            SELECT id, resource_id, resource_type, administrators_only, public, user_ids, team_ids, created_by, created_at
            FROM resource_controls
            WHERE resource_id = ? AND resource_type = ?
            "#,
        )
        .bind(resource_id)
        .bind(resource_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.try_into()).transpose()
    }
}

/// Map unique constraint violations to a client error
fn conflict(error: sqlx::Error, message: String) -> AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::BadRequest(message),
        _ => AppError::Database(error),
    }
}

/// The store seen through one actor's eyes
#[derive(Clone)]
pub struct ScopedDirectory {
    store: Store,
    actor: Actor,
}

impl ScopedDirectory {
    pub fn new(store: Store, actor: Actor) -> Self {
        Self { store, actor }
    }
}

#[async_trait]
impl PrincipalDirectory for ScopedDirectory {
    async fn list_users(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> std::result::Result<Vec<User>, DirectoryError> {
        self.store
            .list_users(&self.actor, environment_id)
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))
    }

    async fn list_teams(
        &self,
        environment_id: Option<EnvironmentId>,
    ) -> std::result::Result<Vec<Team>, DirectoryError> {
        self.store
            .list_teams(&self.actor, environment_id)
            .await
            .map_err(|e| DirectoryError::Store(e.to_string()))
    }
}

// Internal row types for sqlx

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    role: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: UserId(row.id as u64),
            username: row.username,
            role: row
                .role
                .parse::<Role>()
                .map_err(|e| AppError::Internal(format!("Invalid role: {}", e)))?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: i64,
    name: String,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: TeamId(row.id as u64),
            name: row.name,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResourceControlRow {
    id: String,
    resource_id: String,
    resource_type: String,
    administrators_only: bool,
    public: bool,
    user_ids: String,
    team_ids: String,
    created_by: i64,
    created_at: chrono::DateTime<Utc>,
}

impl TryFrom<ResourceControlRow> for ResourceControl {
    type Error = AppError;

    fn try_from(row: ResourceControlRow) -> Result<Self> {
        Ok(ResourceControl {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| AppError::Internal(format!("Invalid UUID: {}", e)))?,
            resource_id: row.resource_id,
            resource_type: row
                .resource_type
                .parse()
                .map_err(|e| AppError::Internal(format!("Invalid resource type: {}", e)))?,
            administrators_only: row.administrators_only,
            public: row.public,
            user_ids: serde_json::from_str(&row.user_ids)
                .map_err(|e| AppError::Internal(format!("Invalid user ids: {}", e)))?,
            team_ids: serde_json::from_str(&row.team_ids)
                .map_err(|e| AppError::Internal(format!("Invalid team ids: {}", e)))?,
            created_by: UserId(row.created_by as u64),
            created_at: row.created_at,
        })
    }
}
