//! REST routes for the directory and resource controls

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::access_control::{
    validate, CreateResourceControlRequest, ResourceControl, ResourceControlResponse,
};
use crate::directory::ACTOR_HEADER;
use crate::error::{AppError, Result};
use crate::models::{
    Actor, CreateTeamRequest, CreateUserRequest, DirectoryQuery, EnvironmentAccessRequest,
    EnvironmentId, Role, Team, User, UserId,
};
use crate::AppState;

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(crate::websocket::handler))
        .route("/api/me", get(me))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/teams", get(list_teams).post(create_team))
        .route(
            "/api/environments/:environment_id/access",
            put(set_environment_access),
        )
        .route("/api/resource_controls", post(create_resource_control))
        .route("/api/resource_controls/:id", get(get_resource_control))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// The actor named by the `x-actor-id` header
pub struct CurrentActor(pub Actor);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self> {
        let header = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", ACTOR_HEADER)))?;
        let id: UserId = header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid actor header".to_string()))?
            .parse()
            .map_err(AppError::Unauthorized)?;

        match state.store.actor(id).await {
            Ok(actor) => Ok(CurrentActor(actor)),
            Err(AppError::NotFound(_)) => Err(AppError::Unauthorized(format!("Unknown actor {}", id))),
            Err(e) => Err(e),
        }
    }
}

impl CurrentActor {
    fn require_admin(&self) -> Result<()> {
        if self.0.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ))
        }
    }
}

async fn me(CurrentActor(actor): CurrentActor) -> Json<Actor> {
    Json(actor)
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<User>>> {
    let users = state.store.list_users(&actor, query.environment_id).await?;
    Ok(Json(users))
}

async fn list_teams(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Query(query): Query<DirectoryQuery>,
) -> Result<Json<Vec<Team>>> {
    let teams = state.store.list_teams(&actor, query.environment_id).await?;
    Ok(Json(teams))
}

/// Create a user. The very first user may be created anonymously and always
/// becomes an administrator.
async fn create_user(
    State(state): State<Arc<AppState>>,
    actor: Option<CurrentActor>,
    Json(mut request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>)> {
    match actor {
        Some(actor) => actor.require_admin()?,
        None => {
            if state.store.count_users().await? > 0 {
                return Err(AppError::Unauthorized(format!(
                    "Missing {} header",
                    ACTOR_HEADER
                )));
            }
            request.role = Role::Administrator;
            tracing::info!("Bootstrapping administrator {}", request.username);
        }
    }

    let user = state.store.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn create_team(
    State(state): State<Arc<AppState>>,
    actor: CurrentActor,
    Json(request): Json<CreateTeamRequest>,
) -> Result<(StatusCode, Json<Team>)> {
    actor.require_admin()?;
    let team = state.store.create_team(request).await?;
    Ok((StatusCode::CREATED, Json(team)))
}

async fn set_environment_access(
    State(state): State<Arc<AppState>>,
    actor: CurrentActor,
    Path(environment_id): Path<u64>,
    Json(request): Json<EnvironmentAccessRequest>,
) -> Result<StatusCode> {
    actor.require_admin()?;
    state
        .store
        .set_environment_access(EnvironmentId(environment_id), request)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Persist the ownership declared for a freshly created resource
pub async fn submit_resource_control(
    state: &AppState,
    actor: &Actor,
    request: CreateResourceControlRequest,
) -> Result<ResourceControl> {
    if !request.access_control.is_consistent_for(actor) {
        return Err(AppError::BadRequest(format!(
            "Inconsistent principals for {} ownership",
            request.access_control.ownership
        )));
    }

    let errors = validate(&request.access_control, actor);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let control = ResourceControl::declare(
        request.resource_id,
        request.resource_type,
        &request.access_control,
        actor.id,
    );
    state.store.create_resource_control(&control).await?;
    tracing::info!(
        resource_id = %control.resource_id,
        resource_type = control.resource_type.as_str(),
        ownership = %request.access_control.ownership,
        "Resource control created"
    );
    Ok(control)
}

async fn create_resource_control(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Json(request): Json<CreateResourceControlRequest>,
) -> Result<(StatusCode, Json<ResourceControlResponse>)> {
    let control = submit_resource_control(&state, &actor, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ResourceControlResponse::for_actor(control, &actor)),
    ))
}

async fn get_resource_control(
    State(state): State<Arc<AppState>>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<ResourceControlResponse>> {
    let control = state.store.get_resource_control(id).await?;
    Ok(Json(ResourceControlResponse::for_actor(control, &actor)))
}
