use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{dto::format_system_time, state::UserSession};

/// Payload used to claim a username and open a session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupRequest {
    /// Desired display name; must be unique across registered users.
    #[validate(custom(function = "crate::dto::validation::validate_username"))]
    pub username: String,
}

/// Payload used to open a fresh session for a registered username.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SigninRequest {
    #[validate(custom(function = "crate::dto::validation::validate_username"))]
    pub username: String,
}

/// Session details returned on signup and signin.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// Bearer token the client sends in `X-Auth-Token`.
    pub token: String,
    /// Stable identifier of the user.
    pub user_id: Uuid,
    /// Display name bound to the session.
    pub username: String,
    /// When the session was issued.
    pub created_at: String,
}

impl SessionResponse {
    /// Build the response for a session and the token that addresses it.
    pub fn from_session(token: String, session: &UserSession) -> Self {
        Self {
            token,
            user_id: session.user_id,
            username: session.username.clone(),
            created_at: format_system_time(session.created_at),
        }
    }
}

/// Profile of the authenticated caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub username: String,
    /// When the presented session was issued.
    pub session_started_at: String,
}

impl From<UserSession> for UserResponse {
    fn from(session: UserSession) -> Self {
        Self {
            user_id: session.user_id,
            username: session.username,
            session_started_at: format_system_time(session.created_at),
        }
    }
}
