//! Lightweight session registry: usernames are claimed once, tokens are opaque.

use dashmap::Entry;
use std::time::SystemTime;
use uuid::Uuid;

use crate::{
    error::ServiceError,
    state::{RegisteredUser, SharedState, UserSession},
};

/// Register a username and mint a session token for it.
///
/// Usernames are claimed case-insensitively so `Ada` and `ada` cannot coexist,
/// while the displayed form keeps the caller's casing.
pub fn register(state: &SharedState, username: &str) -> Result<(String, UserSession), ServiceError> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ServiceError::InvalidInput("username must not be empty".into()));
    }

    let session = UserSession {
        user_id: Uuid::new_v4(),
        username: username.to_string(),
        created_at: SystemTime::now(),
    };

    match state.usernames().entry(username.to_lowercase()) {
        Entry::Occupied(_) => {
            return Err(ServiceError::InvalidState(format!(
                "username '{username}' is already taken"
            )));
        }
        Entry::Vacant(slot) => {
            slot.insert(RegisteredUser {
                user_id: session.user_id,
                username: session.username.clone(),
            });
        }
    }

    Ok((mint_token(state, session.clone()), session))
}

/// Mint a fresh token for a username that was registered earlier.
///
/// The session carries the display casing from registration, whatever casing
/// the caller signed in with.
pub fn sign_in(state: &SharedState, username: &str) -> Result<(String, UserSession), ServiceError> {
    let username = username.trim();
    let Some(owner) = state
        .usernames()
        .get(&username.to_lowercase())
        .map(|entry| entry.value().clone())
    else {
        return Err(ServiceError::Unauthorized(format!(
            "unknown username '{username}'"
        )));
    };

    let session = UserSession {
        user_id: owner.user_id,
        username: owner.username,
        created_at: SystemTime::now(),
    };

    Ok((mint_token(state, session.clone()), session))
}

/// Invalidate a session token.
pub fn sign_out(state: &SharedState, token: &str) -> Result<(), ServiceError> {
    state
        .sessions()
        .remove(token)
        .map(|_| ())
        .ok_or_else(|| ServiceError::Unauthorized("unknown session token".into()))
}

/// Resolve a session token back to the session it was minted for.
pub fn current_user(state: &SharedState, token: &str) -> Result<UserSession, ServiceError> {
    state
        .sessions()
        .get(token)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ServiceError::Unauthorized("unknown session token".into()))
}

fn mint_token(state: &SharedState, session: UserSession) -> String {
    let token = Uuid::new_v4().simple().to_string();
    state.sessions().insert(token.clone(), session);
    token
}
