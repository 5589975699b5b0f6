use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Duration, Utc};
use helpdesk_shared::{new_id, Role, User};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::jwt;
use crate::error::{ApiResult, AppError};
use crate::store::{DataStore, NewProfile, ProfileChanges};
use crate::websocket::WsManager;

const EVENT_CAPACITY: usize = 64;

/// Emitted whenever a session starts or ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    SignedIn { user_id: String },
    SignedOut { user_id: String },
}

impl SessionEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::SignedIn { user_id } | Self::SignedOut { user_id } => user_id,
        }
    }
}

#[derive(Debug, Clone)]
struct ActiveSession {
    user_id: String,
    expires_at: DateTime<Utc>,
}

/// Signed-in session handed back to the client.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

pub struct SignUp {
    pub email: String,
    pub password: String,
    pub name: String,
    pub unit_id: Option<String>,
}

/// Identity provider: account creation, password sign-in and revocable
/// JWT sessions backed by the `profiles` store.
pub struct IdentityService {
    store: Arc<dyn DataStore>,
    jwt_secret: String,
    session_ttl: Duration,
    sessions: RwLock<HashMap<String, ActiveSession>>,
    events: broadcast::Sender<SessionEvent>,
    ws_manager: Arc<WsManager>,
}

pub fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, hash: &str) -> ApiResult<bool> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn DataStore>,
        jwt_secret: impl Into<String>,
        ws_manager: Arc<WsManager>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            jwt_secret: jwt_secret.into(),
            session_ttl: Duration::hours(jwt::TOKEN_TTL_HOURS),
            sessions: RwLock::new(HashMap::new()),
            events,
            ws_manager,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Session-change stream. Receivers only see events sent after subscribing.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Register a new account. Self-registered accounts are always requesters.
    pub async fn sign_up(&self, request: SignUp) -> ApiResult<User> {
        let password_hash = hash_password(&request.password)?;
        let user = self
            .store
            .insert_profile(NewProfile {
                id: None,
                name: request.name.trim().to_string(),
                email: request.email.trim().to_lowercase(),
                role: Role::User,
                unit_id: request.unit_id,
                password_hash,
            })
            .await?;

        tracing::info!(user_id = %user.id, "account created");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<Session> {
        let credentials = self
            .store
            .find_credentials(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &credentials.password_hash)? {
            tracing::warn!(user_id = %credentials.user.id, "failed sign-in attempt");
            return Err(AppError::InvalidCredentials);
        }

        self.open_session(credentials.user).await
    }

    /// Start a session for an already-verified user.
    pub async fn open_session(&self, user: User) -> ApiResult<Session> {
        let session_id = new_id();
        let token = jwt::create_jwt(&user, &session_id, &self.jwt_secret, self.session_ttl)?;
        self.prune_expired().await;

        let user = self
            .store
            .update_profile(
                &user.id,
                ProfileChanges {
                    is_online: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        // Only registered once the profile write went through
        self.sessions.write().await.insert(
            session_id,
            ActiveSession {
                user_id: user.id.clone(),
                expires_at: token.expires_at,
            },
        );

        tracing::info!(user_id = %user.id, "session opened");
        let _ = self.events.send(SessionEvent::SignedIn {
            user_id: user.id.clone(),
        });

        Ok(Session {
            token: token.token,
            expires_at: token.expires_at,
            user,
        })
    }

    /// End a session. The token stops being accepted immediately.
    pub async fn sign_out(&self, session_id: &str) -> ApiResult<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| AppError::Unauthorized("Session is not active".to_string()))?;
        self.ws_manager.close_session(session_id).await;

        let still_signed_in = self
            .sessions
            .read()
            .await
            .values()
            .any(|s| s.user_id == session.user_id);

        if !still_signed_in {
            self.store
                .update_profile(
                    &session.user_id,
                    ProfileChanges {
                        is_online: Some(false),
                        ..Default::default()
                    },
                )
                .await?;
        }

        tracing::info!(user_id = %session.user_id, "session closed");
        let _ = self.events.send(SessionEvent::SignedOut {
            user_id: session.user_id,
        });
        Ok(())
    }

    /// Resolve a bearer token to the current profile and its session id.
    pub async fn authenticate(&self, token: &str) -> ApiResult<(User, String)> {
        let claims = jwt::verify_jwt(token, &self.jwt_secret)?.claims;
        self.prune_expired().await;

        {
            let sessions = self.sessions.read().await;
            let session = sessions
                .get(&claims.sid)
                .ok_or_else(|| AppError::Unauthorized("Session is not active".to_string()))?;
            if session.user_id != claims.sub {
                return Err(AppError::Unauthorized("Session does not match token".to_string()));
            }
            if session.expires_at <= Utc::now() {
                return Err(AppError::TokenExpired);
            }
        }

        // Role and unit come from the profile, not the token, so changes apply at once
        let user = self
            .store
            .find_profile(&claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok((user, claims.sid))
    }

    pub async fn active_sessions(&self) -> usize {
        self.prune_expired().await;
        self.sessions.read().await.len()
    }

    /// Drop sessions past their expiry and disconnect their sockets.
    async fn prune_expired(&self) {
        let now = Utc::now();
        let expired: Vec<String> = {
            let mut sessions = self.sessions.write().await;
            let expired: Vec<String> = sessions
                .iter()
                .filter(|(_, session)| session.expires_at <= now)
                .map(|(sid, _)| sid.clone())
                .collect();
            for sid in &expired {
                sessions.remove(sid);
            }
            expired
        };

        if expired.is_empty() {
            return;
        }
        for sid in &expired {
            self.ws_manager.close_session(sid).await;
        }
        tracing::debug!(count = expired.len(), "expired sessions removed");
    }
}
