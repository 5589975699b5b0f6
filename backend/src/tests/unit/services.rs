// Identity sessions, chat and audit services

use std::sync::Arc;

use crate::auth::identity::SignUp;
use crate::auth::{IdentityService, SessionEvent};
use crate::error::AppError;
use crate::seed;
use crate::store::DataStore;
use crate::tests::seeded_memory_store;
use crate::websocket::WsManager;

const JWT_SECRET: &str = "unit_test_secret";

async fn identity() -> (IdentityService, Arc<crate::store::MemoryStore>) {
    let store = seeded_memory_store().await;
    (
        IdentityService::new(store.clone(), JWT_SECRET, Arc::new(WsManager::new())),
        store,
    )
}

// ============================================
// Identity Service Tests
// ============================================

#[cfg(test)]
mod identity_tests {
    use super::*;
    use crate::auth::jwt;
    use crate::store::{MockDataStore, StoreError};
    use crate::websocket::{WsConnection, WsMessage};
    use helpdesk_shared::Role;
    use tokio::sync::broadcast::{self, error::RecvError};

    async fn connect_socket(
        manager: &WsManager,
        user_id: &str,
        session_id: &str,
    ) -> broadcast::Receiver<WsMessage> {
        let (tx, rx) = broadcast::channel(10);
        manager
            .add_connection(WsConnection {
                id: uuid::Uuid::new_v4(),
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                role: Role::Admin,
                sender: tx,
            })
            .await;
        rx
    }

    #[tokio::test]
    async fn test_sign_in_with_demo_password() {
        let (identity, _) = identity().await;

        let session = identity
            .sign_in("ADMIN@helpdesk.com", seed::DEMO_PASSWORD)
            .await
            .unwrap();

        assert_eq!(session.user.id, "u1");
        assert!(session.user.is_online);
        assert!(session.expires_at > chrono::Utc::now());

        let (user, _) = identity.authenticate(&session.token).await.unwrap();
        assert_eq!(user.id, "u1");
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let (identity, _) = identity().await;

        let err = identity.sign_in("joao@empresa.com", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let err = identity.sign_in("ghost@empresa.com", "nope").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_token_and_marks_offline() {
        let (identity, store) = identity().await;
        let user = store.find_profile("u2").await.unwrap().unwrap();

        let session = identity.open_session(user).await.unwrap();
        let (_, session_id) = identity.authenticate(&session.token).await.unwrap();
        identity.sign_out(&session_id).await.unwrap();

        let err = identity.authenticate(&session.token).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(!store.find_profile("u2").await.unwrap().unwrap().is_online);
        assert_eq!(identity.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_user_stays_online_while_another_session_is_open() {
        let (identity, store) = identity().await;
        let user = store.find_profile("u3").await.unwrap().unwrap();

        let first = identity.open_session(user.clone()).await.unwrap();
        let _second = identity.open_session(user).await.unwrap();
        let (_, first_sid) = identity.authenticate(&first.token).await.unwrap();
        identity.sign_out(&first_sid).await.unwrap();

        assert!(store.find_profile("u3").await.unwrap().unwrap().is_online);
        assert_eq!(identity.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_failed_profile_write_leaves_no_session() {
        let user = seeded_memory_store().await.find_profile("u2").await.unwrap().unwrap();
        let mut store = MockDataStore::new();
        store
            .expect_update_profile()
            .returning(|_, _| Err(StoreError::Unavailable("connection reset".to_string())));
        let identity = IdentityService::new(Arc::new(store), JWT_SECRET, Arc::new(WsManager::new()));
        let mut events = identity.subscribe();

        let err = identity.open_session(user).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
        assert_eq!(identity.active_sessions().await, 0);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_pruned() {
        let store = seeded_memory_store().await;
        let ws_manager = Arc::new(WsManager::new());
        let identity = IdentityService::new(store.clone(), JWT_SECRET, ws_manager.clone())
            .with_session_ttl(chrono::Duration::zero());
        let user = store.find_profile("u2").await.unwrap().unwrap();

        let session = identity.open_session(user.clone()).await.unwrap();
        let sid = jwt::verify_jwt(&session.token, JWT_SECRET).unwrap().claims.sid;
        let mut socket = connect_socket(&ws_manager, "u2", &sid).await;
        identity.open_session(user).await.unwrap();

        assert_eq!(identity.active_sessions().await, 0);
        assert!(identity.authenticate(&session.token).await.is_err());
        assert_eq!(ws_manager.connection_count().await, 0);
        assert_eq!(socket.recv().await.unwrap().event_type, "session_closed");
    }

    #[tokio::test]
    async fn test_sign_out_closes_live_socket() {
        let store = seeded_memory_store().await;
        let ws_manager = Arc::new(WsManager::new());
        let identity = IdentityService::new(store.clone(), JWT_SECRET, ws_manager.clone());
        let user = store.find_profile("u1").await.unwrap().unwrap();

        let session = identity.open_session(user).await.unwrap();
        let (_, sid) = identity.authenticate(&session.token).await.unwrap();
        let mut socket = connect_socket(&ws_manager, "u1", &sid).await;
        identity.sign_out(&sid).await.unwrap();

        assert_eq!(ws_manager.connection_count().await, 0);
        assert_eq!(socket.recv().await.unwrap().event_type, "session_closed");
        assert!(matches!(socket.recv().await, Err(RecvError::Closed)));
    }

    #[tokio::test]
    async fn test_session_events_are_broadcast() {
        let (identity, store) = identity().await;
        let mut events = identity.subscribe();
        let user = store.find_profile("u2").await.unwrap().unwrap();

        let session = identity.open_session(user).await.unwrap();
        let (_, sid) = identity.authenticate(&session.token).await.unwrap();
        identity.sign_out(&sid).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedIn { user_id: "u2".to_string() }
        );
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::SignedOut { user_id: "u2".to_string() }
        );
    }

    #[tokio::test]
    async fn test_role_change_applies_to_existing_token() {
        let (identity, store) = identity().await;
        let user = store.find_profile("u2").await.unwrap().unwrap();
        let session = identity.open_session(user).await.unwrap();

        store
            .update_profile(
                "u2",
                crate::store::ProfileChanges {
                    role: Some(helpdesk_shared::Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let (user, _) = identity.authenticate(&session.token).await.unwrap();
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn test_sign_up_normalizes_email_and_rejects_duplicates() {
        let (identity, _) = identity().await;

        let user = identity
            .sign_up(SignUp {
                email: "  Nova@Empresa.com ".to_string(),
                password: "segredo123".to_string(),
                name: "Nova Pessoa".to_string(),
                unit_id: Some("2".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(user.email, "nova@empresa.com");
        assert_eq!(user.role, helpdesk_shared::Role::User);

        let err = identity
            .sign_up(SignUp {
                email: "joao@empresa.com".to_string(),
                password: "segredo123".to_string(),
                name: "Outro João".to_string(),
                unit_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let (identity, store) = identity().await;
        let user = store.find_profile("u1").await.unwrap().unwrap();
        let other = IdentityService::new(store.clone(), "another_secret", Arc::new(WsManager::new()));
        let session = other.open_session(user).await.unwrap();

        assert!(identity.authenticate(&session.token).await.is_err());
    }
}

// ============================================
// Chat Service Tests
// ============================================

#[cfg(test)]
mod chat_tests {
    use super::*;
    use crate::services::notifier::EventType;
    use crate::services::{ChatService, Notifier};
    use std::time::Duration;

    #[tokio::test]
    async fn test_unread_counters_follow_messages() {
        let notifier = Notifier::new(Arc::new(WsManager::new()), Duration::ZERO);
        let mut events = notifier.subscribe();
        let chat = ChatService::new(notifier);
        let participants = seed::users();

        chat.post(&participants[0], "Servidor reiniciando às 18h", &participants)
            .await
            .unwrap();
        chat.post(&participants[1], "Ok, obrigado", &participants)
            .await
            .unwrap();

        assert_eq!(chat.unread_count("u1").await, 1);
        assert_eq!(chat.unread_count("u2").await, 1);
        assert_eq!(chat.unread_count("u3").await, 2);

        chat.mark_read("u3").await;
        assert_eq!(chat.unread_count("u3").await, 0);
        assert_eq!(chat.list("u3").await.len(), 2);

        assert_eq!(events.try_recv().unwrap().event_type, EventType::ChatMessage);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected() {
        let notifier = Notifier::new(Arc::new(WsManager::new()), Duration::ZERO);
        let chat = ChatService::new(notifier);
        let participants = seed::users();

        let err = chat.post(&participants[0], "   ", &participants).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError { .. }));
        assert!(chat.list("u1").await.is_empty());
    }
}

// ============================================
// Audit Service Tests
// ============================================

#[cfg(test)]
mod audit_tests {
    use super::*;
    use crate::services::audit::{AuditAction, AuditEntryBuilder, AuditService};

    #[tokio::test]
    async fn test_resource_history_is_newest_first() {
        let audit = AuditService::new();

        audit
            .log(AuditEntryBuilder::new(AuditAction::Create, "ticket").resource("t9").user("u2", None))
            .await;
        audit
            .log(AuditEntryBuilder::new(AuditAction::Update, "ticket").resource("t9").user("u1", None))
            .await;
        audit
            .log(AuditEntryBuilder::new(AuditAction::Reveal, "remote_access").resource("r1").user("u1", None))
            .await;

        let history = audit.resource_history("ticket", "t9").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, AuditAction::Update);

        let recent = audit.recent(1).await;
        assert_eq!(recent[0].resource_type, "remote_access");
        assert!(recent[0].is_sensitive);
    }
}
