//! Single authority for the chat-identity <-> account-identity binding.

use crate::db::Db;
use crate::error::GatewayError;
use crate::notes_api::NotesApi;
use crate::telegram::ChatTransport;
use std::sync::Arc;

pub struct LinkGateway {
    db: Arc<Db>,
    notes: Arc<dyn NotesApi>,
    transport: Arc<dyn ChatTransport>,
}

impl LinkGateway {
    pub fn new(db: Arc<Db>, notes: Arc<dyn NotesApi>, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            db,
            notes,
            transport,
        }
    }

    /// Telegram chat ids are integers rendered as strings.
    fn validate_chat_id(chat_id: &str) -> Result<&str, GatewayError> {
        let trimmed = chat_id.trim();
        if trimmed.is_empty() {
            return Err(GatewayError::Validation("chatId is required.".to_string()));
        }
        let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GatewayError::Validation(
                "chatId must be a numeric chat identifier.".to_string(),
            ));
        }
        Ok(trimmed)
    }

    /// Binds `chat_id` to `account_id`, replacing any previous binding for
    /// the account. The local store is the source of truth: the registry
    /// sync and the chat confirmation are advisory and must never undo a
    /// link that already succeeded.
    pub async fn link_account(&self, account_id: &str, chat_id: &str) -> Result<(), GatewayError> {
        let chat_id = Self::validate_chat_id(chat_id)?;

        self.db.upsert_link(account_id, chat_id)?;
        log::info!("Linked account {} to chat {}", account_id, chat_id);

        if let Err(e) = self.notes.sync_chat_id(account_id, chat_id).await {
            log::warn!("Registry sync for account {} failed: {}", account_id, e);
        }

        let confirmation =
            "Your account is now linked. Send me a message to save your first note.";
        if let Err(e) = self.transport.send_message(chat_id, confirmation).await {
            log::warn!("Link confirmation to chat {} failed: {}", chat_id, e);
        }

        Ok(())
    }

    pub fn resolve_account_for_chat(&self, chat_id: &str) -> Result<String, GatewayError> {
        match self.db.find_link_by_chat_id(chat_id)? {
            Some(link) => Ok(link.account_id),
            None => Err(GatewayError::NotLinked),
        }
    }

    /// Returns true if a binding was removed.
    pub fn unlink(&self, chat_id: &str) -> Result<bool, GatewayError> {
        let removed = self.db.delete_link_by_chat_id(chat_id)?;
        if removed {
            log::info!("Unlinked chat {}", chat_id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeNotesApi, FakeTransport};

    fn gateway_with(notes: Arc<FakeNotesApi>, transport: Arc<FakeTransport>) -> LinkGateway {
        let db = Arc::new(Db::open(":memory:").expect("in-memory db"));
        LinkGateway::new(db, notes, transport)
    }

    #[tokio::test]
    async fn test_relink_replaces_chat_id() {
        let gateway = gateway_with(Arc::new(FakeNotesApi::new()), Arc::new(FakeTransport::new()));

        gateway.link_account("u1", "111").await.unwrap();
        gateway.link_account("u1", "222").await.unwrap();

        assert_eq!(gateway.resolve_account_for_chat("222").unwrap(), "u1");
        assert_eq!(
            gateway.resolve_account_for_chat("111").unwrap_err(),
            GatewayError::NotLinked
        );
    }

    #[tokio::test]
    async fn test_resolve_after_unlink_is_not_linked() {
        let gateway = gateway_with(Arc::new(FakeNotesApi::new()), Arc::new(FakeTransport::new()));

        gateway.link_account("u1", "555").await.unwrap();
        assert!(gateway.unlink("555").unwrap());

        assert_eq!(
            gateway.resolve_account_for_chat("555").unwrap_err(),
            GatewayError::NotLinked
        );
        assert!(!gateway.unlink("555").unwrap());
    }

    #[tokio::test]
    async fn test_link_survives_registry_sync_failure() {
        let notes = Arc::new(FakeNotesApi::new());
        notes.fail_sync();
        let gateway = gateway_with(notes, Arc::new(FakeTransport::new()));

        gateway.link_account("u1", "555").await.unwrap();
        assert_eq!(gateway.resolve_account_for_chat("555").unwrap(), "u1");
    }

    #[tokio::test]
    async fn test_link_survives_confirmation_failure() {
        let transport = Arc::new(FakeTransport::new());
        transport.fail_sends();
        let gateway = gateway_with(Arc::new(FakeNotesApi::new()), transport);

        gateway.link_account("u1", "555").await.unwrap();
        assert_eq!(gateway.resolve_account_for_chat("555").unwrap(), "u1");
    }

    #[tokio::test]
    async fn test_invalid_chat_ids_rejected() {
        let gateway = gateway_with(Arc::new(FakeNotesApi::new()), Arc::new(FakeTransport::new()));

        for bad in ["", "   ", "abc", "12x", "-"] {
            let err = gateway.link_account("u1", bad).await.unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)), "{:?}", bad);
        }

        // Negative group-style ids are valid.
        gateway.link_account("u1", "-100123").await.unwrap();
    }
}
