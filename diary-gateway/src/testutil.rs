//! Hand-written fakes for the gateway's injected collaborators.

use crate::auth::TokenVerifier;
use crate::error::GatewayError;
use crate::notes_api::NotesApi;
use crate::telegram::{ChatTransport, ChoiceOption};
use async_trait::async_trait;
use diary_types::{Note, derive_title};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory note store standing in for the remote note service.
pub struct FakeNotesApi {
    notes: Mutex<Vec<Note>>,
    next_id: Mutex<i64>,
    /// Counts list/create/delete calls so tests can assert that unlinked
    /// chats never reach the remote store.
    pub remote_calls: AtomicUsize,
    fail_sync: AtomicBool,
    fail_upstream: AtomicBool,
    pub synced: Mutex<Vec<(String, String)>>,
}

impl FakeNotesApi {
    pub fn new() -> Self {
        Self {
            notes: Mutex::new(Vec::new()),
            next_id: Mutex::new(1),
            remote_calls: AtomicUsize::new(0),
            fail_sync: AtomicBool::new(false),
            fail_upstream: AtomicBool::new(false),
            synced: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_sync(&self) {
        self.fail_sync.store(true, Ordering::SeqCst);
    }

    pub fn fail_upstream(&self) {
        self.fail_upstream.store(true, Ordering::SeqCst);
    }

    pub fn remote_call_count(&self) -> usize {
        self.remote_calls.load(Ordering::SeqCst)
    }

    fn check_upstream(&self) -> Result<(), GatewayError> {
        self.remote_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_upstream.load(Ordering::SeqCst) {
            Err(GatewayError::UpstreamUnavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotesApi for FakeNotesApi {
    async fn list(&self, user_id: &str, limit: Option<u32>) -> Result<Vec<Note>, GatewayError> {
        self.check_upstream()?;
        let notes = self.notes.lock().unwrap();
        let mut owned: Vec<Note> = notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        owned.reverse(); // insertion order -> most recent first
        if let Some(limit) = limit {
            owned.truncate(limit as usize);
        }
        Ok(owned)
    }

    async fn create(&self, user_id: &str, text: &str) -> Result<Note, GatewayError> {
        self.check_upstream()?;
        if text.trim().is_empty() {
            return Err(GatewayError::Validation("Note text is required.".to_string()));
        }
        let mut next_id = self.next_id.lock().unwrap();
        let note = Note {
            id: *next_id,
            user_id: user_id.to_string(),
            title: derive_title(text),
            content: text.to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        *next_id += 1;
        self.notes.lock().unwrap().push(note.clone());
        Ok(note)
    }

    async fn delete(&self, user_id: &str, note_id: i64) -> Result<(), GatewayError> {
        self.check_upstream()?;
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|n| !(n.id == note_id && n.user_id == user_id));
        if notes.len() == before {
            Err(GatewayError::NotFoundOrForbidden)
        } else {
            Ok(())
        }
    }

    async fn sync_chat_id(&self, user_id: &str, chat_id: &str) -> Result<(), GatewayError> {
        if self.fail_sync.load(Ordering::SeqCst) {
            return Err(GatewayError::UpstreamUnavailable);
        }
        self.synced
            .lock()
            .unwrap()
            .push((user_id.to_string(), chat_id.to_string()));
        Ok(())
    }
}

/// Records everything sent through the chat transport.
pub struct FakeTransport {
    pub sent: Mutex<Vec<(String, String)>>,
    pub menus: Mutex<Vec<(String, String, Vec<ChoiceOption>)>>,
    pub edits: Mutex<Vec<(String, i64, String)>>,
    pub acks: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            menus: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            acks: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn last_message_to(&self, chat_id: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == chat_id)
            .map(|(_, text)| text.clone())
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(GatewayError::UpstreamUnavailable)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), GatewayError> {
        self.check()?;
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn send_choice_menu(
        &self,
        chat_id: &str,
        text: &str,
        options: &[ChoiceOption],
    ) -> Result<(), GatewayError> {
        self.check()?;
        self.menus
            .lock()
            .unwrap()
            .push((chat_id.to_string(), text.to_string(), options.to_vec()));
        Ok(())
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.check()?;
        self.edits
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message_id, text.to_string()));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), GatewayError> {
        self.check()?;
        self.acks
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.to_string()));
        Ok(())
    }
}

/// Token verifier backed by a fixed token -> account table.
pub struct FakeVerifier {
    tokens: HashMap<String, String>,
}

impl FakeVerifier {
    pub fn with_token(token: &str, account_id: &str) -> Self {
        let mut tokens = HashMap::new();
        tokens.insert(token.to_string(), account_id.to_string());
        Self { tokens }
    }
}

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str) -> Result<String, GatewayError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(GatewayError::InvalidCredential)
    }
}
