//! Chat command routing for the note bot.
//!
//! Every inbound text event is either a recognized slash command or a
//! note-creation request. Deletion is a two-step flow: /delete renders a
//! choice menu whose option tokens carry the note id, and the selection
//! callback completes it. No per-menu state is kept server-side, so the
//! flow survives restarts.

use crate::error::GatewayError;
use crate::link::LinkGateway;
use crate::notes_api::NotesApi;
use crate::telegram::{ChatTransport, ChoiceOption};
use std::sync::Arc;

/// How many notes the chat surface shows at once.
const CHAT_LIST_LIMIT: u32 = 5;

const DELETE_TOKEN_PREFIX: &str = "delete:";

const CONNECT_PROMPT: &str =
    "This chat is not linked to an account yet. Run /connect to link it.";

/// Recognized commands for chat users
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// Entry point: `/start`
    Start,
    /// Begin account linking: `/connect`
    Connect,
    /// List recent notes: `/notes`
    Notes,
    /// Offer recent notes for deletion: `/delete`
    Delete,
    /// Drop the account binding: `/logout`
    Logout,
    /// Any other slash command
    Unknown,
}

/// Parse a command from text; `None` means plain text (a note to save).
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }

    let command = text.split_whitespace().next().unwrap_or(text);
    match command {
        "/start" => Some(Command::Start),
        "/connect" => Some(Command::Connect),
        "/notes" => Some(Command::Notes),
        "/delete" => Some(Command::Delete),
        "/logout" => Some(Command::Logout),
        _ => Some(Command::Unknown),
    }
}

pub struct BotRouter {
    links: Arc<LinkGateway>,
    notes: Arc<dyn NotesApi>,
    transport: Arc<dyn ChatTransport>,
    web_app_url: String,
}

impl BotRouter {
    pub fn new(
        links: Arc<LinkGateway>,
        notes: Arc<dyn NotesApi>,
        transport: Arc<dyn ChatTransport>,
        web_app_url: &str,
    ) -> Self {
        Self {
            links,
            notes,
            transport,
            web_app_url: web_app_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn handle_message(&self, chat_id: &str, text: &str) {
        let result = match parse(text) {
            Some(Command::Start) => self.cmd_start(chat_id).await,
            Some(Command::Connect) => self.cmd_connect(chat_id).await,
            Some(Command::Notes) => self.cmd_notes(chat_id).await,
            Some(Command::Delete) => self.cmd_delete(chat_id).await,
            Some(Command::Logout) => self.cmd_logout(chat_id).await,
            Some(Command::Unknown) => {
                self.transport
                    .send_message(
                        chat_id,
                        "Unknown command. Try /notes, /delete, /logout, or just send me text to save it.",
                    )
                    .await
            }
            None => self.save_note(chat_id, text).await,
        };

        if let Err(e) = result {
            log::error!("Chat {}: failed to handle message: {}", chat_id, e);
            let reply = match e {
                GatewayError::UpstreamUnavailable => {
                    "The note service is unavailable right now. Please try again later."
                }
                _ => "Something went wrong. Please try again.",
            };
            let _ = self.transport.send_message(chat_id, reply).await;
        }
    }

    /// Selection event from a choice menu. The account is re-resolved here:
    /// the binding may have changed since the menu was rendered.
    pub async fn handle_callback(
        &self,
        chat_id: &str,
        message_id: i64,
        callback_id: &str,
        data: &str,
    ) {
        let note_id = match data
            .strip_prefix(DELETE_TOKEN_PREFIX)
            .and_then(|id| id.parse::<i64>().ok())
        {
            Some(id) => id,
            None => {
                log::warn!("Chat {}: unrecognized callback data: {:?}", chat_id, data);
                let _ = self
                    .transport
                    .answer_callback(callback_id, "Unrecognized action.")
                    .await;
                return;
            }
        };

        let account_id = match self.links.resolve_account_for_chat(chat_id) {
            Ok(account_id) => account_id,
            Err(GatewayError::NotLinked) => {
                let _ = self
                    .transport
                    .answer_callback(callback_id, "This chat is no longer linked.")
                    .await;
                let _ = self.transport.send_message(chat_id, CONNECT_PROMPT).await;
                return;
            }
            Err(e) => {
                log::error!("Chat {}: failed to resolve account: {}", chat_id, e);
                let _ = self
                    .transport
                    .answer_callback(callback_id, "Something went wrong.")
                    .await;
                return;
            }
        };

        match self.notes.delete(&account_id, note_id).await {
            Ok(()) => {
                let _ = self
                    .transport
                    .answer_callback(callback_id, "Note deleted.")
                    .await;
                // Drop the now-stale options from the original message.
                if let Err(e) = self
                    .transport
                    .edit_message(chat_id, message_id, "The note has been deleted.")
                    .await
                {
                    log::warn!("Chat {}: failed to edit delete menu: {}", chat_id, e);
                }
            }
            Err(GatewayError::NotFoundOrForbidden) => {
                // Covers the double-tap on the same token; the message is
                // left intact so the remaining options stay usable.
                let _ = self
                    .transport
                    .answer_callback(callback_id, "That note is already gone.")
                    .await;
            }
            Err(e) => {
                log::error!("Chat {}: failed to delete note {}: {}", chat_id, note_id, e);
                let _ = self
                    .transport
                    .answer_callback(callback_id, "Could not delete the note. Please try again.")
                    .await;
            }
        }
    }

    /// Resolves the chat's account, or prompts for /connect and returns
    /// `None` without touching the note store.
    async fn resolve_or_prompt(&self, chat_id: &str) -> Result<Option<String>, GatewayError> {
        match self.links.resolve_account_for_chat(chat_id) {
            Ok(account_id) => Ok(Some(account_id)),
            Err(GatewayError::NotLinked) => {
                self.transport.send_message(chat_id, CONNECT_PROMPT).await?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn cmd_start(&self, chat_id: &str) -> Result<(), GatewayError> {
        let text = match self.links.resolve_account_for_chat(chat_id) {
            Ok(_) => {
                "Welcome back! Send me any message to save it as a note, \
                 /notes to list recent notes, /delete to remove one."
            }
            Err(GatewayError::NotLinked) => {
                "Welcome! Run /connect to link this chat to your web account first."
            }
            Err(e) => return Err(e),
        };
        self.transport.send_message(chat_id, text).await
    }

    async fn cmd_connect(&self, chat_id: &str) -> Result<(), GatewayError> {
        match self.links.resolve_account_for_chat(chat_id) {
            Ok(_) => {
                self.transport
                    .send_message(chat_id, "This chat is already linked to your account.")
                    .await
            }
            Err(GatewayError::NotLinked) => {
                let invitation = format!(
                    "Open {}/link?chatId={} to finish linking this chat to your account.",
                    self.web_app_url, chat_id
                );
                self.transport.send_message(chat_id, &invitation).await
            }
            Err(e) => Err(e),
        }
    }

    async fn cmd_notes(&self, chat_id: &str) -> Result<(), GatewayError> {
        let Some(account_id) = self.resolve_or_prompt(chat_id).await? else {
            return Ok(());
        };

        let notes = self.notes.list(&account_id, Some(CHAT_LIST_LIMIT)).await?;
        if notes.is_empty() {
            return self
                .transport
                .send_message(chat_id, "You have no notes yet.")
                .await;
        }

        let lines: Vec<String> = notes
            .iter()
            .enumerate()
            .map(|(i, n)| format!("{}. {}", i + 1, n.title))
            .collect();
        let text = format!("Your latest notes:\n{}", lines.join("\n"));
        self.transport.send_message(chat_id, &text).await
    }

    async fn cmd_delete(&self, chat_id: &str) -> Result<(), GatewayError> {
        let Some(account_id) = self.resolve_or_prompt(chat_id).await? else {
            return Ok(());
        };

        let notes = self.notes.list(&account_id, Some(CHAT_LIST_LIMIT)).await?;
        if notes.is_empty() {
            return self
                .transport
                .send_message(chat_id, "You have nothing to delete yet.")
                .await;
        }

        let options: Vec<ChoiceOption> = notes
            .iter()
            .map(|n| ChoiceOption {
                label: format!("❌ {}", n.title),
                token: format!("{}{}", DELETE_TOKEN_PREFIX, n.id),
            })
            .collect();
        self.transport
            .send_choice_menu(chat_id, "Which note do you want to delete?", &options)
            .await
    }

    async fn cmd_logout(&self, chat_id: &str) -> Result<(), GatewayError> {
        let text = if self.links.unlink(chat_id)? {
            "This chat has been unlinked from your account."
        } else {
            "This chat was not linked to any account."
        };
        self.transport.send_message(chat_id, text).await
    }

    async fn save_note(&self, chat_id: &str, text: &str) -> Result<(), GatewayError> {
        let Some(account_id) = self.resolve_or_prompt(chat_id).await? else {
            return Ok(());
        };

        self.notes.create(&account_id, text).await?;
        self.transport.send_message(chat_id, "✅ Note saved!").await
    }
}
