//! Telegram chat transport and the getUpdates polling loop.

use crate::bot::BotRouter;
use crate::error::GatewayError;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// One selectable option in a choice menu. The token round-trips through
/// the chat platform's callback payload, so no per-menu state is kept here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    pub label: String,
    pub token: String,
}

/// Outbound side of the chat platform, fakeable in tests.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), GatewayError>;

    async fn send_choice_menu(
        &self,
        chat_id: &str,
        text: &str,
        options: &[ChoiceOption],
    ) -> Result<(), GatewayError>;

    /// Replaces a previously sent message's text and drops its options.
    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<(), GatewayError>;

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), GatewayError>;
}

pub struct TelegramTransport {
    client: reqwest::Client,
    token: String,
}

impl TelegramTransport {
    pub fn new(token: &str) -> Self {
        // Timeout sized to outlast the 30s long poll.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(40))
            .build()
            .expect("Failed to create Telegram client");
        Self {
            client,
            token: token.to_string(),
        }
    }

    async fn api_call(&self, method: &str, params: &Value) -> Result<Value, GatewayError> {
        let url = format!("https://api.telegram.org/bot{}/{}", self.token, method);

        let response = self
            .client
            .post(&url)
            .json(params)
            .send()
            .await
            .map_err(|e| {
                log::error!("Telegram API call {} failed: {}", method, e);
                GatewayError::UpstreamUnavailable
            })?;

        let status = response.status();
        let body: Value = response.json().await.map_err(|e| {
            log::error!("Telegram API {} returned unparsable body: {}", method, e);
            GatewayError::UpstreamUnavailable
        })?;

        // Telegram wraps results in {"ok": true, "result": ...}
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let description = body
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error");
            log::error!("Telegram API error on {} ({}): {}", method, status, description);
            return Err(GatewayError::UpstreamUnavailable);
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), GatewayError> {
        self.api_call("sendMessage", &json!({ "chat_id": chat_id, "text": text }))
            .await
            .map(|_| ())
    }

    async fn send_choice_menu(
        &self,
        chat_id: &str,
        text: &str,
        options: &[ChoiceOption],
    ) -> Result<(), GatewayError> {
        // One button per row, like the web client renders a list.
        let keyboard: Vec<Vec<Value>> = options
            .iter()
            .map(|o| vec![json!({ "text": o.label, "callback_data": o.token })])
            .collect();

        self.api_call(
            "sendMessage",
            &json!({
                "chat_id": chat_id,
                "text": text,
                "reply_markup": { "inline_keyboard": keyboard }
            }),
        )
        .await
        .map(|_| ())
    }

    async fn edit_message(
        &self,
        chat_id: &str,
        message_id: i64,
        text: &str,
    ) -> Result<(), GatewayError> {
        self.api_call(
            "editMessageText",
            &json!({
                "chat_id": chat_id,
                "message_id": message_id,
                "text": text,
                "reply_markup": { "inline_keyboard": [] }
            }),
        )
        .await
        .map(|_| ())
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), GatewayError> {
        self.api_call(
            "answerCallbackQuery",
            &json!({ "callback_query_id": callback_id, "text": text }),
        )
        .await
        .map(|_| ())
    }
}

/// Long-poll loop feeding message and callback events into the router.
/// Poll failures are logged and backed off, never fatal.
pub async fn run_polling(transport: Arc<TelegramTransport>, router: Arc<BotRouter>) {
    let mut offset: i64 = 0;
    log::info!("Telegram poller started");

    loop {
        let params = json!({
            "timeout": 30,
            "offset": offset,
            "allowed_updates": ["message", "callback_query"]
        });

        let updates = match transport.api_call("getUpdates", &params).await {
            Ok(Value::Array(updates)) => updates,
            Ok(_) => Vec::new(),
            Err(e) => {
                log::warn!("getUpdates failed ({}); retrying shortly", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        for update in updates {
            if let Some(update_id) = update.get("update_id").and_then(|v| v.as_i64()) {
                offset = offset.max(update_id + 1);
            }
            dispatch_update(&router, &update).await;
        }
    }
}

async fn dispatch_update(router: &BotRouter, update: &Value) {
    if let Some(msg) = update.get("message") {
        let chat_id = msg.pointer("/chat/id").and_then(|v| v.as_i64());
        let text = msg.get("text").and_then(|v| v.as_str());
        if let (Some(chat_id), Some(text)) = (chat_id, text) {
            router.handle_message(&chat_id.to_string(), text).await;
        }
        return;
    }

    if let Some(cb) = update.get("callback_query") {
        let callback_id = cb.get("id").and_then(|v| v.as_str());
        let data = cb.get("data").and_then(|v| v.as_str());
        let chat_id = cb.pointer("/message/chat/id").and_then(|v| v.as_i64());
        let message_id = cb.pointer("/message/message_id").and_then(|v| v.as_i64());
        if let (Some(callback_id), Some(data), Some(chat_id), Some(message_id)) =
            (callback_id, data, chat_id, message_id)
        {
            router
                .handle_callback(&chat_id.to_string(), message_id, callback_id, data)
                .await;
        } else {
            log::warn!("Ignoring callback_query with missing fields");
        }
    }
}
