//! Shared types for the diary gateway and its RPC clients.

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in a note's title preview.
pub const TITLE_PREVIEW_CHARS: usize = 30;

// =====================================================
// Domain Types
// =====================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: i64,
    /// Owner of the note; immutable after creation.
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountLink {
    pub account_id: String,
    pub chat_id: String,
    pub created_at: String,
}

/// Derive a note title: a prefix of the content, with an ellipsis marker
/// iff the content was actually truncated. Char-boundary safe.
pub fn derive_title(content: &str) -> String {
    let mut chars = content.chars();
    let preview: String = chars.by_ref().take(TITLE_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", preview)
    } else {
        preview
    }
}

// =====================================================
// API Request Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAccountRequest {
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReminderRequest {
    pub chat_id: String,
    pub message: String,
}

// =====================================================
// API Response Types
// =====================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_content_is_title_verbatim() {
        assert_eq!(derive_title("hi"), "hi");
        assert_eq!(derive_title(""), "");
    }

    #[test]
    fn test_content_at_cap_has_no_marker() {
        let content = "a".repeat(TITLE_PREVIEW_CHARS);
        assert_eq!(derive_title(&content), content);
    }

    #[test]
    fn test_long_content_is_truncated_with_marker() {
        let content = "a".repeat(TITLE_PREVIEW_CHARS + 10);
        let title = derive_title(&content);
        assert_eq!(title, format!("{}...", "a".repeat(TITLE_PREVIEW_CHARS)));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let content = "й".repeat(TITLE_PREVIEW_CHARS + 1);
        let title = derive_title(&content);
        assert_eq!(title, format!("{}...", "й".repeat(TITLE_PREVIEW_CHARS)));
    }

    #[test]
    fn test_note_wire_names_are_camel_case() {
        let note = Note {
            id: 1,
            user_id: "u1".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            created_at: "2024-01-01 00:00:00".to_string(),
        };
        let json = serde_json::to_value(&note).unwrap();
        assert!(json.get("userId").is_some());
        assert!(json.get("createdAt").is_some());
    }
}
