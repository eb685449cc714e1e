//! SQLite store for the account <-> chat binding.
//!
//! Keyed by account id: at most one chat id per account, replaced on
//! re-link. A chat id contested by two accounts resolves to the most
//! recently updated claim on lookup.

use crate::error::GatewayError;
use diary_types::AccountLink;
use rusqlite::Result as SqliteResult;
use std::sync::Mutex;

pub struct Db {
    conn: Mutex<rusqlite::Connection>,
}

impl Db {
    pub fn open(path: &str) -> SqliteResult<Self> {
        let conn = if path == ":memory:" {
            rusqlite::Connection::open_in_memory()?
        } else {
            rusqlite::Connection::open(path)?
        };
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.create_tables()?;
        Ok(db)
    }

    fn create_tables(&self) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS account_links (
                account_id TEXT PRIMARY KEY,
                chat_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_account_links_chat
             ON account_links(chat_id)",
            [],
        )?;
        Ok(())
    }

    /// Idempotent: creates the link or replaces the account's chat id.
    pub fn upsert_link(&self, account_id: &str, chat_id: &str) -> Result<(), GatewayError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO account_links (account_id, chat_id)
             VALUES (?1, ?2)
             ON CONFLICT(account_id) DO UPDATE SET
                 chat_id = excluded.chat_id,
                 updated_at = datetime('now')",
            rusqlite::params![account_id, chat_id],
        )
        .map_err(|e| GatewayError::Storage(format!("Failed to upsert link: {}", e)))?;
        Ok(())
    }

    pub fn find_link_by_chat_id(&self, chat_id: &str) -> Result<Option<AccountLink>, GatewayError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT account_id, chat_id, created_at
             FROM account_links
             WHERE chat_id = ?1
             ORDER BY updated_at DESC
             LIMIT 1",
            rusqlite::params![chat_id],
            |row| {
                Ok(AccountLink {
                    account_id: row.get(0)?,
                    chat_id: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        );
        match result {
            Ok(link) => Ok(Some(link)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(GatewayError::Storage(format!("Failed to query link: {}", e))),
        }
    }

    /// Returns true if a binding was actually removed.
    pub fn delete_link_by_chat_id(&self, chat_id: &str) -> Result<bool, GatewayError> {
        let conn = self.conn.lock().unwrap();
        let removed = conn
            .execute(
                "DELETE FROM account_links WHERE chat_id = ?1",
                rusqlite::params![chat_id],
            )
            .map_err(|e| GatewayError::Storage(format!("Failed to delete link: {}", e)))?;
        Ok(removed > 0)
    }
}
