use std::collections::HashMap;
use std::sync::Arc;

use teloxide::prelude::*;
use tokio::sync::Mutex;

use crate::faq::{FaqStore, JsonFileSource};

use super::storage::FaqPointer;

/// Bot-level settings persisted to disk
#[derive(Clone, Default)]
pub(super) struct BotSettings {
    /// chat_id (string) -> location of the chat's posted FAQ menu
    pub faq_pointers: HashMap<String, FaqPointer>,
}

/// Runtime options fixed at startup
#[derive(Clone, Debug, Default)]
pub struct BotOptions {
    /// Telegram user IDs allowed to administer the FAQ from any chat
    pub admin_user_ids: Vec<u64>,
}

/// Shared state across all async handlers
pub(super) struct SharedData {
    pub token: String,
    pub faq: FaqStore,
    /// Path of the FAQ JSON file; imports overwrite it
    pub faq_source: JsonFileSource,
    pub settings: BotSettings,
    pub options: BotOptions,
    /// Per-chat timestamp of the last API call (for rate limiting)
    pub api_timestamps: HashMap<ChatId, tokio::time::Instant>,
}

pub(super) type SharedState = Arc<Mutex<SharedData>>;

/// Telegram message character limit
pub(super) const TELEGRAM_MSG_LIMIT: usize = 4096;

/// Telegram callback_data byte limit
pub(super) const CALLBACK_DATA_LIMIT: usize = 64;
