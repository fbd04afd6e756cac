use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use teloxide::prelude::*;

use super::bot::BotSettings;

/// Where a chat's FAQ menu lives, plus the nonce its buttons carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct FaqPointer {
    pub chat_id: i64,
    pub message_id: i32,
    pub nonce: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Compute a short hash key from the bot token (first 16 chars of SHA-256 hex)
pub fn token_hash(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..8]) // 16 hex chars
}

/// Mint a nonce for a freshly posted menu.
pub(super) fn new_nonce(chat_id: ChatId) -> String {
    let now = chrono::Local::now();
    let mut hasher = Sha256::new();
    hasher.update(chat_id.0.to_le_bytes());
    hasher.update(
        now.timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros())
            .to_le_bytes(),
    );
    let result = hasher.finalize();
    hex::encode(&result[..4]) // 8 hex chars
}

impl FaqPointer {
    pub(super) fn new(chat_id: ChatId, message_id: teloxide::types::MessageId, nonce: String) -> Self {
        FaqPointer {
            chat_id: chat_id.0,
            message_id: message_id.0,
            nonce,
            updated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Pointer file path: ~/<app_dir>/faq_pointers.json
fn pointers_path() -> Option<std::path::PathBuf> {
    dirs::home_dir().map(|h| h.join(crate::app::dir_name()).join("faq_pointers.json"))
}

pub(super) fn parse_bot_settings_entry(entry: &serde_json::Value) -> BotSettings {
    let faq_pointers: HashMap<String, FaqPointer> = entry
        .get("faq_pointers")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| {
                    serde_json::from_value::<FaqPointer>(v.clone())
                        .ok()
                        .map(|p| (k.clone(), p))
                })
                .collect()
        })
        .unwrap_or_default();

    BotSettings { faq_pointers }
}

fn read_settings_file(path: &Path, token: &str) -> BotSettings {
    let Ok(content) = fs::read_to_string(path) else {
        return BotSettings::default();
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) else {
        return BotSettings::default();
    };
    let Some(entry) = json.get(token_hash(token)) else {
        return BotSettings::default();
    };
    parse_bot_settings_entry(entry)
}

/// Load bot settings from the app-specific path.
pub(super) fn load_bot_settings(token: &str) -> BotSettings {
    match pointers_path() {
        Some(path) => read_settings_file(&path, token),
        None => BotSettings::default(),
    }
}

fn write_bot_settings_file(path: &Path, token: &str, settings: &BotSettings) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let mut json: serde_json::Value = if let Ok(content) = fs::read_to_string(path) {
        serde_json::from_str(&content).unwrap_or_else(|_| serde_json::json!({}))
    } else {
        serde_json::json!({})
    };
    if !json.is_object() {
        json = serde_json::json!({});
    }

    let key = token_hash(token);
    json[key] = serde_json::json!({
        "faq_pointers": settings.faq_pointers,
    });

    if let Ok(s) = serde_json::to_string_pretty(&json) {
        if let Err(e) = fs::write(path, &s) {
            tracing::warn!(path = %path.display(), error = %e, "failed to write FAQ pointers");
            return;
        }

        // Owner-only read/write (0o600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
        }
    }
}

/// Save bot settings to the app-specific path.
pub(super) fn save_bot_settings(token: &str, settings: &BotSettings) {
    if let Some(path) = pointers_path() {
        write_bot_settings_file(&path, token, settings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::MessageId;

    #[test]
    fn test_token_hash_is_stable_16_hex() {
        let a = token_hash("123:abc");
        assert_eq!(a.len(), 16);
        assert_eq!(a, token_hash("123:abc"));
        assert_ne!(a, token_hash("123:abd"));
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = new_nonce(ChatId(-100123));
        assert_eq!(nonce.len(), 8);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_settings_roundtrip_per_token() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let path = dir.path().join("faq_pointers.json");

        let mut settings = BotSettings::default();
        settings.faq_pointers.insert(
            "-42".to_string(),
            FaqPointer::new(ChatId(-42), MessageId(7), "abcd1234".to_string()),
        );
        write_bot_settings_file(&path, "token-a", &settings);
        write_bot_settings_file(&path, "token-b", &BotSettings::default());

        let loaded = read_settings_file(&path, "token-a");
        let pointer = &loaded.faq_pointers["-42"];
        assert_eq!(pointer.chat_id, -42);
        assert_eq!(pointer.message_id, 7);
        assert_eq!(pointer.nonce, "abcd1234");

        assert!(read_settings_file(&path, "token-b").faq_pointers.is_empty());
        assert!(read_settings_file(&path, "token-c").faq_pointers.is_empty());
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        };
        let path = dir.path().join("faq_pointers.json");
        let _ = fs::write(&path, "not json at all");
        assert!(read_settings_file(&path, "t").faq_pointers.is_empty());

        let entry = serde_json::json!({"faq_pointers": {"1": {"chat_id": "x"}, "2": {"chat_id": 2, "message_id": 3, "nonce": "n"}}});
        let parsed = parse_bot_settings_entry(&entry);
        assert_eq!(parsed.faq_pointers.len(), 1);
        assert_eq!(parsed.faq_pointers["2"].updated_at, "");
    }
}
