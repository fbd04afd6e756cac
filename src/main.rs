mod app;
mod auth;
mod faq;
mod i18n;
mod telegram;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Telegram FAQ bot with category menus")]
struct Cli {
    /// Telegram Bot token (saved to config directory)
    #[arg(long)]
    token: Option<String>,

    /// FAQ JSON file (saved to config directory)
    #[arg(long, value_name = "PATH", env = "FAQBOT_FAQ_FILE")]
    faq_file: Option<PathBuf>,

    /// Language used when a translation is missing
    #[arg(long, value_name = "LANG")]
    fallback_lang: Option<String>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct AppConfig {
    token: Option<String>,
    #[serde(default)]
    faq_file: Option<PathBuf>,
    #[serde(default)]
    fallback_lang: Option<String>,
    /// Users allowed to run admin commands in every chat
    #[serde(default)]
    admin_user_ids: Vec<u64>,
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(app::dir_name()))
}

fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.json"))
}

fn load_config() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };
    let Ok(content) = fs::read_to_string(&path) else {
        return AppConfig::default();
    };
    match serde_json::from_str::<AppConfig>(&content) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config");
            AppConfig::default()
        }
    }
}

fn write_config_file(path: &Path, config: &AppConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let serialized = serde_json::to_string_pretty(config)?;
    fs::write(path, &serialized).with_context(|| format!("Failed to write {}", path.display()))?;

    // Config holds the bot token: owner-only read/write
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

fn save_config(config: &AppConfig) {
    let Some(path) = config_path() else {
        return;
    };
    if let Err(e) = write_config_file(&path, config) {
        tracing::warn!(error = %e, "failed to save config");
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Token precedence: `--token`, `FAQBOT_TELEGRAM_TOKEN`, `TELEGRAM_BOT_TOKEN`,
/// then the saved config. Tokens from the CLI or environment are persisted.
fn resolve_token(cli_token: Option<String>, cfg: &mut AppConfig) -> Result<String> {
    let bin_env_var = "FAQBOT_TELEGRAM_TOKEN";

    let supplied = non_empty(cli_token)
        .or_else(|| non_empty(env::var(bin_env_var).ok()))
        .or_else(|| non_empty(env::var("TELEGRAM_BOT_TOKEN").ok()));
    if let Some(token) = supplied {
        if cfg.token.as_deref() != Some(token.as_str()) {
            cfg.token = Some(token.clone());
            save_config(cfg);
        }
        return Ok(token);
    }

    if let Some(token) = non_empty(cfg.token.clone()) {
        return Ok(token);
    }

    anyhow::bail!(
        "Telegram token not found. Use one of:\n  1) {} --token <TOKEN>\n  2) export {}=<TOKEN>\n  3) export TELEGRAM_BOT_TOKEN=<TOKEN>\n  4) save token in ~/{}/config.json",
        env!("CARGO_BIN_NAME"),
        bin_env_var,
        app::dir_name(),
    );
}

/// FAQ file precedence: `--faq-file` / `FAQBOT_FAQ_FILE`, saved config, then
/// `~/.faqbot/faq.json`.
fn resolve_faq_path(cli_path: Option<PathBuf>, cfg: &mut AppConfig) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        if cfg.faq_file.as_ref() != Some(&path) {
            cfg.faq_file = Some(path.clone());
            save_config(cfg);
        }
        return Ok(path);
    }
    if let Some(path) = cfg.faq_file.clone() {
        return Ok(path);
    }
    config_dir()
        .map(|d| d.join("faq.json"))
        .context("Cannot determine home directory for the default FAQ file")
}

fn resolve_fallback_lang(cli_lang: Option<String>, cfg: &AppConfig) -> String {
    non_empty(cli_lang)
        .or_else(|| non_empty(cfg.fallback_lang.clone()))
        .map(|lang| lang.trim().to_string())
        .unwrap_or_else(|| faq::DEFAULT_FALLBACK_LANG.to_string())
}

async fn validate_telegram_token(token: &str) -> Result<()> {
    let url = format!("https://api.telegram.org/bot{}/getMe", token);
    let resp = reqwest::get(&url)
        .await
        .context("Failed to call Telegram getMe API")?;
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        anyhow::bail!(
            "Telegram token validation failed (HTTP {}): {}",
            status,
            body
        );
    }

    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap_or_default();
    let ok = parsed.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if !ok {
        anyhow::bail!("Telegram token validation failed: {}", body);
    }
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("faqbot=info".parse()?);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let mut cfg = load_config();

    let token = resolve_token(cli.token, &mut cfg)?;
    let faq_path = resolve_faq_path(cli.faq_file, &mut cfg)?;
    let fallback_lang = resolve_fallback_lang(cli.fallback_lang, &cfg);

    validate_telegram_token(&token).await?;

    println!("{} {}", env!("CARGO_BIN_NAME"), env!("CARGO_PKG_VERSION"));
    println!("faq_file: {}", faq_path.display());
    println!("fallback_lang: {}", fallback_lang);
    if !cfg.admin_user_ids.is_empty() {
        println!("admins: {} configured", cfg.admin_user_ids.len());
    }
    println!("status: connecting Telegram bot...");

    let options = telegram::BotOptions {
        admin_user_ids: cfg.admin_user_ids,
    };
    telegram::run_bot(&token, faq_path, &fallback_lang, options).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_lang_precedence() {
        let cfg = AppConfig {
            fallback_lang: Some("pt".into()),
            ..AppConfig::default()
        };
        assert_eq!(resolve_fallback_lang(Some("es".into()), &cfg), "es");
        assert_eq!(resolve_fallback_lang(Some("  ".into()), &cfg), "pt");
        assert_eq!(resolve_fallback_lang(None, &AppConfig::default()), "en");
    }

    #[test]
    fn test_config_tolerates_missing_fields() {
        let cfg: AppConfig = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(cfg.token.as_deref(), Some("abc"));
        assert!(cfg.faq_file.is_none());
        assert!(cfg.admin_user_ids.is_empty());
    }

    #[test]
    fn test_write_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let cfg = AppConfig {
            token: Some("t".into()),
            faq_file: Some(PathBuf::from("/srv/faq.json")),
            fallback_lang: None,
            admin_user_ids: vec![42],
        };
        write_config_file(&path, &cfg).unwrap();
        let loaded: AppConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.admin_user_ids, vec![42]);
        assert_eq!(loaded.faq_file, Some(PathBuf::from("/srv/faq.json")));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }
}
