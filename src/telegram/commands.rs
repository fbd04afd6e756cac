use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::{BotCommand, MessageId, ParseMode};

use crate::auth;
use crate::faq::{FaqStore, JsonFileSource};
use crate::i18n;

use super::bot::{BotOptions, SharedData, SharedState};
use super::menu::{category_view, root_view, MenuAction, MenuCallback, MenuView};
use super::outbound::{html_escape, send_html, shared_rate_limit_wait, truncate_str};
use super::render::send_faq;
use super::storage::{load_bot_settings, new_nonce, save_bot_settings, FaqPointer};
use super::transfer::{handle_export_command, handle_import_upload, handle_reload_command};

/// Entry point: start the Telegram bot with long polling.
/// `faq_path` is the JSON file served, reloaded and replaced by imports.
pub async fn run_bot(token: &str, faq_path: PathBuf, fallback_lang: &str, options: BotOptions) {
    let bot = Bot::new(token);
    let bot_settings = load_bot_settings(token);

    // Register bot commands for autocomplete
    let commands = vec![
        BotCommand::new("faq", "Open the FAQ menu"),
        BotCommand::new("languages", "List FAQ languages"),
        BotCommand::new("help", "Show help"),
        BotCommand::new("reload", "Reload the FAQ file (admins)"),
        BotCommand::new("export", "Download the FAQ file (admins)"),
        BotCommand::new("import", "Replace the FAQ file (admins)"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        tracing::warn!(error = %e, "failed to set bot commands");
    }

    let mut faq = FaqStore::with_fallback(
        Box::new(JsonFileSource::new(faq_path.clone())),
        fallback_lang,
    );
    match faq.stats() {
        Some(stats) => println!(
            "  ✓ FAQ: {} categories, {} questions",
            stats.categories, stats.faqs
        ),
        None => println!(
            "  ⚠ FAQ file not loaded ({}); admins can /import one",
            faq.source_description()
        ),
    }
    println!("  ✓ Menus on record: {}", bot_settings.faq_pointers.len());

    let state: SharedState = Arc::new(tokio::sync::Mutex::new(SharedData {
        token: token.to_string(),
        faq,
        faq_source: JsonFileSource::new(faq_path),
        settings: bot_settings,
        options,
        api_timestamps: HashMap::new(),
    }));

    println!("  ✓ Bot connected — Listening for updates");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Strip @botname suffix from commands (e.g. "/faq@mybot" -> "/faq")
fn strip_bot_mention(raw_text: &str) -> String {
    if !raw_text.starts_with('/') {
        return raw_text.to_string();
    }
    let (cmd_part, args_part) = match raw_text.find(char::is_whitespace) {
        Some(pos) => raw_text.split_at(pos),
        None => (raw_text, ""),
    };
    match cmd_part.find('@') {
        Some(at_pos) => format!("{}{}", &cmd_part[..at_pos], args_part),
        None => raw_text.to_string(),
    }
}

/// First word of a command, lowercased.
fn command_name(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .to_lowercase()
}

/// Resolve the caller's permission, asking Telegram only when needed.
async fn permission_for(
    bot: &Bot,
    msg: &Message,
    user_id: UserId,
    state: &SharedState,
) -> auth::PermissionLevel {
    let is_private = msg.chat.is_private();
    let admin_ids = {
        let data = state.lock().await;
        data.options.admin_user_ids.clone()
    };
    let is_chat_admin = if is_private || admin_ids.contains(&user_id.0) {
        false
    } else {
        match bot.get_chat_member(msg.chat.id, user_id).await {
            Ok(member) => member.is_privileged(),
            Err(e) => {
                tracing::warn!(chat_id = msg.chat.id.0, error = %e, "chat member lookup failed");
                false
            }
        }
    };
    auth::get_permission_level(user_id.0, &admin_ids, is_private, is_chat_admin)
}

/// Route incoming messages to appropriate handlers
async fn handle_message(bot: Bot, msg: Message, state: SharedState) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let Some(user) = msg.from.as_ref() else {
        // No user info (e.g. channel post)
        return Ok(());
    };
    let user_id = user.id;
    let user_name = format!("{}({})", user.first_name, user_id.0);
    let is_private = msg.chat.is_private();

    // Documents only matter as /import uploads
    let raw_text = match (msg.document(), msg.text(), msg.caption()) {
        (Some(_), _, Some(caption)) => caption,
        (Some(_), _, None) => return Ok(()),
        (None, Some(text), _) => text,
        (None, None, _) => return Ok(()),
    };
    if !raw_text.starts_with('/') {
        return Ok(());
    }

    let text = strip_bot_mention(raw_text);
    let command = command_name(&text);
    if msg.document().is_some() && command != "/import" {
        return Ok(());
    }

    let risk = auth::classify_command(&text, is_private);
    if risk == auth::CommandRisk::Admin {
        let permission = permission_for(&bot, &msg, user_id, &state).await;
        if !auth::can_execute(permission, risk) {
            tracing::info!(chat_id = chat_id.0, user = %user_name, command = %command, "rejected: not an admin");
            shared_rate_limit_wait(&state, chat_id).await;
            bot.send_message(chat_id, i18n::MSG_PERMISSION_DENIED).await?;
            return Ok(());
        }
    }

    tracing::info!(chat_id = chat_id.0, user = %user_name, "◀ {}", truncate_str(&text, 60));

    match command.as_str() {
        "/help" => handle_help_command(&bot, chat_id, &state).await?,
        "/start" if is_private => post_menu(&bot, chat_id, &state).await?,
        "/start" => handle_help_command(&bot, chat_id, &state).await?,
        "/faq" => post_menu(&bot, chat_id, &state).await?,
        "/languages" => handle_languages_command(&bot, chat_id, &state).await?,
        "/reload" => handle_reload_command(&bot, chat_id, &state).await?,
        "/export" => handle_export_command(&bot, chat_id, &state).await?,
        "/import" => handle_import_upload(&bot, chat_id, &msg, &state).await?,
        _ => {}
    }

    Ok(())
}

/// Handle /help command
async fn handle_help_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
) -> ResponseResult<()> {
    let help = i18n::HELP_TEXT_TEMPLATE.replace("{app}", env!("CARGO_BIN_NAME"));

    shared_rate_limit_wait(state, chat_id).await;
    bot.send_message(chat_id, help)
        .parse_mode(ParseMode::Html)
        .await?;

    Ok(())
}

/// Handle /languages command
async fn handle_languages_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
) -> ResponseResult<()> {
    let languages = {
        let mut data = state.lock().await;
        data.faq.available_languages()
    };
    send_html(bot, chat_id, &html_escape(&i18n::msg_languages(&languages)), None, state).await
}

/// Build the category menu for `lang`, or `None` when no FAQ is loaded.
async fn build_root_view(state: &SharedState, nonce: &str, lang: &str) -> Option<MenuView> {
    let mut data = state.lock().await;
    data.faq.dataset()?;
    let header = data.faq.header(lang);
    let categories = data.faq.categories();
    let languages = data.faq.available_languages();
    Some(root_view(&header, &categories, &languages, nonce, lang))
}

/// Post a fresh FAQ menu, replacing the chat's previous one.
async fn post_menu(bot: &Bot, chat_id: ChatId, state: &SharedState) -> ResponseResult<()> {
    let nonce = new_nonce(chat_id);
    let fallback = {
        let data = state.lock().await;
        data.faq.fallback_lang().to_string()
    };
    let Some(view) = build_root_view(state, &nonce, &fallback).await else {
        shared_rate_limit_wait(state, chat_id).await;
        bot.send_message(chat_id, i18n::MSG_FAQ_UNAVAILABLE).await?;
        return Ok(());
    };

    shared_rate_limit_wait(state, chat_id).await;
    let sent = bot
        .send_message(chat_id, view.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard)
        .await?;

    let previous = {
        let mut data = state.lock().await;
        let previous = data.settings.faq_pointers.insert(
            chat_id.0.to_string(),
            FaqPointer::new(chat_id, sent.id, nonce),
        );
        save_bot_settings(&data.token, &data.settings);
        previous
    };
    tracing::info!(chat_id = chat_id.0, message_id = sent.id.0, "FAQ menu posted");

    if let Some(old) = previous.filter(|p| p.message_id != sent.id.0) {
        shared_rate_limit_wait(state, chat_id).await;
        if let Err(e) = bot.delete_message(chat_id, MessageId(old.message_id)).await {
            tracing::debug!(chat_id = chat_id.0, error = %e, "previous FAQ menu not deleted");
        }
    }
    Ok(())
}

/// Re-render every recorded menu after the FAQ changed. Best-effort.
pub(super) async fn refresh_menus(bot: &Bot, state: &SharedState) {
    let (pointers, fallback) = {
        let data = state.lock().await;
        let pointers: Vec<FaqPointer> = data.settings.faq_pointers.values().cloned().collect();
        (pointers, data.faq.fallback_lang().to_string())
    };

    for pointer in pointers {
        let Some(view) = build_root_view(state, &pointer.nonce, &fallback).await else {
            return;
        };
        let chat_id = ChatId(pointer.chat_id);
        shared_rate_limit_wait(state, chat_id).await;
        if let Err(e) = bot
            .edit_message_text(chat_id, MessageId(pointer.message_id), view.text)
            .parse_mode(ParseMode::Html)
            .reply_markup(view.keyboard)
            .await
        {
            tracing::debug!(chat_id = pointer.chat_id, error = %e, "FAQ menu not refreshed");
        }
    }
}

/// Route menu button presses
async fn handle_callback(bot: Bot, q: CallbackQuery, state: SharedState) -> ResponseResult<()> {
    let Some(callback) = q.data.as_deref().and_then(MenuCallback::decode) else {
        bot.answer_callback_query(q.id.clone()).await?;
        return Ok(());
    };
    let Some(message) = q.regular_message() else {
        bot.answer_callback_query(q.id.clone())
            .text(i18n::MSG_MENU_OUTDATED)
            .await?;
        return Ok(());
    };
    let chat_id = message.chat.id;
    let message_id = message.id;

    let current = {
        let data = state.lock().await;
        data.settings
            .faq_pointers
            .get(&chat_id.0.to_string())
            .map(|p| p.nonce == callback.nonce)
            .unwrap_or(false)
    };
    if !current {
        bot.answer_callback_query(q.id.clone())
            .text(i18n::MSG_MENU_OUTDATED)
            .show_alert(true)
            .await?;
        return Ok(());
    }

    tracing::debug!(chat_id = chat_id.0, user_id = q.from.id.0, action = ?callback.action, lang = %callback.lang, "menu callback");

    match &callback.action {
        MenuAction::Root | MenuAction::Language => {
            bot.answer_callback_query(q.id.clone()).await?;
            match build_root_view(&state, &callback.nonce, &callback.lang).await {
                Some(view) => edit_menu(&bot, chat_id, message_id, view).await,
                None => {
                    shared_rate_limit_wait(&state, chat_id).await;
                    bot.send_message(chat_id, i18n::MSG_FAQ_UNAVAILABLE).await?;
                }
            }
        }
        MenuAction::Category(category_id) => {
            bot.answer_callback_query(q.id.clone()).await?;
            let (label, choices) = {
                let mut data = state.lock().await;
                let label = data
                    .faq
                    .category_label(category_id)
                    .unwrap_or_else(|| category_id.clone());
                (label, data.faq.by_category(category_id))
            };
            let view = category_view(&label, &choices, &callback.nonce, &callback.lang);
            edit_menu(&bot, chat_id, message_id, view).await;
        }
        MenuAction::Question(key) => {
            let answer = {
                let mut data = state.lock().await;
                if data.faq.exists(key) {
                    data.faq.faq_label(key).zip(data.faq.segments(key, &callback.lang))
                } else {
                    None
                }
            };
            let Some((title, segments)) = answer else {
                bot.answer_callback_query(q.id.clone())
                    .text(i18n::MSG_FAQ_NOT_FOUND)
                    .await?;
                return Ok(());
            };
            bot.answer_callback_query(q.id.clone()).await?;
            send_faq(&bot, chat_id, &title, &segments, &state).await?;
        }
    }

    Ok(())
}

/// Edit a menu in place. "Message is not modified" and similar are ignored.
async fn edit_menu(bot: &Bot, chat_id: ChatId, message_id: MessageId, view: MenuView) {
    if let Err(e) = bot
        .edit_message_text(chat_id, message_id, view.text)
        .parse_mode(ParseMode::Html)
        .reply_markup(view.keyboard)
        .await
    {
        tracing::debug!(chat_id = chat_id.0, error = %e, "menu edit failed");
    }
}
