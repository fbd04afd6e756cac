use teloxide::prelude::*;
use teloxide::types::InputFile;

use crate::auth;
use crate::faq::validate_import;
use crate::i18n;

use super::bot::SharedState;
use super::commands::refresh_menus;
use super::outbound::{html_escape, send_html, shared_rate_limit_wait};

/// Handle /reload - re-read the FAQ file
pub(super) async fn handle_reload_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
) -> ResponseResult<()> {
    let result = {
        let mut data = state.lock().await;
        data.faq.reload().map(|dataset| (dataset.categories.len(), dataset.faqs.len()))
    };

    let reply = match &result {
        Ok((categories, faqs)) => i18n::msg_reloaded(*categories, *faqs),
        Err(e) => i18n::msg_reload_failed(&e.to_string()),
    };
    send_html(bot, chat_id, &html_escape(&reply), None, state).await?;

    if result.is_ok() {
        refresh_menus(bot, state).await;
    }
    Ok(())
}

/// Handle /export - send the FAQ file as a document
pub(super) async fn handle_export_command(
    bot: &Bot,
    chat_id: ChatId,
    state: &SharedState,
) -> ResponseResult<()> {
    let path = {
        let data = state.lock().await;
        data.faq_source.path().to_path_buf()
    };

    if !path.is_file() {
        shared_rate_limit_wait(state, chat_id).await;
        bot.send_message(chat_id, i18n::MSG_EXPORT_MISSING).await?;
        return Ok(());
    }

    shared_rate_limit_wait(state, chat_id).await;
    bot.send_document(chat_id, InputFile::file(path)).await?;
    Ok(())
}

/// Handle a document sent with the /import caption - replace the FAQ file
pub(super) async fn handle_import_upload(
    bot: &Bot,
    chat_id: ChatId,
    msg: &Message,
    state: &SharedState,
) -> ResponseResult<()> {
    let Some(doc) = msg.document() else {
        shared_rate_limit_wait(state, chat_id).await;
        bot.send_message(chat_id, i18n::MSG_IMPORT_USAGE).await?;
        return Ok(());
    };

    if u64::from(doc.file.size) > auth::IMPORT_SIZE_LIMIT {
        return reply_import_error(bot, chat_id, &too_large(u64::from(doc.file.size)), state).await;
    }

    // Download file from Telegram via HTTP
    shared_rate_limit_wait(state, chat_id).await;
    let file = bot.get_file(&doc.file.id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot.token(),
        file.path
    );
    let buf = match download(&url).await {
        Ok(bytes) => bytes,
        Err(reason) => return reply_import_error(bot, chat_id, &reason, state).await,
    };

    if buf.len() as u64 > auth::IMPORT_SIZE_LIMIT {
        return reply_import_error(bot, chat_id, &too_large(buf.len() as u64), state).await;
    }

    let value: serde_json::Value = match serde_json::from_slice(&buf) {
        Ok(v) => v,
        Err(e) => {
            return reply_import_error(bot, chat_id, &format!("not valid JSON: {e}"), state).await;
        }
    };
    if let Err(e) = validate_import(&value) {
        return reply_import_error(bot, chat_id, &e.to_string(), state).await;
    }

    let result = {
        let mut data = state.lock().await;
        match data.faq_source.write(&value) {
            Ok(()) => data
                .faq
                .reload()
                .map(|dataset| (dataset.categories.len(), dataset.faqs.len())),
            Err(e) => Err(e),
        }
    };

    match result {
        Ok((categories, faqs)) => {
            tracing::info!(chat_id = chat_id.0, categories, faqs, "FAQ imported");
            send_html(
                bot,
                chat_id,
                &html_escape(&i18n::msg_reloaded(categories, faqs)),
                None,
                state,
            )
            .await?;
            refresh_menus(bot, state).await;
            Ok(())
        }
        Err(e) => reply_import_error(bot, chat_id, &e.to_string(), state).await,
    }
}

/// Fetch an uploaded file. The URL embeds the bot token, so it is stripped
/// from every error.
async fn download(url: &str) -> Result<Vec<u8>, String> {
    let resp = reqwest::get(url)
        .await
        .and_then(|resp| resp.error_for_status())
        .map_err(download_error)?;
    let bytes = resp.bytes().await.map_err(download_error)?;
    Ok(bytes.to_vec())
}

fn download_error(e: reqwest::Error) -> String {
    format!("download failed: {}", e.without_url())
}

fn too_large(size: u64) -> String {
    format!(
        "file too large ({:.1} MB). Limit is {} MB.",
        size as f64 / (1024.0 * 1024.0),
        auth::IMPORT_SIZE_LIMIT / (1024 * 1024)
    )
}

async fn reply_import_error(
    bot: &Bot,
    chat_id: ChatId,
    reason: &str,
    state: &SharedState,
) -> ResponseResult<()> {
    tracing::warn!(chat_id = chat_id.0, reason, "FAQ import rejected");
    shared_rate_limit_wait(state, chat_id).await;
    bot.send_message(chat_id, format!("{}: {}", i18n::MSG_IMPORT_FAILED, reason))
        .await?;
    Ok(())
}
