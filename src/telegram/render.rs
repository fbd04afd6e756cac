use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};

use crate::faq::{ContentSegment, MediaKind};
use crate::i18n;

use super::bot::SharedState;
use super::outbound::{html_escape, markdown_to_telegram_html, send_html, shared_rate_limit_wait};

/// One Telegram send derived from FAQ segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum OutgoingPart {
    /// HTML text with URL buttons underneath
    Text {
        html: String,
        links: Vec<(String, String)>,
    },
    Media {
        url: String,
        kind: MediaKind,
    },
}

/// Turn segments into sends, in order.
///
/// Links become buttons under the nearest preceding text; links with no text
/// before them get a short "links" message of their own. The title, if
/// given, heads the first text message.
pub(super) fn plan_parts(title: Option<&str>, segments: &[ContentSegment]) -> Vec<OutgoingPart> {
    let mut parts: Vec<OutgoingPart> = Vec::new();
    let mut title_html = title.map(|t| format!("<b>{}</b>", html_escape(t)));

    for segment in segments {
        match segment {
            ContentSegment::Text { content } => {
                let body = markdown_to_telegram_html(content);
                let html = match title_html.take() {
                    Some(t) => format!("{t}\n\n{body}"),
                    None => body,
                };
                parts.push(OutgoingPart::Text {
                    html,
                    links: Vec::new(),
                });
            }
            ContentSegment::File { url, media_kind } => {
                if let Some(t) = title_html.take() {
                    parts.push(OutgoingPart::Text {
                        html: t,
                        links: Vec::new(),
                    });
                }
                parts.push(OutgoingPart::Media {
                    url: url.clone(),
                    kind: *media_kind,
                });
            }
            ContentSegment::Link { url, label } => {
                if !matches!(parts.last(), Some(OutgoingPart::Text { .. })) {
                    let html = title_html
                        .take()
                        .unwrap_or_else(|| i18n::MSG_LINKS.to_string());
                    parts.push(OutgoingPart::Text {
                        html,
                        links: Vec::new(),
                    });
                }
                if let Some(OutgoingPart::Text { links, .. }) = parts.last_mut() {
                    links.push((label.clone(), url.clone()));
                }
            }
        }
    }

    if parts.is_empty() {
        let html = match title_html {
            Some(t) => format!("{t}\n\n{}", i18n::MSG_NO_CONTENT),
            None => i18n::MSG_NO_CONTENT.to_string(),
        };
        parts.push(OutgoingPart::Text {
            html,
            links: Vec::new(),
        });
    }

    parts
}

fn link_keyboard(links: &[(String, String)]) -> Option<InlineKeyboardMarkup> {
    let rows: Vec<Vec<InlineKeyboardButton>> = links
        .iter()
        .filter_map(|(label, url)| match reqwest::Url::parse(url) {
            Ok(parsed) => Some(vec![InlineKeyboardButton::url(label.clone(), parsed)]),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "link button skipped");
                None
            }
        })
        .collect();
    (!rows.is_empty()).then(|| InlineKeyboardMarkup::new(rows))
}

/// Send a rendered FAQ answer to `chat_id`.
pub(super) async fn send_faq(
    bot: &Bot,
    chat_id: ChatId,
    title: &str,
    segments: &[ContentSegment],
    state: &SharedState,
) -> ResponseResult<()> {
    for part in plan_parts(Some(title), segments) {
        match part {
            OutgoingPart::Text { html, links } => {
                send_html(bot, chat_id, &html, link_keyboard(&links), state).await?;
            }
            OutgoingPart::Media { url, kind } => {
                send_media(bot, chat_id, &url, kind, state).await?;
            }
        }
    }
    Ok(())
}

/// Media is best-effort: when Telegram cannot fetch it, the URL is sent as
/// text instead.
async fn send_media(
    bot: &Bot,
    chat_id: ChatId,
    url: &str,
    kind: MediaKind,
    state: &SharedState,
) -> ResponseResult<()> {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        shared_rate_limit_wait(state, chat_id).await;
        let file = InputFile::url(parsed);
        let sent = match kind {
            MediaKind::Image => bot.send_photo(chat_id, file).await.map(|_| ()),
            MediaKind::Video => bot.send_video(chat_id, file).await.map(|_| ()),
        };
        match sent {
            Ok(()) => return Ok(()),
            Err(e) => tracing::warn!(url, error = %e, "media send failed, falling back to link"),
        }
    }
    send_html(bot, chat_id, &html_escape(url), None, state).await
}
