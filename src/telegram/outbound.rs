use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardMarkup, ParseMode};

use super::bot::{SharedState, TELEGRAM_MSG_LIMIT};

/// Minimum gap between two API calls to the same chat
const MIN_SEND_GAP_MS: u64 = 1100;

/// Find the largest byte index <= `index` that is a valid UTF-8 char boundary
pub(super) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        s.len()
    } else {
        let mut i = index;
        while !s.is_char_boundary(i) {
            i -= 1;
        }
        i
    }
}

/// Shared per-chat rate limiter using reservation pattern.
/// Acquires the lock briefly to calculate and reserve the next API call slot,
/// then releases the lock and sleeps until the reserved time.
pub(super) async fn shared_rate_limit_wait(state: &SharedState, chat_id: ChatId) {
    let min_gap = tokio::time::Duration::from_millis(MIN_SEND_GAP_MS);
    let sleep_until = {
        let mut data = state.lock().await;
        let last = data
            .api_timestamps
            .entry(chat_id)
            .or_insert_with(|| tokio::time::Instant::now() - tokio::time::Duration::from_secs(10));
        let earliest_next = *last + min_gap;
        let now = tokio::time::Instant::now();
        let target = if earliest_next > now {
            earliest_next
        } else {
            now
        };
        *last = target; // Reserve this slot
        target
    }; // Mutex released here
    tokio::time::sleep_until(sleep_until).await;
}

/// Split HTML text into chunks of at most `limit` bytes, preferring newline
/// boundaries and never cutting a UTF-8 char. `<pre>` blocks cut in half are
/// closed and reopened across chunks.
pub(super) fn split_html_chunks(text: &str, limit: usize) -> Vec<String> {
    if text.len() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut remaining = text;
    let mut in_pre = false;

    while !remaining.is_empty() {
        let mut chunk = String::new();
        if in_pre {
            chunk.push_str("<pre>");
        }
        let room = limit.saturating_sub(chunk.len());

        if remaining.len() <= room {
            chunk.push_str(remaining);
            chunks.push(chunk);
            break;
        }

        // Keep 6 bytes for a closing </pre> when this chunk may end inside one
        let window = &remaining[..floor_char_boundary(remaining, room)];
        let budget = if in_pre || window.contains("<pre>") {
            room.saturating_sub(6)
        } else {
            room
        };

        let safe_end = floor_char_boundary(remaining, budget);
        let split_at = match remaining[..safe_end].rfind('\n') {
            Some(pos) if pos > 0 => pos,
            _ => safe_end,
        };
        // Always consume at least one char
        let split_at = if split_at == 0 {
            remaining.chars().next().map_or(remaining.len(), char::len_utf8)
        } else {
            split_at
        };
        let (raw_chunk, rest) = remaining.split_at(split_at);
        chunk.push_str(raw_chunk);

        in_pre = match (raw_chunk.rfind("<pre>"), raw_chunk.rfind("</pre>")) {
            (Some(o), Some(c)) => o > c,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => in_pre,
        };
        if in_pre {
            chunk.push_str("</pre>");
        }
        chunks.push(chunk);

        remaining = rest.strip_prefix('\n').unwrap_or(rest);
    }

    chunks
}

/// Send HTML text, splitting it at Telegram's message limit. The keyboard, if
/// any, is attached to the last chunk.
pub(super) async fn send_html(
    bot: &Bot,
    chat_id: ChatId,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
    state: &SharedState,
) -> ResponseResult<()> {
    let chunks = split_html_chunks(text, TELEGRAM_MSG_LIMIT);
    let last = chunks.len().saturating_sub(1);
    for (i, chunk) in chunks.iter().enumerate() {
        shared_rate_limit_wait(state, chat_id).await;
        let mut req = bot.send_message(chat_id, chunk).parse_mode(ParseMode::Html);
        if i == last {
            if let Some(markup) = keyboard.clone() {
                req = req.reply_markup(markup);
            }
        }
        req.await?;
    }
    Ok(())
}

/// Escape special HTML characters for Telegram HTML parse mode
pub(super) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Truncate a string to max_len bytes, cutting at a safe UTF-8 char boundary
pub(super) fn truncate_str(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let safe_end = floor_char_boundary(s, max_len);
    s[..safe_end].to_string()
}

/// Inline delimiters understood in FAQ text, longest first.
const INLINE_STYLES: &[(&str, &str)] = &[
    ("**", "b"),
    ("__", "u"),
    ("~~", "s"),
    ("||", "tg-spoiler"),
    ("*", "i"),
    ("_", "i"),
];

/// Convert chat-style markdown used in FAQ text into Telegram HTML.
///
/// Handles fenced code blocks, `#` headings, `-`/`*` bullets, `>` quotes,
/// inline code and the delimiters in [`INLINE_STYLES`]. Everything else is
/// escaped verbatim.
pub(super) fn markdown_to_telegram_html(md: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut code_block: Option<Vec<&str>> = None;

    for line in md.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") {
            match code_block.take() {
                Some(code) => {
                    if !code.is_empty() {
                        out.push(format!("<pre>{}</pre>", html_escape(&code.join("\n"))));
                    }
                }
                None => code_block = Some(Vec::new()),
            }
            continue;
        }
        if let Some(code) = code_block.as_mut() {
            code.push(line);
            continue;
        }

        let hashes = trimmed.chars().take_while(|c| *c == '#').count();
        if (1..=6).contains(&hashes) && trimmed[hashes..].starts_with(' ') {
            out.push(format!("<b>{}</b>", convert_inline(trimmed[hashes..].trim())));
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            out.push(format!("• {}", convert_inline(item)));
        } else if let Some(quote) = trimmed.strip_prefix("> ") {
            out.push(format!("<blockquote>{}</blockquote>", convert_inline(quote)));
        } else {
            out.push(convert_inline(line));
        }
    }

    // Unterminated fence: keep its lines as code
    if let Some(code) = code_block {
        if !code.is_empty() {
            out.push(format!("<pre>{}</pre>", html_escape(&code.join("\n"))));
        }
    }

    out.join("\n").trim_end().to_string()
}

/// Inline code spans first, then styled spans on the text around them.
fn convert_inline(text: &str) -> String {
    let mut result = String::new();
    let mut parts = text.split('`');
    let mut in_code = false;
    let mut pending = parts.next().unwrap_or("").to_string();

    for part in parts {
        if in_code {
            result.push_str(&format!("<code>{}</code>", html_escape(&pending)));
            pending = part.to_string();
        } else {
            result.push_str(&convert_styles(&pending));
            pending = part.to_string();
        }
        in_code = !in_code;
    }

    if in_code {
        // Unbalanced backtick: leave it literal
        result.push('`');
    }
    result.push_str(&convert_styles(&pending));
    result
}

fn convert_styles(text: &str) -> String {
    let mut result = String::new();
    let mut rest = text;

    'scan: while !rest.is_empty() {
        for (delim, tag) in INLINE_STYLES {
            let Some(after) = rest.strip_prefix(delim) else {
                continue;
            };
            if let Some(end) = after.find(delim) {
                let inner = &after[..end];
                if !inner.is_empty() && !inner.starts_with(' ') && !inner.ends_with(' ') {
                    result.push_str(&format!("<{tag}>{}</{tag}>", convert_styles(inner)));
                    rest = &after[end + delim.len()..];
                    continue 'scan;
                }
            }
        }
        let Some(c) = rest.chars().next() else {
            break;
        };
        result.push_str(&html_escape(&c.to_string()));
        rest = &rest[c.len_utf8()..];
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_char_boundary_multibyte() {
        let s = "aé"; // 'é' is 2 bytes
        assert_eq!(floor_char_boundary(s, 2), 1);
        assert_eq!(floor_char_boundary(s, 10), s.len());
    }

    #[test]
    fn test_split_short_text_single_chunk() {
        assert_eq!(split_html_chunks("hello", 10), vec!["hello".to_string()]);
    }

    #[test]
    fn test_split_prefers_newlines() {
        let chunks = split_html_chunks("aaaa\nbbbb\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb".to_string(), "cccc".to_string()]);
    }

    #[test]
    fn test_split_reopens_pre_blocks() {
        let text = format!("<pre>{}\n{}</pre>", "x".repeat(30), "y".repeat(30));
        let chunks = split_html_chunks(&text, 40);
        assert!(chunks.len() >= 2);
        assert!(chunks[0].ends_with("</pre>"));
        assert!(chunks[1].starts_with("<pre>"));
        assert!(chunks.iter().all(|c| c.len() <= 40));
    }

    #[test]
    fn test_split_tiny_limit_still_advances() {
        let chunks = split_html_chunks("ççç", 1);
        assert_eq!(chunks, vec!["ç".to_string(), "ç".to_string(), "ç".to_string()]);
    }

    #[test]
    fn test_split_plain_text_uses_full_limit() {
        let chunks = split_html_chunks(&"a".repeat(25), 10);
        assert_eq!(chunks, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn test_truncate_str_char_safe() {
        assert_eq!(truncate_str("ação", 2), "a");
        assert_eq!(truncate_str("abc", 10), "abc");
    }

    #[test]
    fn test_markdown_inline_styles() {
        assert_eq!(
            markdown_to_telegram_html("**bold** and *it* and __under__ ~~gone~~"),
            "<b>bold</b> and <i>it</i> and <u>under</u> <s>gone</s>"
        );
        assert_eq!(
            markdown_to_telegram_html("||secret||"),
            "<tg-spoiler>secret</tg-spoiler>"
        );
    }

    #[test]
    fn test_markdown_escapes_html_and_code() {
        assert_eq!(
            markdown_to_telegram_html("a < b & `x <y> **z**`"),
            "a &lt; b &amp; <code>x &lt;y&gt; **z**</code>"
        );
    }

    #[test]
    fn test_markdown_blocks() {
        let md = "# Title\n- one\n> quoted\n```\nlet x = 1;\n```\nend";
        assert_eq!(
            markdown_to_telegram_html(md),
            "<b>Title</b>\n• one\n<blockquote>quoted</blockquote>\n<pre>let x = 1;</pre>\nend"
        );
    }

    #[test]
    fn test_markdown_unmatched_delimiters_literal() {
        assert_eq!(markdown_to_telegram_html("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(markdown_to_telegram_html("a `b"), "a `b");
    }
}
