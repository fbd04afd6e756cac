use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::faq::{truncate_label, Category, FaqChoice};
use crate::i18n;

use super::bot::CALLBACK_DATA_LIMIT;
use super::outbound::{html_escape, markdown_to_telegram_html};

const CALLBACK_PREFIX: &str = "faq";

/// What a menu button does when pressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum MenuAction {
    /// Show the category list
    Root,
    /// Show the questions of a category
    Category(String),
    /// Send the answer of a question
    Question(String),
    /// Show the category list in the callback's language
    Language,
}

/// Decoded callback_data of a menu button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct MenuCallback {
    pub nonce: String,
    pub lang: String,
    pub action: MenuAction,
}

impl MenuCallback {
    pub(super) fn new(nonce: &str, lang: &str, action: MenuAction) -> Self {
        MenuCallback {
            nonce: nonce.to_string(),
            lang: lang.to_string(),
            action,
        }
    }

    /// `faq|<nonce>|<action>|<lang>|<arg>`; `None` when it would not fit
    /// Telegram's callback_data limit or a field contains the separator.
    pub(super) fn encode(&self) -> Option<String> {
        if self.nonce.contains('|') || self.lang.contains('|') {
            return None;
        }
        let (code, arg) = match &self.action {
            MenuAction::Root => ("r", ""),
            MenuAction::Category(id) => ("c", id.as_str()),
            MenuAction::Question(key) => ("q", key.as_str()),
            MenuAction::Language => ("l", ""),
        };
        let data = format!(
            "{CALLBACK_PREFIX}|{}|{code}|{}|{arg}",
            self.nonce, self.lang
        );
        (data.len() <= CALLBACK_DATA_LIMIT).then_some(data)
    }

    pub(super) fn decode(data: &str) -> Option<Self> {
        let mut parts = data.splitn(5, '|');
        if parts.next()? != CALLBACK_PREFIX {
            return None;
        }
        let nonce = parts.next()?;
        let code = parts.next()?;
        let lang = parts.next()?;
        let arg = parts.next()?;
        let action = match code {
            "r" => MenuAction::Root,
            "c" => MenuAction::Category(arg.to_string()),
            "q" => MenuAction::Question(arg.to_string()),
            "l" => MenuAction::Language,
            _ => return None,
        };
        Some(MenuCallback::new(nonce, lang, action))
    }
}

/// Rendered menu message: HTML text plus its keyboard.
pub(super) struct MenuView {
    pub text: String,
    pub keyboard: InlineKeyboardMarkup,
}

fn button(label: &str, callback: MenuCallback) -> Option<InlineKeyboardButton> {
    match callback.encode() {
        Some(data) => Some(InlineKeyboardButton::callback(truncate_label(label), data)),
        None => {
            tracing::warn!(label, action = ?callback.action, "menu button skipped: callback data too long");
            None
        }
    }
}

/// Category list with an optional language row.
pub(super) fn root_view(
    header: &str,
    categories: &[Category],
    languages: &[String],
    nonce: &str,
    lang: &str,
) -> MenuView {
    let header_html = markdown_to_telegram_html(header);
    let text = if header_html.is_empty() {
        i18n::MSG_PICK_CATEGORY.to_string()
    } else {
        format!("{header_html}\n\n{}", i18n::MSG_PICK_CATEGORY)
    };

    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .filter_map(|category| {
            button(
                &category.label,
                MenuCallback::new(nonce, lang, MenuAction::Category(category.id.clone())),
            )
        })
        .map(|b| vec![b])
        .collect();

    if languages.len() > 1 {
        let language_row: Vec<InlineKeyboardButton> = languages
            .iter()
            .filter_map(|code| {
                let label = if code == lang {
                    format!("✓ {code}")
                } else {
                    code.clone()
                };
                button(&label, MenuCallback::new(nonce, code, MenuAction::Language))
            })
            .collect();
        if !language_row.is_empty() {
            rows.push(language_row);
        }
    }

    MenuView {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

/// Questions of one category plus a back button.
pub(super) fn category_view(
    category_label: &str,
    choices: &[FaqChoice],
    nonce: &str,
    lang: &str,
) -> MenuView {
    let prompt = if choices.is_empty() {
        i18n::MSG_CATEGORY_EMPTY
    } else {
        i18n::MSG_PICK_QUESTION
    };
    let text = format!("<b>{}</b>\n\n{prompt}", html_escape(category_label));

    let mut rows: Vec<Vec<InlineKeyboardButton>> = choices
        .iter()
        .filter_map(|choice| {
            button(
                &choice.label,
                MenuCallback::new(nonce, lang, MenuAction::Question(choice.key.clone())),
            )
        })
        .map(|b| vec![b])
        .collect();
    rows.extend(button(i18n::BTN_BACK, MenuCallback::new(nonce, lang, MenuAction::Root)).map(|b| vec![b]));

    MenuView {
        text,
        keyboard: InlineKeyboardMarkup::new(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(button: &InlineKeyboardButton) -> Option<&str> {
        match &button.kind {
            InlineKeyboardButtonKind::CallbackData(data) => Some(data.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_callback_roundtrip_with_separator_in_key() {
        let cb = MenuCallback::new("a1b2c3d4", "pt", MenuAction::Question("how|why".into()));
        let data = cb.encode().unwrap();
        assert_eq!(data, "faq|a1b2c3d4|q|pt|how|why");
        assert_eq!(MenuCallback::decode(&data), Some(cb));
    }

    #[test]
    fn test_callback_rejects_oversized_and_foreign_data() {
        let cb = MenuCallback::new("a1b2c3d4", "en", MenuAction::Question("k".repeat(60)));
        assert_eq!(cb.encode(), None);
        assert_eq!(MenuCallback::decode("other|x|r|en|"), None);
        assert_eq!(MenuCallback::decode("faq|x|z|en|"), None);
        assert_eq!(MenuCallback::decode("faq|x|r"), None);
    }

    #[test]
    fn test_root_view_categories_and_language_row() {
        let categories = vec![
            Category { id: "billing".into(), label: "Billing".into() },
            Category { id: "setup".into(), label: "Setup".into() },
        ];
        let languages = vec!["en".to_string(), "pt".to_string()];
        let view = root_view("**Welcome**", &categories, &languages, "n0nce", "pt");

        assert!(view.text.starts_with("<b>Welcome</b>"));
        let rows = &view.keyboard.inline_keyboard;
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0].text, "Billing");
        assert_eq!(callback_data(&rows[1][0]), Some("faq|n0nce|c|pt|setup"));
        assert_eq!(rows[2][0].text, "en");
        assert_eq!(rows[2][1].text, "✓ pt");
        assert_eq!(callback_data(&rows[2][0]), Some("faq|n0nce|l|en|"));
    }

    #[test]
    fn test_root_view_single_language_has_no_language_row() {
        let categories = vec![Category { id: "general".into(), label: "General".into() }];
        let view = root_view("", &categories, &["en".to_string()], "n", "en");
        assert_eq!(view.text, i18n::MSG_PICK_CATEGORY);
        assert_eq!(view.keyboard.inline_keyboard.len(), 1);
    }

    #[test]
    fn test_category_view_has_back_button() {
        let choices = vec![FaqChoice { key: "refund".into(), label: "Refunds <fast>".into() }];
        let view = category_view("Billing & Plans", &choices, "n", "en");
        assert!(view.text.contains("Billing &amp; Plans"));
        let rows = &view.keyboard.inline_keyboard;
        assert_eq!(rows.len(), 2);
        assert_eq!(callback_data(&rows[0][0]), Some("faq|n|q|en|refund"));
        assert_eq!(rows[1][0].text, i18n::BTN_BACK);
        assert_eq!(callback_data(&rows[1][0]), Some("faq|n|r|en|"));
    }

    #[test]
    fn test_empty_category_view() {
        let view = category_view("Empty", &[], "n", "en");
        assert!(view.text.ends_with(i18n::MSG_CATEGORY_EMPTY));
        assert_eq!(view.keyboard.inline_keyboard.len(), 1);
    }
}
