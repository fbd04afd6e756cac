pub const MSG_FAQ_UNAVAILABLE: &str =
    "⚠ The FAQ is not available right now. An admin can upload one with /import.";
pub const MSG_PERMISSION_DENIED: &str = "Permission denied. This command is for chat admins.";
pub const MSG_MENU_OUTDATED: &str = "This menu is outdated. Use /faq to open a new one.";
pub const MSG_FAQ_NOT_FOUND: &str = "That question no longer exists.";
pub const MSG_CATEGORY_EMPTY: &str = "No questions in this category yet.";
pub const MSG_PICK_CATEGORY: &str = "Pick a category:";
pub const MSG_PICK_QUESTION: &str = "Pick a question:";
pub const MSG_NO_CONTENT: &str = "(no answer available)";
pub const MSG_LINKS: &str = "🔗 Links";
pub const MSG_IMPORT_USAGE: &str =
    "Send the FAQ JSON file as a document with the caption /import.";
pub const MSG_IMPORT_FAILED: &str = "Import failed";
pub const MSG_EXPORT_MISSING: &str = "There is no FAQ file to export yet.";

pub const BTN_BACK: &str = "« Back";

pub const HELP_TEXT_TEMPLATE: &str = "\
<b>{app}</b>
Browse the FAQ with the buttons under the menu message.

<b>Everyone</b>
<code>/faq</code> — open the FAQ menu (groups: admins only)
<code>/languages</code> — list available FAQ languages
<code>/help</code> — show this help

<b>Chat admins</b>
<code>/faq</code> — post the FAQ menu in this chat (replaces the previous one)
<code>/reload</code> — reload the FAQ file from disk
<code>/export</code> — download the current FAQ file
<code>/import</code> — send a JSON document with this caption to replace the FAQ";

pub fn msg_reloaded(categories: usize, faqs: usize) -> String {
    format!("✅ FAQ loaded: {categories} categories, {faqs} questions.")
}

pub fn msg_reload_failed(error: &str) -> String {
    format!("⚠ Reload failed, keeping the previous FAQ: {error}")
}

pub fn msg_languages(languages: &[String]) -> String {
    if languages.is_empty() {
        "No languages available.".to_string()
    } else {
        format!("Available languages: {}", languages.join(", "))
    }
}
