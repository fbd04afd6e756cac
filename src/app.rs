/// Per-user data directory under `$HOME`.
pub fn dir_name() -> &'static str {
    ".faqbot"
}
