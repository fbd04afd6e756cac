/// Permission levels for bot users.
///
/// Who counts as an admin is decided by Telegram's chat-admin model plus the
/// configured admin user IDs; the bot keeps no accounts of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionLevel {
    /// Chat administrator/owner, or a configured admin user
    Admin,
    /// Everyone else
    Member,
}

/// Risk classification for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRisk {
    /// Read-only, anyone may run it: /help, /start, /languages, /faq in a DM
    Low,
    /// Changes what the chat sees or replaces FAQ data: /faq in a group,
    /// /reload, /export, /import
    Admin,
}

/// Classify the risk level of a Telegram command.
///
/// `/faq` posts a persistent menu, which only admins may do in group chats.
pub fn classify_command(command_text: &str, is_private_chat: bool) -> CommandRisk {
    let lower = command_text.trim().to_lowercase();
    let cmd = lower.split_whitespace().next().unwrap_or("");

    match cmd {
        "/help" | "/start" | "/languages" => CommandRisk::Low,
        "/faq" if is_private_chat => CommandRisk::Low,
        "/faq" | "/reload" | "/export" | "/import" => CommandRisk::Admin,
        _ => CommandRisk::Low,
    }
}

/// Check whether a user with the given level can execute a command of the given risk.
pub fn can_execute(permission: PermissionLevel, risk: CommandRisk) -> bool {
    match permission {
        PermissionLevel::Admin => true,
        PermissionLevel::Member => matches!(risk, CommandRisk::Low),
    }
}

/// Determine the permission level for a user in a given context.
///
/// `is_chat_admin` is Telegram's verdict for group chats and is ignored in
/// private chats, where only configured admins are elevated.
pub fn get_permission_level(
    user_id: u64,
    admin_user_ids: &[u64],
    is_private_chat: bool,
    is_chat_admin: bool,
) -> PermissionLevel {
    if admin_user_ids.contains(&user_id) {
        PermissionLevel::Admin
    } else if !is_private_chat && is_chat_admin {
        PermissionLevel::Admin
    } else {
        PermissionLevel::Member
    }
}

/// Maximum accepted size of an uploaded FAQ import (5 MB).
pub const IMPORT_SIZE_LIMIT: u64 = 5 * 1024 * 1024;
