mod bot;
mod commands;
mod menu;
mod outbound;
mod render;
mod storage;
mod transfer;

pub use bot::BotOptions;
pub use commands::run_bot;
