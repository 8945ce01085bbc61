// --- File: crates/slotkeeper_notify/src/lib.rs ---
pub mod log_sink;
pub mod telegram;

pub use log_sink::LogNotifier;
pub use telegram::TelegramNotifier;
