use async_trait::async_trait;
use slotkeeper_common::models::ReminderAction;
use slotkeeper_common::{NotificationSink, NotifyError};
use tracing::info;

/// Writes reminders to the log instead of delivering them. Used when no
/// messaging channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify(
        &self,
        customer_id: &str,
        message: &str,
        actions: &[ReminderAction],
    ) -> Result<(), NotifyError> {
        let actions: Vec<String> = actions.iter().map(ReminderAction::callback_data).collect();
        info!(customer_id, ?actions, "reminder (log only): {}", message);
        Ok(())
    }
}
