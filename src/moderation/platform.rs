use thiserror::Error;

use crate::moderation::orchestrator::Action;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The target message or channel no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// The two side effects moderation needs from a chat service.
pub trait ChatPlatform {
    fn delete_message(&mut self, message_id: &str) -> Result<(), PlatformError>;
    fn send_message(&mut self, channel_id: &str, content: &str) -> Result<(), PlatformError>;
}

/// Runs `actions` in order.
///
/// Deleting a message that is already gone is not an error. Any other
/// failure is logged and the remaining actions still run.
pub fn execute(actions: &[Action], platform: &mut dyn ChatPlatform) {
    for action in actions {
        let result = match action {
            Action::Delete { message_id } => match platform.delete_message(message_id) {
                Err(PlatformError::NotFound(_)) => {
                    log::debug!("Message {} already deleted", message_id);
                    Ok(())
                }
                other => other,
            },
            Action::Send { channel_id, content } => platform.send_message(channel_id, content),
        };
        match result {
            Ok(()) => log::info!("Executed {:?}", action),
            Err(e) => log::error!("Failed to execute {:?}: {}", action, e),
        }
    }
}
