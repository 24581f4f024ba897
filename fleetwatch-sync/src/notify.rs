//! Operator notifications.
//!
//! The pipeline composes the message text; a [`Notifier`] only moves it.

use fleetwatch_core::ChangeSet;
use thiserror::Error;

pub const CHANGE_SUBJECT: &str = "fleetwatch notification";
pub const ERROR_SUBJECT: &str = "fleetwatch ERROR";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport failed: {0}")]
    Transport(String),
}

/// Delivers a composed message to operators.
pub trait Notifier {
    fn publish(&self, message: &str, subject: &str) -> Result<(), NotifyError>;
}

/// Stand-in used when notifications are disabled: the message is only logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn publish(&self, message: &str, subject: &str) -> Result<(), NotifyError> {
        tracing::info!("notifications are disabled, would have sent '{subject}':\n{message}");
        Ok(())
    }
}

/// Summary of a change set for operators: new, removed and updated hosts,
/// each section sorted and counted.
pub fn host_change_message(hostname: &str, changes: &ChangeSet) -> String {
    let added: Vec<String> = changes.added().map(|id| id.to_string()).collect();
    let removed: Vec<String> = changes.removed().map(|id| id.to_string()).collect();
    let updated: Vec<String> = changes
        .updated()
        .map(|(id, fields)| {
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            format!("{id} ({})", fields.join(", "))
        })
        .collect();

    let mut message = format!("Monitored hosts changed on {hostname}:\n\n");
    for (title, hosts) in [
        ("New hosts", &added),
        ("Removed hosts", &removed),
        ("Updated hosts", &updated),
    ] {
        message.push_str(&format!("- {title} ({}):\n", hosts.len()));
        for host in hosts {
            message.push_str(&format!("  {host}\n"));
        }
        message.push('\n');
    }
    message
}

pub fn error_message(hostname: &str, error: Option<&str>) -> String {
    match error {
        Some(error) => {
            format!("On host: {hostname}\nfleetwatch encountered the following error:\n\n{error}")
        }
        None => format!(
            "On host: {hostname}\nfleetwatch encountered an unknown error, please investigate.\n"
        ),
    }
}

/// Send through `notifier`, logging instead of failing on delivery errors.
pub fn deliver(notifier: &dyn Notifier, message: &str, subject: &str) {
    if let Err(e) = notifier.publish(message, subject) {
        tracing::error!("could not send '{subject}' notification: {e}");
    }
}
