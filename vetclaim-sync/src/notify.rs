//! User-visible notifications
//!
//! The only signal a user gets from a background cycle.

use std::sync::Mutex;
use tracing::info;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Writes notifications to the log
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        info!(title, message, "Notification");
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), message.to_string()));
    }
}

/// Message for a cycle that delivered `count` claims
pub fn claims_synced_message(count: usize) -> String {
    match count {
        1 => "1 claim synced to VetClaim Services".to_string(),
        n => format!("{} claims synced to VetClaim Services", n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify("Claims synced", &claims_synced_message(2));
        assert_eq!(
            notifier.sent(),
            vec![(
                "Claims synced".to_string(),
                "2 claims synced to VetClaim Services".to_string()
            )]
        );
        assert_eq!(claims_synced_message(1), "1 claim synced to VetClaim Services");
    }
}
