//! Terminal stand-ins for the platform services the core talks to.

use std::io::Write;

use alertmate_core::alert::AlertSession;
use alertmate_core::notification::{Notification, Notifier};
use alertmate_core::{AlertPresenter, Notice, SmsSender};

/// Foreground presenter: the confirmation dialog becomes a line on stderr.
#[derive(Debug, Default)]
pub struct ConsolePresenter;

impl AlertPresenter for ConsolePresenter {
    fn show_pending(&mut self, session: &AlertSession) {
        let secs = session.fire_at_ms.saturating_sub(session.armed_at_ms) / 1000;
        eprintln!(
            "[alert] {} alert armed, sending in {secs}s (session {})",
            session.source.as_str(),
            session.id
        );
    }

    fn clear_pending(&mut self) {
        eprintln!("[alert] pending alert cleared");
    }

    fn notice(&mut self, notice: Notice) {
        eprintln!("[notice] {notice}");
    }
}

/// Background notifier: posted and withdrawn notifications go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn post(&mut self, notification: Notification) {
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.label.as_str()).collect();
        if actions.is_empty() {
            eprintln!(
                "[notification #{}] {}: {}",
                notification.id, notification.title, notification.text
            );
        } else {
            eprintln!(
                "[notification #{}] {}: {} [{}]",
                notification.id,
                notification.title,
                notification.text,
                actions.join(", ")
            );
        }
    }

    fn cancel(&mut self, id: u32) {
        eprintln!("[notification #{id}] dismissed");
    }
}

/// Prints each outgoing SMS instead of sending it.
pub struct ConsoleSender {
    out: Box<dyn Write>,
}

impl ConsoleSender {
    pub fn stdout() -> Self {
        Self {
            out: Box::new(std::io::stdout()),
        }
    }

    /// For commands whose stdout is reserved for JSON.
    pub fn stderr() -> Self {
        Self {
            out: Box::new(std::io::stderr()),
        }
    }
}

impl SmsSender for ConsoleSender {
    fn send_text(&mut self, to: &str, body: &str) -> Result<(), String> {
        tracing::info!(to, "sms delivered to console");
        writeln!(self.out, "SMS to {to}:\n{body}\n").map_err(|e| e.to_string())
    }
}
