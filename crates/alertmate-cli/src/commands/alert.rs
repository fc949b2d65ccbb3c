use clap::Subcommand;

use alertmate_core::{Config, Event};

use super::{ready_host, CliResult};
use crate::console::ConsoleSender;

#[derive(Subcommand)]
pub enum AlertAction {
    /// Send the emergency alert to every contact now
    Send,
}

pub fn run(action: AlertAction) -> CliResult {
    match action {
        AlertAction::Send => {
            let mut host = ready_host(Config::load()?, ConsoleSender::stdout())?;
            for event in host.send_manual_alert(0) {
                match event {
                    Event::AlertDispatched { report, .. } => {
                        if let Some(err) = report.first_error() {
                            return Err(err.into());
                        }
                    }
                    Event::DispatchFailed { reason, .. } | Event::TriggerAborted { reason, .. } => {
                        return Err(reason.into());
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(())
}
