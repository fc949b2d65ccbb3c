use std::time::{Duration, Instant};

use clap::Subcommand;

use alertmate_core::{Config, Event};

use super::{ready_host, CliResult};
use crate::console::ConsoleSender;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Count down in real time and alert every contact on expiry.
    /// Ctrl-C stops the timer without sending anything.
    Run {
        /// Countdown length in minutes
        #[arg(long)]
        minutes: u32,
    },
}

pub fn run(action: TimerAction) -> CliResult {
    match action {
        TimerAction::Run { minutes } => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(countdown(minutes))
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

async fn countdown(minutes: u32) -> CliResult {
    let mut host = ready_host(Config::load()?, ConsoleSender::stdout())?;
    let started = Instant::now();
    host.start_timer(minutes, 0)?;

    let mut interval = tokio::time::interval(Duration::from_secs(1));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for event in host.tick(elapsed_ms(started)) {
                    match event {
                        Event::TimerTick { remaining_secs, .. } => {
                            println!("{:02}:{:02}", remaining_secs / 60, remaining_secs % 60);
                        }
                        Event::DispatchFailed { reason, .. } | Event::TriggerAborted { reason, .. } => {
                            return Err(reason.into());
                        }
                        _ => {}
                    }
                }
                if !host.timer().is_running() {
                    return Ok(());
                }
            }
            _ = &mut ctrl_c => {
                host.stop_timer(elapsed_ms(started));
                return Ok(());
            }
        }
    }
}
