//! Background poll scheduler.
//!
//! Drives one booking's refreshes at a fixed interval. Ticks that fall due
//! while a poll is still running are skipped, so at most one poll per
//! booking is ever in flight. A non-retryable failure (rejected credentials)
//! halts scheduled polling; an explicit refresh that succeeds lifts the halt.
//! Poll outcomes themselves are tracked by the coordinator's
//! [`RefreshStatus`](crate::RefreshStatus).

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::RefreshError;

/// Default poll interval: five minutes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(300);

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between polls.
    pub poll_interval: Duration,
    /// Poll once as soon as the scheduler starts.
    pub poll_on_start: bool,
    /// Stop polling after a non-retryable failure.
    pub halt_on_fatal: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_on_start: true,
            halt_on_fatal: true,
        }
    }
}

impl SchedulerConfig {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    pub fn with_poll_on_start(mut self, poll_on_start: bool) -> Self {
        self.poll_on_start = poll_on_start;
        self
    }

    pub fn with_halt_on_fatal(mut self, halt_on_fatal: bool) -> Self {
        self.halt_on_fatal = halt_on_fatal;
        self
    }
}

/// Commands that can be sent to the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// Poll now, even when halted.
    RefreshNow,
    Stop,
}

/// Runs a poll function on a fixed interval.
pub struct Scheduler {
    config: SchedulerConfig,
    halted: Arc<AtomicBool>,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let (command_tx, command_rx) = mpsc::channel(16);
        Self {
            config,
            halted: Arc::new(AtomicBool::new(false)),
            command_tx,
            command_rx,
        }
    }

    /// Returns a handle for sending commands to the scheduler.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle {
            command_tx: self.command_tx.clone(),
            halted: self.halted.clone(),
        }
    }

    /// Runs the scheduler loop until stopped or every handle is dropped.
    pub async fn run<F, Fut>(self, poll_fn: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), RefreshError>> + Send,
    {
        let Self {
            config,
            halted,
            command_tx,
            mut command_rx,
        } = self;
        // Only external handles keep the loop alive.
        drop(command_tx);

        info!(
            interval_secs = config.poll_interval.as_secs(),
            "Scheduler started"
        );

        if config.poll_on_start {
            poll(&config, &halted, &poll_fn).await;
        }

        let mut ticker =
            tokio::time::interval_at(Instant::now() + config.poll_interval, config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if halted.load(Ordering::SeqCst) {
                        debug!("Scheduler halted, skipping poll");
                        continue;
                    }
                    poll(&config, &halted, &poll_fn).await;
                }
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(SchedulerCommand::RefreshNow) => {
                            debug!("Received RefreshNow command");
                            poll(&config, &halted, &poll_fn).await;
                        }
                        Some(SchedulerCommand::Stop) | None => {
                            info!("Scheduler stopping");
                            break;
                        }
                    }
                }
            }
        }
    }
}

async fn poll<F, Fut>(config: &SchedulerConfig, halted: &AtomicBool, poll_fn: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<(), RefreshError>>,
{
    debug!("Starting poll");
    match poll_fn().await {
        Ok(()) => {
            if halted.swap(false, Ordering::SeqCst) {
                info!("Poll succeeded, scheduler resumed");
            }
        }
        Err(e) if !e.is_retryable() && config.halt_on_fatal => {
            error!(error = %e, "Poll failed permanently, halting scheduled polls");
            halted.store(true, Ordering::SeqCst);
        }
        Err(e) => warn!(error = %e, "Poll failed, retrying at next interval"),
    }
}

/// Handle for sending commands to a running scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    command_tx: mpsc::Sender<SchedulerCommand>,
    halted: Arc<AtomicBool>,
}

impl SchedulerHandle {
    pub async fn refresh_now(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::RefreshNow).await
    }

    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SchedulerCommand>> {
        self.command_tx.send(SchedulerCommand::Stop).await
    }

    /// True after a non-retryable failure, until a poll succeeds.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// True once the scheduler loop has exited.
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }
}
