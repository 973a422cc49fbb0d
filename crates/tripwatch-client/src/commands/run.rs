//! Foreground poller.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tripwatch_server::SetupOutcome;

use crate::app::App;
use crate::error::ClientResult;

/// Starts every tracked booking and polls until ctrl-c. SIGHUP reloads the
/// booking file.
pub async fn run(app: &App) -> ClientResult<()> {
    let (reload_tx, reload_rx) = mpsc::channel(1);
    tokio::spawn(forward_hangups(reload_tx));
    run_until(
        app,
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
            }
        },
        reload_rx,
    )
    .await
}

/// Starts every tracked booking and polls until `shutdown` completes,
/// reloading from the repository on every message from `reloads`.
pub async fn run_until(
    app: &App,
    shutdown: impl Future<Output = ()>,
    mut reloads: mpsc::Receiver<()>,
) -> ClientResult<()> {
    log_outcomes(&app.runtime().start_all().await?);
    let running = app.runtime().running().await;
    info!(count = running.len(), bookings = ?running, "polling");

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            () = &mut shutdown => break,
            Some(()) = reloads.recv() => match app.runtime().reload().await {
                Ok(outcomes) => {
                    log_outcomes(&outcomes);
                    let running = app.runtime().running().await;
                    info!(count = running.len(), bookings = ?running, "reloaded");
                }
                Err(e) => error!(error = %e, "reload failed"),
            },
        }
    }

    info!("shutting down");
    app.runtime().shutdown().await;
    Ok(())
}

fn log_outcomes(outcomes: &[(String, SetupOutcome)]) {
    for (reference, outcome) in outcomes {
        match outcome {
            SetupOutcome::Active { reports } => {
                let created: usize = reports.iter().map(|r| r.created()).sum();
                info!(%reference, created, "booking active");
            }
            SetupOutcome::Expired(reason) => {
                info!(%reference, ?reason, "booking expired and removed");
            }
            SetupOutcome::Failed(err) if err.is_retryable() => {
                warn!(%reference, error = %err, "initial refresh failed, will retry");
            }
            SetupOutcome::Failed(err) => {
                error!(%reference, error = %err, "booking not polled");
            }
        }
    }
}

#[cfg(unix)]
async fn forward_hangups(reloads: mpsc::Sender<()>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(hangups) => hangups,
        Err(e) => {
            error!(error = %e, "failed to listen for SIGHUP, reload disabled");
            return;
        }
    };
    while hangups.recv().await.is_some() {
        info!("SIGHUP received");
        if reloads.send(()).await.is_err() {
            break;
        }
    }
}

#[cfg(not(unix))]
async fn forward_hangups(_reloads: mpsc::Sender<()>) {}
