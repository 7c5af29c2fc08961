//! Turns a termination signal into a cancelled [`CancellationToken`].
//!
//! See: [`listen`]

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Spawns a listener that cancels `token` on the first SIGINT or SIGTERM (Ctrl + C elsewhere).
///
/// The listener exits after cancelling once, or as soon as `token` is cancelled by anyone else. Later signals are
/// still caught and have no further effect.
pub fn listen(token: CancellationToken) -> JoinHandle<()> {
    listen_for(token, wait_for_signal())
}

/// Spawns a listener that cancels `token` once `signal` resolves with the name of what was received.
pub fn listen_for<F>(token: CancellationToken, signal: F) -> JoinHandle<()>
where
    F: Future<Output = &'static str> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            name = signal => {
                info!("received {name}, cancelling…");
                token.cancel();
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    match (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) {
        (Ok(mut sigint), Ok(mut sigterm)) => tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        },
        (Ok(mut sigint), Err(err)) => {
            warn!("failed to install SIGTERM handler, waiting for SIGINT only: {err}");
            sigint.recv().await;
            "SIGINT"
        }
        (Err(err), Ok(mut sigterm)) => {
            warn!("failed to install SIGINT handler, waiting for SIGTERM only: {err}");
            sigterm.recv().await;
            "SIGTERM"
        }
        (Err(err), Err(_)) => {
            error!("failed to install signal handlers, cancellation is unavailable: {err}");
            std::future::pending().await
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "Ctrl + C",
        Err(err) => {
            error!("failed to install Ctrl + C handler, cancellation is unavailable: {err}");
            std::future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::sync::oneshot;

    #[tokio::test]
    async fn first_signal_cancels_the_token() {
        let token = CancellationToken::new();
        let (tx, rx) = oneshot::channel::<()>();

        let listener = listen_for(token.clone(), async move {
            drop(rx.await);
            "test signal"
        });
        assert!(!token.is_cancelled());

        tx.send(()).unwrap();
        listener.await.unwrap();

        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn listener_exits_when_cancelled_elsewhere() {
        let token = CancellationToken::new();

        let listener = listen_for(token.clone(), std::future::pending());
        token.cancel();

        listener.await.unwrap();
    }

    #[tokio::test]
    async fn os_listener_can_be_aborted() {
        let token = CancellationToken::new();

        let listener = listen(token.clone());
        listener.abort();

        assert!(listener.await.unwrap_err().is_cancelled());
        assert!(!token.is_cancelled());
    }
}
