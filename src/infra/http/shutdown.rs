//! Bounded graceful shutdown for the HTTP host.

use std::{future::Future, io, time::Duration};

use tokio::sync::oneshot;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The server stopped on its own or drained every connection in time.
    Drained,
    /// The grace period elapsed; remaining connections were dropped.
    Forced,
}

/// Drive `server` to completion. Once `requested` fires, in-flight requests get
/// `grace` to finish before the server future is dropped.
pub async fn run_with_grace<F>(
    server: F,
    requested: oneshot::Receiver<()>,
    grace: Duration,
) -> io::Result<ShutdownOutcome>
where
    F: Future<Output = io::Result<()>>,
{
    tokio::pin!(server);

    tokio::select! {
        biased;
        result = &mut server => return result.map(|()| ShutdownOutcome::Drained),
        signal = requested => {
            // A dropped sender means the server released its shutdown hook while finishing.
            if signal.is_err() {
                return server.await.map(|()| ShutdownOutcome::Drained);
            }
        }
    }

    info!(
        target = "sniphook::serve",
        op = "shutdown",
        grace_secs = grace.as_secs_f64(),
        "Shutdown requested; draining in-flight requests"
    );

    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => result.map(|()| ShutdownOutcome::Drained),
        Err(_) => {
            warn!(
                target = "sniphook::serve",
                op = "shutdown",
                result = "forced",
                grace_secs = grace.as_secs_f64(),
                "Graceful shutdown timed out; dropping remaining connections"
            );
            Ok(ShutdownOutcome::Forced)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future;

    use super::*;

    #[tokio::test]
    async fn server_stopping_on_its_own_is_drained() {
        let (_keep, requested) = oneshot::channel();
        let outcome = run_with_grace(async { Ok(()) }, requested, Duration::from_secs(5))
            .await
            .expect("server result");
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn requests_finishing_within_grace_are_drained() {
        let (tx, requested) = oneshot::channel();
        tx.send(()).expect("receiver alive");
        let server = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(())
        };

        let outcome = run_with_grace(server, requested, Duration::from_secs(5))
            .await
            .expect("server result");
        assert_eq!(outcome, ShutdownOutcome::Drained);
    }

    #[tokio::test]
    async fn hung_connections_are_cut_after_grace() {
        let (tx, requested) = oneshot::channel();
        tx.send(()).expect("receiver alive");

        let started = std::time::Instant::now();
        let outcome = run_with_grace(future::pending(), requested, Duration::from_millis(50))
            .await
            .expect("server result");

        assert_eq!(outcome, ShutdownOutcome::Forced);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn server_errors_are_returned() {
        let (_keep, requested) = oneshot::channel();
        let error = run_with_grace(
            async { Err(io::Error::other("accept failed")) },
            requested,
            Duration::from_secs(5),
        )
        .await
        .expect_err("server error");
        assert_eq!(error.to_string(), "accept failed");
    }
}
