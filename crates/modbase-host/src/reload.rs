//! Rebuilding mods on request from outside the process
//!
//! On Unix, SIGUSR2 asks the host to rebuild every registered mod from its
//! template, the same as typing `/reload`. Enabled mods come back enabled and
//! keep their settings.

use tokio::sync::mpsc;

/// A request to rebuild every registered mod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadRequest {
    /// Further requests that arrived before this one was handled
    pub coalesced: usize,
}

/// Stream of reload requests, ending when nothing can send any more
pub struct ReloadRequests {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ReloadRequests {
    fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the next request. A burst of requests queued while the host
    /// was busy is answered by one reload. Returns `None` once the source
    /// has stopped.
    pub async fn next(&mut self) -> Option<ReloadRequest> {
        self.rx.recv().await?;
        let mut coalesced = 0;
        while self.rx.try_recv().is_ok() {
            coalesced += 1;
        }
        Some(ReloadRequest { coalesced })
    }
}

/// Start turning SIGUSR2 into reload requests
#[cfg(unix)]
pub fn listen_for_reloads() -> ReloadRequests {
    use tokio::signal::unix::{signal, SignalKind};
    use tracing::{debug, error};

    let (tx, requests) = ReloadRequests::channel();
    match signal(SignalKind::user_defined2()) {
        Ok(mut sigusr2) => {
            tokio::spawn(async move {
                while sigusr2.recv().await.is_some() {
                    debug!(target: "registry", "SIGUSR2 received");
                    if tx.send(()).is_err() {
                        break;
                    }
                }
                debug!(target: "registry", "No longer reloading mods on SIGUSR2");
            });
        }
        Err(e) => {
            error!(target: "registry", error = %e, "Cannot listen for SIGUSR2, mods reload only through /reload");
        }
    }
    requests
}

/// No reload signal exists here, so the returned stream is already finished
#[cfg(not(unix))]
pub fn listen_for_reloads() -> ReloadRequests {
    tracing::warn!(target: "registry", "No reload signal on this platform, use /reload to rebuild mods");
    let (_, requests) = ReloadRequests::channel();
    requests
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_of_requests_is_one_reload() {
        let (tx, mut requests) = ReloadRequests::channel();
        for _ in 0..3 {
            tx.send(()).unwrap();
        }
        assert_eq!(requests.next().await, Some(ReloadRequest { coalesced: 2 }));

        tx.send(()).unwrap();
        assert_eq!(requests.next().await, Some(ReloadRequest { coalesced: 0 }));
    }

    #[tokio::test]
    async fn test_stream_ends_when_sender_is_gone() {
        let (tx, mut requests) = ReloadRequests::channel();
        tx.send(()).unwrap();
        drop(tx);
        assert!(requests.next().await.is_some());
        assert_eq!(requests.next().await, None);
    }
}
