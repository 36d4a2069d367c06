//! reqwest-backed access to other nodes.
//!
//! Consensus runs on blocking threads under the ledger lock, so
//! [`PeerTransport::fetch_chain`] drives the async client through the runtime
//! handle. It must never be called from inside an async task.

use crate::messages::{PingMessage, PongMessage};
use anyhow::{Context, Result};
use ledger_core::wire::SyncRequest;
use ledger_core::{PeerError, PeerTransport, ReportedChain};
use reqwest::Client;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    handle: Handle,
}

impl HttpTransport {
    /// Build a transport bound to the current tokio runtime.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        let handle = Handle::try_current().context("no tokio runtime")?;
        Ok(Self { client, handle })
    }

    pub async fn get_chain(&self, peer: &str) -> Result<ReportedChain, PeerError> {
        let url = format!("{peer}/chain");
        debug!(%url, "fetching peer chain");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_owned(),
                status: status.as_u16(),
            });
        }
        response
            .json::<ReportedChain>()
            .await
            .map_err(|e| PeerError::Decode {
                peer: peer.to_owned(),
                reason: e.to_string(),
            })
    }

    /// Push our peers and chain to `peer`'s `/nodes/simple_register`.
    pub async fn push_sync(&self, peer: &str, request: &SyncRequest) -> Result<(), PeerError> {
        let response = self
            .client
            .post(format!("{peer}/nodes/simple_register"))
            .json(request)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(PeerError::Status {
                peer: peer.to_owned(),
                status: status.as_u16(),
            })
        }
    }

    pub async fn pong(&self, peer: &str, ping: &PingMessage) -> Result<PongMessage, PeerError> {
        let response = self
            .client
            .post(format!("{peer}/pong"))
            .json(ping)
            .send()
            .await
            .map_err(|e| unreachable(peer, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PeerError::Status {
                peer: peer.to_owned(),
                status: status.as_u16(),
            });
        }
        response.json().await.map_err(|e| PeerError::Decode {
            peer: peer.to_owned(),
            reason: e.to_string(),
        })
    }
}

fn unreachable(peer: &str, err: reqwest::Error) -> PeerError {
    PeerError::Unreachable {
        peer: peer.to_owned(),
        reason: err.to_string(),
    }
}

impl PeerTransport for HttpTransport {
    fn fetch_chain(&self, peer: &str) -> Result<ReportedChain, PeerError> {
        self.handle.block_on(self.get_chain(peer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn unreachable_peer_is_reported_not_panicked() {
        let transport = HttpTransport::new(Duration::from_millis(500)).unwrap();
        let result = tokio::task::spawn_blocking(move || transport.fetch_chain("http://127.0.0.1:1"))
            .await
            .unwrap();
        assert!(matches!(result, Err(PeerError::Unreachable { .. })));
    }

    #[test]
    fn requires_a_runtime() {
        assert!(HttpTransport::new(Duration::from_secs(1)).is_err());
    }
}
