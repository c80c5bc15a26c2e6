//! HTTP-based network client.
//!
//! Talks to peer nodes' HTTP APIs (`/ping`, `/peers`, `/blocks`,
//! `/transactions`) using a blocking `reqwest` client, one per-call timeout
//! for every RPC. This is the node-to-node analogue of the teacher's
//! HTTP-based external-service client: same client-struct / per-call-
//! timeout / typed-error shape, pointed at a different collaborator.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::block::Block;
use crate::netclient::{NetError, NetworkClient};
use crate::storage::peer_store::Peer;
use crate::tx::SignedTransaction;

pub struct HttpNetworkClient {
    client: Client,
}

impl HttpNetworkClient {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().expect("failed to build HTTP client");
        Self { client }
    }

    fn endpoint(peer: &Peer, path: &str) -> String {
        format!("http://{}:{}/{}", peer.host, peer.port, path.trim_start_matches('/'))
    }

    fn map_transport_err(e: reqwest::Error) -> NetError {
        if let Some(status) = e.status() {
            NetError::ProtocolRejected(status.as_u16())
        } else {
            NetError::Unreachable
        }
    }
}

#[derive(Deserialize)]
struct RegisterAck {
    #[allow(dead_code)]
    host: String,
    #[allow(dead_code)]
    port: u16,
}

impl NetworkClient for HttpNetworkClient {
    fn register_as_inbound(&self, peer: &Peer, own: &Peer) -> Result<(), NetError> {
        let url = Self::endpoint(peer, "/peers");
        let resp = self
            .client
            .post(&url)
            .json(own)
            .send()
            .map_err(Self::map_transport_err)?;
        if !resp.status().is_success() {
            return Err(NetError::ProtocolRejected(resp.status().as_u16()));
        }
        let _ack: RegisterAck = resp.json().map_err(|_| NetError::ProtocolRejected(502))?;
        Ok(())
    }

    fn fetch_peers(&self, peer: &Peer) -> Result<Vec<Peer>, NetError> {
        let url = Self::endpoint(peer, "/peers");
        let resp = self.client.get(&url).send().map_err(Self::map_transport_err)?;
        if !resp.status().is_success() {
            return Err(NetError::ProtocolRejected(resp.status().as_u16()));
        }
        resp.json().map_err(|_| NetError::ProtocolRejected(502))
    }

    fn ping(&self, peer: &Peer) -> Result<(), NetError> {
        let url = Self::endpoint(peer, "/ping");
        let resp = self.client.get(&url).send().map_err(Self::map_transport_err)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NetError::ProtocolRejected(resp.status().as_u16()))
        }
    }

    fn submit_block(&self, peer: &Peer, block: &Block) -> Result<(), NetError> {
        let url = Self::endpoint(peer, "/blocks");
        let resp = self.client.post(&url).json(block).send().map_err(Self::map_transport_err)?;
        if resp.status().is_success() || resp.status().as_u16() == 202 {
            Ok(())
        } else {
            Err(NetError::ProtocolRejected(resp.status().as_u16()))
        }
    }

    fn fetch_chain(&self, peer: &Peer) -> Result<Vec<Block>, NetError> {
        let url = Self::endpoint(peer, "/blocks");
        let resp = self.client.get(&url).send().map_err(Self::map_transport_err)?;
        if !resp.status().is_success() {
            return Err(NetError::ProtocolRejected(resp.status().as_u16()));
        }
        resp.json().map_err(|_| NetError::ProtocolRejected(502))
    }

    fn fetch_pending(&self, peer: &Peer) -> Result<Vec<SignedTransaction>, NetError> {
        let url = Self::endpoint(peer, "/transactions");
        let resp = self.client.get(&url).send().map_err(Self::map_transport_err)?;
        if !resp.status().is_success() {
            return Err(NetError::ProtocolRejected(resp.status().as_u16()));
        }
        resp.json().map_err(|_| NetError::ProtocolRejected(502))
    }

    fn submit_transaction(&self, peer: &Peer, tx: &SignedTransaction) -> Result<(), NetError> {
        let url = Self::endpoint(peer, "/transactions");
        let resp = self.client.post(&url).json(&tx.to_record()).send().map_err(Self::map_transport_err)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(NetError::ProtocolRejected(resp.status().as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_avoids_double_slashes() {
        let peer = Peer { host: "127.0.0.1".to_string(), port: 5001 };
        assert_eq!(HttpNetworkClient::endpoint(&peer, "/ping"), "http://127.0.0.1:5001/ping");
        assert_eq!(HttpNetworkClient::endpoint(&peer, "ping"), "http://127.0.0.1:5001/ping");
    }
}
