use std::collections::HashMap;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::config::ClusterDirectory;
use crate::raft::{
    AppendEntriesRequest, AppendEntriesResponse, NodeId, PeerTransport, RaftError, VoteRequest,
    VoteResponse,
};

use crate::network::proto::raft_service_client::RaftServiceClient;
use crate::network::proto::{GetLeaderRequest, SuspendRequest};

use super::NetworkError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Leader as reported by a node's GetLeader call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderInfo {
    pub id: NodeId,
    pub address: String,
}

#[derive(Clone)]
pub struct RaftClient {
    address: String,
    request_timeout: Option<Duration>,
    client: Option<RaftServiceClient<Channel>>,
}

impl RaftClient {
    /// Client without a per-request deadline, so long calls such as
    /// `suspend` can complete.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            request_timeout: None,
            client: None,
        }
    }

    pub fn with_timeout(address: &str, timeout: Duration) -> Self {
        Self {
            address: address.to_string(),
            request_timeout: Some(timeout),
            client: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn endpoint(&self) -> Result<Endpoint, NetworkError> {
        let mut endpoint = Endpoint::from_shared(format!("http://{}", self.address))
            .map_err(|e| NetworkError::ConnectionError(e.to_string()))?
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.connect_timeout(timeout).timeout(timeout);
        }
        Ok(endpoint)
    }

    pub async fn connect(&mut self) -> Result<(), NetworkError> {
        let channel = self.endpoint()?.connect().await?;
        self.client = Some(RaftServiceClient::new(channel));
        Ok(())
    }

    /// Sets up a channel that dials on first use and redials after failures.
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(&mut self) -> Result<(), NetworkError> {
        let channel = self.endpoint()?.connect_lazy();
        self.client = Some(RaftServiceClient::new(channel));
        Ok(())
    }

    async fn service(&mut self) -> Result<&mut RaftServiceClient<Channel>, NetworkError> {
        if self.client.is_none() {
            self.connect().await?;
        }

        self.client
            .as_mut()
            .ok_or_else(|| NetworkError::ConnectionError("Client not connected".to_string()))
    }

    pub async fn request_vote(&mut self, request: VoteRequest) -> Result<VoteResponse, NetworkError> {
        let response = self
            .service()
            .await?
            .request_vote(Request::new(request.into()))
            .await?
            .into_inner();

        Ok(response.into())
    }

    pub async fn append_entries(
        &mut self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, NetworkError> {
        let response = self
            .service()
            .await?
            .append_entries(Request::new(request.into()))
            .await?
            .into_inner();

        Ok(response.into())
    }

    pub async fn get_leader(&mut self) -> Result<Option<LeaderInfo>, NetworkError> {
        let response = self
            .service()
            .await?
            .get_leader(Request::new(GetLeaderRequest {}))
            .await?
            .into_inner();

        Ok(response.known.then(|| LeaderInfo {
            id: response.leader_id,
            address: response.address,
        }))
    }

    /// Suspends the remote node; resolves once the node has woken up again.
    pub async fn suspend(&mut self, seconds: i64) -> Result<bool, NetworkError> {
        let response = self
            .service()
            .await?
            .suspend(Request::new(SuspendRequest { seconds }))
            .await?
            .into_inner();

        Ok(response.ack)
    }
}

/// Peer transport over gRPC, one lazily connected channel per peer.
pub struct GrpcTransport {
    peers: HashMap<NodeId, RaftClient>,
}

impl GrpcTransport {
    pub fn new(
        directory: &ClusterDirectory,
        self_id: NodeId,
        rpc_timeout: Duration,
    ) -> Result<Self, NetworkError> {
        let mut peers = HashMap::new();
        for peer in directory.peers_of(self_id) {
            let mut client = RaftClient::with_timeout(&peer.address(), rpc_timeout);
            client.connect_lazy()?;
            peers.insert(peer.id, client);
        }
        Ok(Self { peers })
    }

    fn client_for(&self, peer: NodeId) -> Result<RaftClient, RaftError> {
        self.peers.get(&peer).cloned().ok_or(RaftError::UnknownPeer(peer))
    }
}

fn unreachable(peer: NodeId, err: NetworkError) -> RaftError {
    RaftError::Unreachable {
        peer,
        reason: err.to_string(),
    }
}

#[tonic::async_trait]
impl PeerTransport for GrpcTransport {
    async fn request_vote(
        &self,
        peer: NodeId,
        request: VoteRequest,
    ) -> Result<VoteResponse, RaftError> {
        let mut client = self.client_for(peer)?;
        client
            .request_vote(request)
            .await
            .map_err(|e| unreachable(peer, e))
    }

    async fn append_entries(
        &self,
        peer: NodeId,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError> {
        let mut client = self.client_for(peer)?;
        client
            .append_entries(request)
            .await
            .map_err(|e| unreachable(peer, e))
    }
}
