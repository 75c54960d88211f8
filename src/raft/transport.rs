use super::{AppendEntriesRequest, AppendEntriesResponse, NodeId, RaftError, VoteRequest, VoteResponse};

/// Outbound calls from one node to its peers.
///
/// Any error means "no answer": the caller neither retries nor escalates.
#[tonic::async_trait]
pub trait PeerTransport: Send + Sync + 'static {
    async fn request_vote(
        &self,
        peer: NodeId,
        request: VoteRequest,
    ) -> Result<VoteResponse, RaftError>;

    async fn append_entries(
        &self,
        peer: NodeId,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError>;
}
