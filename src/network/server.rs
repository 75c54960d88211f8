use std::sync::Arc;
use std::time::Duration;
use tonic::{Request, Response, Status};
use log::debug;

use crate::config::ClusterDirectory;
use crate::network::proto::raft_service_server::RaftService;
use crate::raft::{Raft, RaftError};

use super::proto::*;

/// Exposes a node's election RPCs and operator controls over gRPC.
pub struct RaftServer {
    raft: Raft,
    directory: Arc<ClusterDirectory>,
}

impl RaftServer {
    pub fn new(raft: Raft, directory: Arc<ClusterDirectory>) -> Self {
        Self { raft, directory }
    }
}

/// Suspended nodes look exactly like unreachable ones to their callers.
fn to_status(err: RaftError) -> Status {
    match err {
        RaftError::Suspended | RaftError::AlreadySuspended => Status::unavailable(err.to_string()),
        other => Status::internal(format!("Internal error: {other}")),
    }
}

#[tonic::async_trait]
impl RaftService for RaftServer {
    async fn request_vote(
        &self,
        request: Request<RequestVoteRequest>,
    ) -> Result<Response<RequestVoteResponse>, Status> {
        let req = request.into_inner();
        debug!("Received RequestVote: {:?}", req);

        let reply = self.raft.request_vote(req.into()).await.map_err(to_status)?;
        Ok(Response::new(reply.into()))
    }

    async fn append_entries(
        &self,
        request: Request<AppendEntriesRequest>,
    ) -> Result<Response<AppendEntriesResponse>, Status> {
        let req = request.into_inner();
        debug!("Received AppendEntries: term={}, leader={}", req.term, req.leader_id);

        let reply = self.raft.append_entries(req.into()).await.map_err(to_status)?;
        Ok(Response::new(reply.into()))
    }

    async fn get_leader(
        &self,
        _request: Request<GetLeaderRequest>,
    ) -> Result<Response<GetLeaderResponse>, Status> {
        let leader = self.raft.leader().await.map_err(to_status)?;

        let response = match leader.and_then(|id| self.directory.address(id).map(|addr| (id, addr))) {
            Some((leader_id, address)) => GetLeaderResponse {
                known: true,
                leader_id,
                address,
            },
            None => GetLeaderResponse {
                known: false,
                leader_id: 0,
                address: String::new(),
            },
        };

        Ok(Response::new(response))
    }

    async fn suspend(
        &self,
        request: Request<SuspendRequest>,
    ) -> Result<Response<SuspendResponse>, Status> {
        let req = request.into_inner();
        let seconds = u64::try_from(req.seconds).map_err(|_| {
            Status::invalid_argument(format!("suspend period must not be negative, got {}", req.seconds))
        })?;

        self.raft
            .suspend(Duration::from_secs(seconds))
            .await
            .map_err(to_status)?;

        Ok(Response::new(SuspendResponse { ack: true }))
    }
}
