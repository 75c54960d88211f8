mod error;

pub mod client;
pub mod server;

pub use self::error::NetworkError;

pub mod proto {
    tonic::include_proto!("raft");
}

pub use client::{GrpcTransport, LeaderInfo, RaftClient};
pub use server::RaftServer;

use crate::raft::{AppendEntriesRequest, AppendEntriesResponse, VoteRequest, VoteResponse};

// Wire <-> core conversions.

impl From<VoteRequest> for proto::RequestVoteRequest {
    fn from(req: VoteRequest) -> Self {
        Self {
            term: req.term,
            candidate_id: req.candidate_id,
        }
    }
}

impl From<proto::RequestVoteRequest> for VoteRequest {
    fn from(req: proto::RequestVoteRequest) -> Self {
        Self {
            term: req.term,
            candidate_id: req.candidate_id,
        }
    }
}

impl From<VoteResponse> for proto::RequestVoteResponse {
    fn from(resp: VoteResponse) -> Self {
        Self {
            term: resp.term,
            vote_granted: resp.vote_granted,
        }
    }
}

impl From<proto::RequestVoteResponse> for VoteResponse {
    fn from(resp: proto::RequestVoteResponse) -> Self {
        Self {
            term: resp.term,
            vote_granted: resp.vote_granted,
        }
    }
}

impl From<AppendEntriesRequest> for proto::AppendEntriesRequest {
    fn from(req: AppendEntriesRequest) -> Self {
        Self {
            term: req.term,
            leader_id: req.leader_id,
        }
    }
}

impl From<proto::AppendEntriesRequest> for AppendEntriesRequest {
    fn from(req: proto::AppendEntriesRequest) -> Self {
        Self {
            term: req.term,
            leader_id: req.leader_id,
        }
    }
}

impl From<AppendEntriesResponse> for proto::AppendEntriesResponse {
    fn from(resp: AppendEntriesResponse) -> Self {
        Self {
            term: resp.term,
            success: resp.success,
        }
    }
}

impl From<proto::AppendEntriesResponse> for AppendEntriesResponse {
    fn from(resp: proto::AppendEntriesResponse) -> Self {
        Self {
            term: resp.term,
            success: resp.success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::Status;

    #[test]
    fn display_includes_error_kind() {
        let conn = NetworkError::ConnectionError("boom".to_string());
        assert!(format!("{conn}").contains("Connection error"));

        let rpc = NetworkError::RpcError(Status::internal("bad"));
        assert!(format!("{rpc}").contains("RPC error"));
    }

    #[test]
    fn from_tonic_status_maps_to_rpc_error() {
        let status = Status::invalid_argument("oops");
        let err: NetworkError = status.into();
        match err {
            NetworkError::RpcError(ref status) => {
                assert!(status.message().contains("oops"));
            }
            ref other => panic!("expected RpcError, got {other:?}"),
        }
        assert!(!err.is_unavailable());
    }

    #[test]
    fn unavailable_status_counts_as_unreachable() {
        let err: NetworkError = Status::unavailable("Node is suspended").into();
        assert!(err.is_unavailable());
        assert!(NetworkError::ConnectionError("refused".into()).is_unavailable());
    }

    #[test]
    fn vote_response_survives_the_wire_shape() {
        let wire: proto::RequestVoteResponse = VoteResponse {
            term: 4,
            vote_granted: true,
        }
        .into();
        assert_eq!(wire.term, 4);
        assert!(wire.vote_granted);
    }
}
