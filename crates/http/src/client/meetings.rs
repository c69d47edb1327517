//! Meeting scheduling and classroom call methods

use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{
    CallStarted, CallStatus, Decision, Meeting, MeetingDecision, MeetingRequest, OkResponse,
};

impl PeerzaClient {
    /// Meetings visible to the logged-in user
    pub async fn meetings(&self) -> Result<Vec<Meeting>, ClientError> {
        self.execute(ApiRequest::get("/meetings/")).await
    }

    /// Pending invitations where the logged-in user is the guest
    pub async fn pending_meetings(&self) -> Result<Vec<Meeting>, ClientError> {
        self.execute(ApiRequest::get("/meetings/pending/")).await
    }

    /// Ask a peer for a meeting; the peer is notified
    pub async fn request_meeting(&self, request: &MeetingRequest) -> Result<Meeting, ClientError> {
        if request.end_datetime <= request.start_datetime {
            return Err(ClientError::InvalidInput(
                "meeting must end after it starts".into(),
            ));
        }

        let req = ApiRequest::post("/meetings/request/").json(request)?;
        self.execute(req).await
    }

    /// Accept or decline a meeting; accepting assigns the classroom room
    pub async fn respond_meeting(
        &self,
        meeting_id: i64,
        response: Decision,
    ) -> Result<Meeting, ClientError> {
        let req = ApiRequest::post(format!("/meetings/{meeting_id}/respond/"))
            .json(&MeetingDecision { response })?;
        self.execute(req).await
    }

    /// Start a classroom call; returns the room to join
    pub async fn start_call(&self, peer_id: i64) -> Result<CallStarted, ClientError> {
        self.execute(ApiRequest::post(format!("/call/start/{peer_id}/")))
            .await
    }

    pub async fn end_call(&self, peer_id: i64) -> Result<OkResponse, ClientError> {
        self.execute(ApiRequest::post(format!("/call/end/{peer_id}/")))
            .await
    }

    /// Whether someone is currently calling the logged-in user
    pub async fn check_calls(&self) -> Result<CallStatus, ClientError> {
        self.execute(ApiRequest::get("/call/check/")).await
    }
}
