//! Friend request methods

use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::{Decision, Friend, FriendDecision, FriendRequest, FriendRequestSent, OkResponse};

impl PeerzaClient {
    pub async fn friends(&self) -> Result<Vec<Friend>, ClientError> {
        self.execute(ApiRequest::get("/friends/")).await
    }

    /// Pending requests addressed to the logged-in user
    pub async fn friend_requests(&self) -> Result<Vec<FriendRequest>, ClientError> {
        self.execute(ApiRequest::get("/friends/requests/")).await
    }

    /// Send (or re-open) a friend request
    pub async fn send_friend_request(&self, user_id: i64) -> Result<FriendRequestSent, ClientError> {
        self.execute(ApiRequest::post(format!("/friends/request/{user_id}/")))
            .await
    }

    pub async fn respond_friend_request(
        &self,
        request_id: i64,
        action: Decision,
    ) -> Result<OkResponse, ClientError> {
        let req = ApiRequest::post(format!("/friends/request/respond/{request_id}/"))
            .json(&FriendDecision { action })?;
        self.execute(req).await
    }
}
