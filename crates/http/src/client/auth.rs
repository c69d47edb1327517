//! Authentication API client methods

use super::session::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use super::{ApiRequest, ClientError, PeerzaClient, SessionEvent};
use crate::types::{
    ChangePasswordRequest, LoginRequest, MessageResponse, RegisterRequest, RegisteredUser,
    TokenPair,
};
use tracing::info;

impl PeerzaClient {
    /// Create an account. Does not log in.
    pub async fn register(&self, request: RegisterRequest) -> Result<RegisteredUser, ClientError> {
        let req = ApiRequest::post("/register/").json(&request)?;
        self.execute_public(req).await
    }

    /// Exchange username and password for a credential pair and store it
    pub async fn login(
        &self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<TokenPair, ClientError> {
        let req = ApiRequest::post("/login/").json(&LoginRequest {
            username: username.into(),
            password: password.into(),
        })?;
        let tokens: TokenPair = self.execute_public(req).await?;

        self.session.set(ACCESS_TOKEN_KEY, &tokens.access)?;
        self.session.set(REFRESH_TOKEN_KEY, &tokens.refresh)?;
        info!("Logged in");
        self.events.emit(SessionEvent::LoggedIn);

        Ok(tokens)
    }

    /// Forget both credentials
    pub fn logout(&self) -> Result<(), ClientError> {
        self.session.clear()?;
        info!("Logged out");
        self.events.emit(SessionEvent::LoggedOut);
        Ok(())
    }

    /// Whether an access credential is currently stored
    pub fn is_logged_in(&self) -> Result<bool, ClientError> {
        Ok(self.session.access_token()?.is_some())
    }

    pub async fn change_password(
        &self,
        old_password: impl Into<String>,
        new_password: impl Into<String>,
    ) -> Result<MessageResponse, ClientError> {
        let req = ApiRequest::post("/change-password/").json(&ChangePasswordRequest {
            old_password: old_password.into(),
            new_password: new_password.into(),
        })?;
        self.execute(req).await
    }
}
