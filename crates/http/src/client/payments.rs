//! Pro plan checkout

use super::{ApiRequest, ClientError, PeerzaClient};
use crate::types::CheckoutSession;

impl PeerzaClient {
    /// Open a checkout session for the Pro plan. Payment itself happens on
    /// the payment provider's hosted page.
    pub async fn create_checkout_session(&self) -> Result<CheckoutSession, ClientError> {
        self.execute(ApiRequest::post("/payments/create-session/"))
            .await
    }
}
