//! Account-level reads exposed alongside Hour of Power

use crate::api::ApiClient;
use crate::error::Result;
use serde_json::Value;
use std::sync::Arc;

/// Raw account and connection lookups for the logged-in customer
pub struct AccountService {
    client: Arc<ApiClient>,
}

impl AccountService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Connection details (plan, address, meter) as returned by the API
    pub async fn connection_details(&self) -> Result<Value> {
        let customer = self.client.customer().await?;
        self.client
            .get(&format!(
                "/connection/details/{}/{}/",
                customer.customer_id, customer.connection_id
            ))
            .await
    }

    /// Current account balance and billing period figures
    pub async fn running_balance(&self) -> Result<Value> {
        let customer = self.client.customer().await?;
        self.client
            .get(&format!("/account/running_balance/{}/", customer.customer_id))
            .await
    }
}
