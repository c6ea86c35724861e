use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::auth::Authenticator;
use crate::campaign::{Campaign, CampaignBody};
use crate::error::Error;

use super::Scheduler;

/// Posts campaigns to the dispatch service as json, any non-2xx reply counts
/// as a failed dispatch.
pub struct HttpScheduler {
    client: Client,
    endpoint: Url,
    authenticator: Arc<dyn Authenticator>,
}

impl HttpScheduler {
    pub fn new(
        endpoint: Url,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<HttpScheduler, Error> {
        let client = Client::builder()
            .user_agent(concat!("trident_server/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpScheduler {
            client,
            endpoint,
            authenticator,
        })
    }
}

#[async_trait]
impl Scheduler for HttpScheduler {
    #[tracing::instrument(skip(self, campaign), fields(campaign_id = ?campaign.id, endpoint = %self.endpoint))]
    async fn schedule(&self, campaign: &Campaign) -> Result<(), Error> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .json(&CampaignBody::render(campaign.clone()));
        let request = self.authenticator.authorize(request).await?;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DispatchRejected {
                campaign_id: campaign.id,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
