use async_trait::async_trait;
use chrono::Utc;
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::{bson, Database};

use crate::database::MongoCampaignStore;
use crate::error::Error;
use crate::query::{self, ResolvedQuery};

use super::{Campaign, CampaignId, CampaignStatus};

const CAMPAIGNS: &str = "campaigns";

pub async fn initialize(db: &Database) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": CAMPAIGNS,
            "indexes": [
                { "key": { "status": 1 }, "name": "by_status" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn allocate_campaign_id(&self) -> Result<CampaignId, Error>;

    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error>;

    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error>;

    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error>;

    async fn describe_campaign(&self, query: &ResolvedQuery) -> Result<Vec<Campaign>, Error>;

    async fn update_campaign_status(
        &self,
        campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error>;
}

#[async_trait]
impl CampaignStore for MongoCampaignStore {
    #[tracing::instrument(skip(self), err)]
    async fn allocate_campaign_id(&self) -> Result<CampaignId, Error> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters
            .find_one_and_update(
                bson::doc! { "_id": CAMPAIGNS },
                bson::doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?
            .ok_or_else(|| Error::ExistentialState("campaign counter was not upserted".into()))?;

        let seq = counter
            .get_i64("seq")
            .map_err(|err| Error::ExistentialState(format!("campaign counter: {}", err)))?;

        Ok(CampaignId::new(seq as u64))
    }

    #[tracing::instrument(skip(self), err)]
    async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
        self.campaigns.insert_one(campaign, None).await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), err)]
    async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
        let campaigns: Vec<Campaign> = self
            .campaigns
            .find(bson::doc! {}, None)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self), err)]
    async fn fetch_campaign_by_id(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Campaign>, Error> {
        let campaign: Option<Campaign> = self
            .campaigns
            .find_one(bson::doc! { "_id": campaign_id }, None)
            .await?;

        Ok(campaign)
    }

    #[tracing::instrument(skip(self), err)]
    async fn describe_campaign(&self, query: &ResolvedQuery) -> Result<Vec<Campaign>, Error> {
        let options: FindOptions = query::db::find_options(query);

        let campaigns: Vec<Campaign> = self
            .campaigns
            .find(query::db::filter_document(query), options)
            .await?
            .try_collect()
            .await?;

        Ok(campaigns)
    }

    #[tracing::instrument(skip(self), err)]
    async fn update_campaign_status(
        &self,
        mut campaign: Campaign,
        status: CampaignStatus,
    ) -> Result<Campaign, Error> {
        let old_modified_at = bson::DateTime::from_chrono(campaign.modified_at);
        let new_modified_at = bson::DateTime::from_chrono(Utc::now());

        let result = self
            .campaigns
            .update_one(
                bson::doc! {
                    "_id": campaign.id,
                    "status": campaign.status.as_str(),
                    "modified_at": old_modified_at,
                },
                bson::doc! { "$set": { "status": status.as_str(), "modified_at": new_modified_at } },
                None,
            )
            .await?;

        if result.matched_count == 0 {
            return Err(Error::ConcurrentModificationDetected);
        }

        campaign.modified_at = new_modified_at.to_chrono();
        campaign.status = status;

        Ok(campaign)
    }
}
