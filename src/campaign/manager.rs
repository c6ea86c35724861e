use chrono::Utc;
use mongodb::bson;
use tracing::info;

use crate::database::Database;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::query::{EntityKind, Query, Record};

use super::{Campaign, CampaignBody, CampaignId, CampaignParams, CampaignStatus};

fn validate(params: &CampaignParams) -> Result<(), Error> {
    if params.name.trim().is_empty() {
        return Err(Error::MissingRequiredField { field: "Name" });
    }

    if params.targets.is_empty() || params.targets.iter().any(|t| t.trim().is_empty()) {
        return Err(Error::MissingRequiredField { field: "Targets" });
    }

    if let (Some(not_before), Some(not_after)) = (params.not_before, params.not_after) {
        if not_before > not_after {
            return Err(Error::InvalidCampaignWindow {
                not_before,
                not_after,
            });
        }
    }

    Ok(())
}

#[tracing::instrument(skip(db, dispatcher, params), fields(name = %params.name))]
pub async fn create_campaign(
    db: &dyn Database,
    dispatcher: &Dispatcher,
    params: CampaignParams,
) -> Result<Campaign, Error> {
    validate(&params)?;

    let campaign_id = db.campaigns().allocate_campaign_id().await?;

    // stored timestamps only keep milliseconds
    let now = bson::DateTime::from_chrono(Utc::now()).to_chrono();
    let campaign = Campaign {
        id: campaign_id,
        name: params.name,
        targets: params.targets,
        passwords: params.passwords,
        provider: params.provider,
        provider_metadata: params.provider_metadata,
        not_before: params.not_before,
        not_after: params.not_after,
        schedule_interval: params.schedule_interval,
        status: CampaignStatus::Pending,
        created_at: now,
        modified_at: now,
    };

    db.campaigns().insert_campaign(&campaign).await?;

    info!("campaign id={} has been created", campaign.id);

    dispatcher.submit(campaign.clone());

    Ok(campaign)
}

#[tracing::instrument(skip(db))]
pub async fn get_campaigns(db: &dyn Database) -> Result<Vec<Campaign>, Error> {
    let campaigns = db.campaigns().fetch_campaigns().await?;

    Ok(campaigns)
}

#[tracing::instrument(skip(db))]
pub async fn expect_campaign_by_id(
    db: &dyn Database,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = db
        .campaigns()
        .fetch_campaign_by_id(campaign_id)
        .await?
        .ok_or(Error::CampaignNotFound { campaign_id })?;

    Ok(campaign)
}

/// Finds the single campaign matching the query's filter and projects it.
#[tracing::instrument(skip(db))]
pub async fn describe_campaign(db: &dyn Database, query: &Query) -> Result<Record, Error> {
    // two are enough to tell a unique match from an ambiguous one
    let mut resolved = query.resolve(EntityKind::Campaign, 2)?;
    resolved.limit = 2;

    let mut campaigns = db.campaigns().describe_campaign(&resolved).await?;

    match campaigns.len() {
        0 => Err(Error::NoCampaignMatchesQuery),
        1 => {
            let campaign = campaigns.remove(0);
            resolved.project(&CampaignBody::render(campaign))
        }
        _ => Err(Error::AmbiguousCampaignQuery),
    }
}

#[tracing::instrument(skip(db))]
pub async fn update_status(
    db: &dyn Database,
    campaign_id: CampaignId,
    status: CampaignStatus,
) -> Result<Campaign, Error> {
    let campaign = expect_campaign_by_id(db, campaign_id).await?;

    if !campaign.status.can_transition_to(status) {
        return Err(Error::InvalidStatusTransition {
            campaign_id,
            from: campaign.status,
            to: status,
        });
    }

    let campaign = db
        .campaigns()
        .update_campaign_status(campaign, status)
        .await?;

    info!("campaign id={} status has been set to {}", campaign_id, status);

    Ok(campaign)
}
