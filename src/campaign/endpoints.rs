use actix_web::web::{Data, Json, Path};
use actix_web::{get, post, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::Database;
use crate::decode::StrictJson;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::query::{Query, Record};

use super::{manager, Campaign, CampaignId, CampaignParams, CampaignStatus};

/// Everything an operator may set on a new campaign. `ID`, `Status` and the
/// timestamps are assigned by the service and rejected here.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "PascalCase")]
pub struct CreateCampaignBody {
    pub name: String,
    pub targets: Vec<String>,
    pub passwords: Vec<String>,
    pub provider: String,
    pub provider_metadata: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub not_after: Option<DateTime<Utc>>,
    pub schedule_interval: u64,
}

impl From<CreateCampaignBody> for CampaignParams {
    fn from(body: CreateCampaignBody) -> CampaignParams {
        CampaignParams {
            name: body.name,
            targets: body.targets,
            passwords: body.passwords,
            provider: body.provider,
            provider_metadata: body.provider_metadata,
            not_before: body.not_before,
            not_after: body.not_after,
            schedule_interval: body.schedule_interval,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CampaignBody {
    #[serde(rename = "ID")]
    pub id: CampaignId,
    pub name: String,
    pub targets: Vec<String>,
    pub passwords: Vec<String>,
    pub provider: String,
    pub provider_metadata: serde_json::Value,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub schedule_interval: u64,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl CampaignBody {
    pub fn render(campaign: Campaign) -> CampaignBody {
        CampaignBody {
            id: campaign.id,
            name: campaign.name,
            targets: campaign.targets,
            passwords: campaign.passwords,
            provider: campaign.provider,
            provider_metadata: campaign.provider_metadata,
            not_before: campaign.not_before,
            not_after: campaign.not_after,
            schedule_interval: campaign.schedule_interval,
            status: campaign.status,
            created_at: campaign.created_at,
            modified_at: campaign.modified_at,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields, rename_all = "PascalCase")]
pub struct StatusUpdateBody {
    #[serde(rename = "ID")]
    pub id: CampaignId,
    pub status: CampaignStatus,
}

#[post("/campaign")]
#[tracing::instrument(skip(db, dispatcher, body))]
pub async fn create_campaign(
    db: Data<dyn Database>,
    dispatcher: Data<Dispatcher>,
    body: StrictJson<CreateCampaignBody>,
) -> Result<Json<CampaignBody>, Error> {
    let body = body.into_inner();

    let campaign = manager::create_campaign(&**db, &dispatcher, body.into()).await?;

    Ok(Json(CampaignBody::render(campaign)))
}

#[get("/campaigns")]
#[tracing::instrument(skip(db))]
pub async fn get_campaigns(db: Data<dyn Database>) -> Result<Json<Vec<CampaignBody>>, Error> {
    let campaigns = manager::get_campaigns(&**db).await?;

    let body = campaigns
        .into_iter()
        .map(|campaign| CampaignBody::render(campaign))
        .collect();

    Ok(Json(body))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(db))]
pub async fn get_campaign_by_id(
    db: Data<dyn Database>,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign = manager::expect_campaign_by_id(&**db, campaign_id).await?;

    Ok(Json(CampaignBody::render(campaign)))
}

#[post("/campaign/describe")]
#[tracing::instrument(skip(db))]
pub async fn describe_campaign(
    db: Data<dyn Database>,
    body: StrictJson<Query>,
) -> Result<Json<Record>, Error> {
    let query = body.into_inner();

    let record = manager::describe_campaign(&**db, &query).await?;

    Ok(Json(record))
}

#[post("/campaign/status")]
#[tracing::instrument(skip(db))]
pub async fn update_campaign_status(
    db: Data<dyn Database>,
    body: StrictJson<StatusUpdateBody>,
) -> Result<HttpResponse, Error> {
    let body = body.into_inner();

    manager::update_status(&**db, body.id, body.status).await?;

    Ok(HttpResponse::Ok().finish())
}
