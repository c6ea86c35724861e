use actix_web::post;
use actix_web::web::{Data, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::campaign::CampaignId;
use crate::database::Database;
use crate::decode::StrictJson;
use crate::error::Error;
use crate::query::{Query, QuerySettings, Record};

use super::{manager, ResultId, ResultRecord};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultBody {
    #[serde(rename = "ID")]
    pub id: ResultId,
    #[serde(rename = "CampaignID")]
    pub campaign_id: CampaignId,
    pub username: String,
    pub password: String,
    pub valid: bool,
    pub locked: bool,
    #[serde(rename = "MFA")]
    pub mfa: bool,
    pub created_at: DateTime<Utc>,
}

impl ResultBody {
    pub fn render(result: ResultRecord) -> ResultBody {
        ResultBody {
            id: result.id,
            campaign_id: result.campaign_id,
            username: result.username,
            password: result.password,
            valid: result.valid,
            locked: result.locked,
            mfa: result.mfa,
            created_at: result.created_at,
        }
    }
}

#[post("/results")]
#[tracing::instrument(skip(db, settings))]
pub async fn get_results(
    db: Data<dyn Database>,
    settings: Data<QuerySettings>,
    body: StrictJson<Query>,
) -> Result<Json<Vec<Record>>, Error> {
    let query = body.into_inner();

    let records = manager::select_results(&**db, &query, settings.max_results).await?;

    Ok(Json(records))
}
