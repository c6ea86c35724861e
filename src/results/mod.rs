use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::campaign::CampaignId;
use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

pub type ResultId = TypedId<ResultRecord>;

/// The outcome of one credential attempt. Records are written by the dispatch
/// nodes, this service only reads them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ResultRecord {
    #[serde(rename = "_id")]
    pub id: ResultId,
    pub campaign_id: CampaignId,
    pub username: String,
    pub password: String,
    pub valid: bool,
    pub locked: bool,
    pub mfa: bool,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TypedIdMarker for ResultRecord {
    fn tag() -> &'static str {
        "RES"
    }
}
