use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::typedid::{TypedId, TypedIdMarker};

pub mod db;
pub mod endpoints;
pub mod manager;
pub mod status;
pub use endpoints::*;
pub use status::CampaignStatus;

pub type CampaignId = TypedId<Campaign>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Campaign {
    #[serde(rename = "_id")]
    pub id: CampaignId,
    pub name: String,
    pub targets: Vec<String>,
    pub passwords: Vec<String>,
    pub provider: String,
    pub provider_metadata: serde_json::Value,
    #[serde(with = "crate::utils::optional_bson_datetime")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(with = "crate::utils::optional_bson_datetime")]
    pub not_after: Option<DateTime<Utc>>,
    pub schedule_interval: u64,
    pub status: CampaignStatus,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub modified_at: DateTime<Utc>,
}

impl TypedIdMarker for Campaign {
    fn tag() -> &'static str {
        "CPN"
    }
}

/// The operator-supplied part of a campaign, everything the store does not
/// assign itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CampaignParams {
    pub name: String,
    pub targets: Vec<String>,
    pub passwords: Vec<String>,
    pub provider: String,
    pub provider_metadata: serde_json::Value,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub schedule_interval: u64,
}
