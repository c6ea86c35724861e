use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson, Database};

use crate::database::MongoResultStore;
use crate::error::Error;
use crate::query::{self, ResolvedQuery};

use super::ResultRecord;

const RESULTS: &str = "results";

pub async fn initialize(db: &Database) -> Result<(), Error> {
    db.run_command(
        bson::doc! {
            "createIndexes": RESULTS,
            "indexes": [
                { "key": { "campaign_id": 1, "created_at": 1 }, "name": "by_campaign_id" },
            ]
        },
        None,
    )
    .await?;

    Ok(())
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn select_results(&self, query: &ResolvedQuery) -> Result<Vec<ResultRecord>, Error>;
}

#[async_trait]
impl ResultStore for MongoResultStore {
    #[tracing::instrument(skip(self), err)]
    async fn select_results(&self, query: &ResolvedQuery) -> Result<Vec<ResultRecord>, Error> {
        let results: Vec<ResultRecord> = self
            .find(
                query::db::filter_document(query),
                query::db::find_options(query),
            )
            .await?
            .try_collect()
            .await?;

        Ok(results)
    }
}
