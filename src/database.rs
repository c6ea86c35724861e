use mongodb::bson::{self, Document};
use mongodb::{Collection, Database as MongoClientDatabase};

use crate::campaign;
use crate::campaign::db::CampaignStore;
use crate::campaign::Campaign;
use crate::error::Error;
use crate::results;
use crate::results::db::ResultStore;
use crate::results::ResultRecord;

pub type MongoResultStore = Collection<ResultRecord>;

#[derive(Debug, Clone)]
pub struct MongoCampaignStore {
    pub(crate) campaigns: Collection<Campaign>,
    pub(crate) counters: Collection<Document>,
}

#[derive(Debug, Clone)]
pub struct MongoDatabase {
    campaigns: MongoCampaignStore,
    results: MongoResultStore,
}

impl MongoDatabase {
    pub fn new(db: MongoClientDatabase) -> MongoDatabase {
        MongoDatabase {
            campaigns: MongoCampaignStore {
                campaigns: db.collection("campaigns"),
                counters: db.collection("counters"),
            },
            results: db.collection("results"),
        }
    }

    pub async fn initialize(db: MongoClientDatabase) -> Result<MongoDatabase, Error> {
        // ping the database to ensure connection is established
        db.run_command(bson::doc! { "ping": 1 }, None).await?;

        campaign::db::initialize(&db).await?;
        results::db::initialize(&db).await?;

        Ok(MongoDatabase::new(db))
    }
}

pub trait Database: Send + Sync {
    fn campaigns(&self) -> &dyn CampaignStore;
    fn results(&self) -> &dyn ResultStore;
}

impl Database for MongoDatabase {
    fn campaigns(&self) -> &dyn CampaignStore {
        &self.campaigns
    }

    fn results(&self) -> &dyn ResultStore {
        &self.results
    }
}

#[cfg(test)]
pub mod test {
    use async_trait::async_trait;

    use super::*;
    use crate::campaign::{CampaignId, CampaignStatus};
    use crate::query::ResolvedQuery;

    type Hook<A, R> = Box<dyn Fn(A) -> Result<R, Error> + Send + Sync>;

    fn unexpected<A: 'static, R: 'static>(name: &'static str) -> Hook<A, R> {
        Box::new(move |_| Err(Error::ExistentialState(format!("unexpected call to {}", name))))
    }

    pub struct MockCampaignStore {
        pub on_allocate_campaign_id: Hook<(), CampaignId>,
        pub on_insert_campaign: Box<dyn Fn(&Campaign) -> Result<(), Error> + Send + Sync>,
        pub on_fetch_campaigns: Hook<(), Vec<Campaign>>,
        pub on_fetch_campaign_by_id: Hook<CampaignId, Option<Campaign>>,
        pub on_describe_campaign:
            Box<dyn Fn(&ResolvedQuery) -> Result<Vec<Campaign>, Error> + Send + Sync>,
        pub on_update_campaign_status: Hook<(Campaign, CampaignStatus), Campaign>,
    }

    pub struct MockResultStore {
        pub on_select_results:
            Box<dyn Fn(&ResolvedQuery) -> Result<Vec<ResultRecord>, Error> + Send + Sync>,
    }

    pub struct MockDatabase {
        pub campaigns: MockCampaignStore,
        pub results: MockResultStore,
    }

    impl MockDatabase {
        pub fn new() -> MockDatabase {
            MockDatabase {
                campaigns: MockCampaignStore {
                    on_allocate_campaign_id: unexpected("allocate_campaign_id"),
                    on_insert_campaign: Box::new(|_| {
                        Err(Error::ExistentialState(
                            "unexpected call to insert_campaign".into(),
                        ))
                    }),
                    on_fetch_campaigns: unexpected("fetch_campaigns"),
                    on_fetch_campaign_by_id: unexpected("fetch_campaign_by_id"),
                    on_describe_campaign: Box::new(|_| {
                        Err(Error::ExistentialState(
                            "unexpected call to describe_campaign".into(),
                        ))
                    }),
                    on_update_campaign_status: unexpected("update_campaign_status"),
                },
                results: MockResultStore {
                    on_select_results: Box::new(|_| {
                        Err(Error::ExistentialState(
                            "unexpected call to select_results".into(),
                        ))
                    }),
                },
            }
        }
    }

    impl Database for MockDatabase {
        fn campaigns(&self) -> &dyn CampaignStore {
            &self.campaigns
        }

        fn results(&self) -> &dyn ResultStore {
            &self.results
        }
    }

    #[async_trait]
    impl CampaignStore for MockCampaignStore {
        async fn allocate_campaign_id(&self) -> Result<CampaignId, Error> {
            (self.on_allocate_campaign_id)(())
        }

        async fn insert_campaign(&self, campaign: &Campaign) -> Result<(), Error> {
            (self.on_insert_campaign)(campaign)
        }

        async fn fetch_campaigns(&self) -> Result<Vec<Campaign>, Error> {
            (self.on_fetch_campaigns)(())
        }

        async fn fetch_campaign_by_id(
            &self,
            campaign_id: CampaignId,
        ) -> Result<Option<Campaign>, Error> {
            (self.on_fetch_campaign_by_id)(campaign_id)
        }

        async fn describe_campaign(&self, query: &ResolvedQuery) -> Result<Vec<Campaign>, Error> {
            (self.on_describe_campaign)(query)
        }

        async fn update_campaign_status(
            &self,
            campaign: Campaign,
            status: CampaignStatus,
        ) -> Result<Campaign, Error> {
            (self.on_update_campaign_status)((campaign, status))
        }
    }

    #[async_trait]
    impl ResultStore for MockResultStore {
        async fn select_results(&self, query: &ResolvedQuery) -> Result<Vec<ResultRecord>, Error> {
            (self.on_select_results)(query)
        }
    }
}
