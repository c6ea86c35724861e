//! Hand-off of persisted campaigns to the scheduler.
//!
//! Requests never wait on dispatch. [`Dispatcher::submit`] drops the campaign
//! into a bounded queue and returns; a fixed pool of workers drains the queue,
//! calls the [`Scheduler`] and records the outcome on the campaign's status
//! (`Scheduled` on success, `Errored` on failure). Dispatch errors are only
//! ever logged.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::campaign::{manager, Campaign, CampaignStatus};
use crate::database::Database;
use crate::error::Error;

pub mod http;

#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn schedule(&self, campaign: &Campaign) -> Result<(), Error>;
}

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> DispatchConfig {
        DispatchConfig {
            workers: 4,
            queue_capacity: 256,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Dispatcher {
    queue: mpsc::Sender<Campaign>,
}

impl Dispatcher {
    /// Spawns the worker pool on the current tokio runtime.
    pub fn start(
        db: Arc<dyn Database>,
        scheduler: Arc<dyn Scheduler>,
        config: &DispatchConfig,
    ) -> Dispatcher {
        let (queue, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        for worker in 0..config.workers.max(1) {
            tokio::spawn(run_worker(
                worker,
                Arc::clone(&receiver),
                Arc::clone(&db),
                Arc::clone(&scheduler),
            ));
        }

        info!(
            workers = config.workers.max(1),
            capacity = config.queue_capacity.max(1),
            "dispatcher started"
        );

        Dispatcher { queue }
    }

    /// A dispatcher without workers, the receiving end is handed back to the
    /// caller.
    #[cfg(test)]
    pub fn detached(capacity: usize) -> (Dispatcher, mpsc::Receiver<Campaign>) {
        let (queue, receiver) = mpsc::channel(capacity);
        (Dispatcher { queue }, receiver)
    }

    pub fn submit(&self, campaign: Campaign) {
        let campaign_id = campaign.id;
        match self.queue.try_send(campaign) {
            Ok(()) => debug!(?campaign_id, "campaign queued for dispatch"),
            Err(TrySendError::Full(_)) => {
                error!(?campaign_id, "dispatch queue is full, campaign left pending")
            }
            Err(TrySendError::Closed(_)) => {
                error!(?campaign_id, "dispatch queue is closed, campaign left pending")
            }
        }
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<Mutex<mpsc::Receiver<Campaign>>>,
    db: Arc<dyn Database>,
    scheduler: Arc<dyn Scheduler>,
) {
    loop {
        let campaign = receiver.lock().await.recv().await;
        match campaign {
            Some(campaign) => dispatch(&*db, &*scheduler, campaign).await,
            None => break,
        }
    }

    debug!(worker, "dispatch worker stopped");
}

#[tracing::instrument(skip(db, scheduler, campaign), fields(campaign_id = ?campaign.id))]
async fn dispatch(db: &dyn Database, scheduler: &dyn Scheduler, campaign: Campaign) {
    let outcome = match scheduler.schedule(&campaign).await {
        Ok(()) => {
            info!("campaign dispatched");
            CampaignStatus::Scheduled
        }
        Err(err) => {
            error!("error dispatching campaign: {}", err);
            CampaignStatus::Errored
        }
    };

    if let Err(err) = manager::update_status(db, campaign.id, outcome).await {
        error!(status = %outcome, "error recording dispatch outcome: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use tokio::sync::mpsc::UnboundedSender;
    use tokio::time::timeout;

    use super::*;
    use crate::campaign::CampaignId;
    use crate::database::test::MockDatabase;

    struct MockScheduler {
        fail: bool,
        calls: UnboundedSender<CampaignId>,
    }

    #[async_trait]
    impl Scheduler for MockScheduler {
        async fn schedule(&self, campaign: &Campaign) -> Result<(), Error> {
            self.calls.send(campaign.id).unwrap();
            if self.fail {
                Err(Error::DispatchRejected {
                    campaign_id: campaign.id,
                    status: 503,
                })
            } else {
                Ok(())
            }
        }
    }

    fn pending_campaign(id: u64) -> Campaign {
        let now = Utc::now();
        Campaign {
            id: CampaignId::new(id),
            name: "spray-eu".into(),
            targets: vec!["a".into(), "b".into()],
            passwords: vec![],
            provider: String::new(),
            provider_metadata: serde_json::Value::Null,
            not_before: None,
            not_after: None,
            schedule_interval: 0,
            status: CampaignStatus::Pending,
            created_at: now,
            modified_at: now,
        }
    }

    async fn run_dispatch(fail: bool) -> (CampaignId, CampaignStatus) {
        let (scheduled_tx, mut scheduled_rx) = mpsc::unbounded_channel();
        let (updated_tx, mut updated_rx) = mpsc::unbounded_channel();

        let mut db = MockDatabase::new();
        db.campaigns.on_fetch_campaign_by_id =
            Box::new(|campaign_id| Ok(Some(pending_campaign(campaign_id.value()))));
        db.campaigns.on_update_campaign_status = Box::new(move |(mut campaign, status)| {
            updated_tx.send((campaign.id, status)).unwrap();
            campaign.status = status;
            Ok(campaign)
        });

        let scheduler = MockScheduler {
            fail,
            calls: scheduled_tx,
        };
        let dispatcher = Dispatcher::start(
            Arc::new(db),
            Arc::new(scheduler),
            &DispatchConfig::default(),
        );

        dispatcher.submit(pending_campaign(7));

        let scheduled = timeout(Duration::from_secs(5), scheduled_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scheduled, CampaignId::new(7));

        timeout(Duration::from_secs(5), updated_rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn successful_dispatch_marks_campaign_scheduled() {
        let (campaign_id, status) = run_dispatch(false).await;

        assert_eq!(campaign_id, CampaignId::new(7));
        assert_eq!(status, CampaignStatus::Scheduled);
    }

    #[tokio::test]
    async fn failed_dispatch_marks_campaign_errored() {
        let (campaign_id, status) = run_dispatch(true).await;

        assert_eq!(campaign_id, CampaignId::new(7));
        assert_eq!(status, CampaignStatus::Errored);
    }

    #[tokio::test]
    async fn submit_does_not_block_when_queue_is_full() {
        let (dispatcher, mut queue) = Dispatcher::detached(1);

        dispatcher.submit(pending_campaign(1));
        dispatcher.submit(pending_campaign(2));

        assert_eq!(queue.recv().await.unwrap().id, CampaignId::new(1));
        assert!(queue.try_recv().is_err());
    }
}
