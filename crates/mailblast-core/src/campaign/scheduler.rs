//! Batch Scheduler - paced, bounded-concurrency campaign execution

use anyhow::Result;
use async_trait::async_trait;
use mailblast_common::config::BatchConfig;
use mailblast_common::types::{Campaign, CampaignReport, JobId};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

use super::executor::SendExecutor;

/// Observer for per-batch progress. The queue wires this to the job store
/// so partial progress survives a worker crash.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, job_id: JobId, progress: i32, report: &CampaignReport) -> Result<()>;
}

/// Runs one campaign to completion and returns its report. This is the seam
/// the queue worker drives; an error here is a job-level failure and
/// triggers the retry policy.
#[async_trait]
pub trait CampaignRunner: Send + Sync {
    async fn run(&self, job_id: JobId, campaign: &Campaign) -> Result<CampaignReport>;
}

/// Partitions a campaign's audience into fixed-size batches and drives the
/// send executor over each batch concurrently, with a pacing delay between
/// batches to respect relay rate limits.
pub struct BatchScheduler {
    executor: Arc<SendExecutor>,
    sink: Arc<dyn ProgressSink>,
    config: BatchConfig,
}

impl BatchScheduler {
    /// Create a new batch scheduler
    pub fn new(
        executor: Arc<SendExecutor>,
        sink: Arc<dyn ProgressSink>,
        config: BatchConfig,
    ) -> Self {
        Self {
            executor,
            sink,
            config,
        }
    }
}

#[async_trait]
impl CampaignRunner for BatchScheduler {
    async fn run(&self, job_id: JobId, campaign: &Campaign) -> Result<CampaignReport> {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = campaign.audience.len().div_ceil(batch_size);
        let mut report = CampaignReport::default();

        info!(
            job_id,
            recipients = campaign.audience.len(),
            batch_size,
            batches = batch_count,
            "Starting campaign blast"
        );

        let shared = Arc::new(campaign.clone());

        for (index, batch) in campaign.audience.chunks(batch_size).enumerate() {
            debug!(
                job_id,
                batch = index + 1,
                of = batch_count,
                size = batch.len(),
                "Processing batch"
            );

            // One task per recipient; parallelism is bounded by the batch
            // size since the whole batch is joined before the next starts
            let mut handles = Vec::with_capacity(batch.len());
            for recipient in batch {
                let executor = Arc::clone(&self.executor);
                let campaign = Arc::clone(&shared);
                let recipient = recipient.clone();
                handles.push(tokio::spawn(async move {
                    executor.send_one(&campaign, &recipient).await
                }));
            }

            for handle in handles {
                let outcome = handle
                    .await
                    .map_err(|e| anyhow::anyhow!("send task panicked: {}", e))?;
                report.record(&outcome);
            }

            let progress = ((index + 1) * 100 / batch_count) as i32;
            self.sink.update(job_id, progress, &report).await?;

            debug!(
                job_id,
                batch = index + 1,
                success = report.success,
                failed = report.failed,
                "Batch complete"
            );

            if index + 1 < batch_count && self.config.batch_delay_ms > 0 {
                sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }

        info!(
            job_id,
            success = report.success,
            failed = report.failed,
            "Campaign finished"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::campaign::attachments::{AttachmentResolver, DisabledImageRenderer};
    use crate::campaign::executor::{MailTransport, TransportError};
    use mailblast_common::types::{Envelope, Recipient};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct CountingTransport {
        sends: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_addresses: HashMap<String, String>,
    }

    impl CountingTransport {
        fn new() -> Self {
            Self {
                sends: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_addresses: HashMap::new(),
            }
        }

        fn failing(address: &str, error: &str) -> Self {
            let mut transport = Self::new();
            transport
                .fail_addresses
                .insert(address.to_string(), error.to_string());
            transport
        }
    }

    #[async_trait]
    impl MailTransport for CountingTransport {
        async fn send(&self, envelope: &Envelope) -> Result<String, TransportError> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            self.sends.fetch_add(1, Ordering::SeqCst);
            if let Some(error) = self.fail_addresses.get(&envelope.to) {
                return Err(TransportError::Smtp(error.clone()));
            }
            Ok(format!("<mock-{}@test>", envelope.to))
        }
    }

    struct RecordingSink {
        updates: Mutex<Vec<(i32, u32)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                updates: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn update(&self, _job_id: JobId, progress: i32, report: &CampaignReport) -> Result<()> {
            self.updates.lock().await.push((progress, report.attempted()));
            Ok(())
        }
    }

    fn audience(n: usize) -> Vec<Recipient> {
        (1..=n)
            .map(|i| Recipient {
                email: format!("r{}@example.com", i),
                first_name: None,
                last_name: None,
                company: None,
                custom_fields: HashMap::new(),
            })
            .collect()
    }

    fn campaign(n: usize) -> Campaign {
        Campaign {
            subject: "Subject".to_string(),
            html_body: "<p>Body</p>".to_string(),
            sender_name: "Team".to_string(),
            audience: audience(n),
            certificate: None,
            documents: None,
        }
    }

    fn scheduler(
        transport: Arc<CountingTransport>,
        sink: Arc<RecordingSink>,
        batch_size: usize,
    ) -> BatchScheduler {
        let executor = Arc::new(SendExecutor::new(
            transport,
            AttachmentResolver::new(Arc::new(DisabledImageRenderer)),
            "news@example.com",
        ));
        BatchScheduler::new(
            executor,
            sink,
            BatchConfig {
                batch_size,
                batch_delay_ms: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_every_recipient_attempted_in_ceil_batches() {
        let transport = Arc::new(CountingTransport::new());
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(transport.clone(), sink.clone(), 10);

        let report = scheduler.run(1, &campaign(25)).await.unwrap();

        assert_eq!(transport.sends.load(Ordering::SeqCst), 25);
        assert_eq!(report.success, 25);
        assert_eq!(report.failed, 0);
        assert_eq!(report.attempted(), 25);

        // ceil(25/10) = 3 batches, one progress write per batch
        let updates = sink.updates.lock().await;
        assert_eq!(*updates, vec![(33, 10), (66, 20), (100, 25)]);
    }

    #[tokio::test]
    async fn test_one_failure_never_blocks_siblings() {
        let transport = Arc::new(CountingTransport::failing(
            "r17@example.com",
            "invalid address",
        ));
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(transport.clone(), sink, 10);

        let report = scheduler.run(1, &campaign(25)).await.unwrap();

        assert_eq!(report.success, 24);
        assert_eq!(report.failed, 1);
        assert_eq!(report.attempted(), 25);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].email, "r17@example.com");
        assert!(report.errors[0].error.contains("invalid address"));
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_batch_size() {
        let transport = Arc::new(CountingTransport::new());
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(transport.clone(), sink, 3);

        scheduler.run(1, &campaign(9)).await.unwrap();

        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 3);
        assert_eq!(transport.sends.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn test_single_short_batch() {
        let transport = Arc::new(CountingTransport::new());
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(transport.clone(), sink.clone(), 10);

        let report = scheduler.run(1, &campaign(4)).await.unwrap();

        assert_eq!(report.attempted(), 4);
        assert_eq!(*sink.updates.lock().await, vec![(100, 4)]);
    }
}
