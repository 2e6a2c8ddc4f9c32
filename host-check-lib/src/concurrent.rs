//! Bounded concurrent probing over a fixed batch of domains.
//!
//! The batch is loaded into a [`WorkQueue`] and drained by a fixed pool of
//! worker tasks. Each worker claims one domain at a time, probes it, and
//! sends the result down a channel. At most `max_concurrency` probes are in
//! flight, every domain is claimed by exactly one worker, and the result
//! stream ends only after every worker has found the queue empty.

use crate::error::HostCheckError;
use crate::types::{default_concurrency, Domain, ProbeResult, MAX_CONCURRENCY};
use futures::stream::{Stream, StreamExt};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::debug;

/// Backlog of domains not yet claimed by a worker.
#[derive(Debug, Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<Domain>>,
}

impl WorkQueue {
    pub fn new<I: IntoIterator<Item = Domain>>(domains: I) -> Self {
        Self {
            items: Mutex::new(domains.into_iter().collect()),
        }
    }

    /// Take the next unclaimed domain, or `None` once the queue is drained.
    pub fn claim(&self) -> Option<Domain> {
        // A poisoned lock still holds a consistent deque.
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        items.pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stream of probe results in completion order.
///
/// Ends when every worker has gone idle.
pub struct ResultStream {
    rx: mpsc::Receiver<ProbeResult>,
    expected: usize,
}

impl ResultStream {
    /// Number of results the batch should produce.
    pub fn expected(&self) -> usize {
        self.expected
    }
}

impl Stream for ResultStream {
    type Item = ProbeResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Manages concurrent probing with a fixed worker pool.
#[derive(Debug, Clone, Copy)]
pub struct ConcurrentProcessor {
    max_concurrency: usize,
}

impl ConcurrentProcessor {
    /// Create a processor with at most `max_concurrency` probes in flight (clamped to 1..=100).
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.clamp(1, MAX_CONCURRENCY),
        }
    }

    /// Create a processor sized to the machine, `min(available_parallelism, 8)`.
    pub fn with_default_concurrency() -> Self {
        Self::new(default_concurrency())
    }

    /// Number of workers spawned for a batch of `batch_len` domains.
    pub fn worker_count(&self, batch_len: usize) -> usize {
        self.max_concurrency.min(batch_len)
    }

    /// Probe every domain and stream the results as they complete.
    ///
    /// Workers are spawned onto the current tokio runtime. Dropping the
    /// stream stops the workers after their in-flight probe.
    pub fn run<F, Fut>(&self, domains: Vec<Domain>, probe: F) -> ResultStream
    where
        F: Fn(Domain) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeResult> + Send + 'static,
    {
        let expected = domains.len();
        let workers = self.worker_count(expected);
        let queue = Arc::new(WorkQueue::new(domains));
        let probe = Arc::new(probe);
        let (tx, rx) = mpsc::channel(workers.max(1) * 4);

        debug!(domains = expected, workers, "starting probe workers");

        for worker_id in 0..workers {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                Arc::clone(&probe),
                tx.clone(),
            ));
        }
        // Workers hold the only senders, so the stream ends with the last one.
        drop(tx);

        ResultStream { rx, expected }
    }

    /// Probe every domain and return all results once every worker is idle.
    ///
    /// Returns an internal error if a worker died (a panicking probe) and
    /// some domains never produced a result.
    pub async fn run_collect<F, Fut>(
        &self,
        domains: Vec<Domain>,
        probe: F,
    ) -> Result<Vec<ProbeResult>, HostCheckError>
    where
        F: Fn(Domain) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ProbeResult> + Send + 'static,
    {
        let stream = self.run(domains, probe);
        let expected = stream.expected();
        let results: Vec<ProbeResult> = stream.collect().await;

        if results.len() != expected {
            return Err(HostCheckError::internal(format!(
                "{} of {} probes did not report a result",
                expected - results.len(),
                expected
            )));
        }
        Ok(results)
    }
}

impl Default for ConcurrentProcessor {
    fn default() -> Self {
        Self::with_default_concurrency()
    }
}

async fn worker_loop<F, Fut>(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    probe: Arc<F>,
    tx: mpsc::Sender<ProbeResult>,
) where
    F: Fn(Domain) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ProbeResult> + Send + 'static,
{
    let mut probed = 0usize;
    while let Some(domain) = queue.claim() {
        let result = (*probe)(domain).await;
        probed += 1;
        if tx.send(result).await.is_err() {
            debug!(worker = worker_id, "result receiver dropped, stopping");
            return;
        }
    }
    debug!(worker = worker_id, probed, "work queue drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ProbeStatus, Protocol};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn batch(n: usize) -> Vec<Domain> {
        (0..n).map(|i| Domain::new(format!("host{}.example.com", i))).collect()
    }

    #[tokio::test]
    async fn test_every_domain_gets_exactly_one_result() {
        for k in [1, 2, 3, 8, 100] {
            let domains = batch(50);
            let processor = ConcurrentProcessor::new(k);
            let results = processor
                .run_collect(domains.clone(), |d| async move { ProbeResult::ok(d, Protocol::Https) })
                .await
                .unwrap();

            assert_eq!(results.len(), 50, "k = {}", k);
            let seen: HashSet<Domain> = results.into_iter().map(|r| r.domain).collect();
            let expected: HashSet<Domain> = domains.into_iter().collect();
            assert_eq!(seen, expected, "k = {}", k);
        }
    }

    #[tokio::test]
    async fn test_no_domain_is_probed_twice() {
        let calls: Arc<Mutex<HashMap<Domain, usize>>> = Arc::new(Mutex::new(HashMap::new()));
        let recorder = Arc::clone(&calls);

        ConcurrentProcessor::new(6)
            .run_collect(batch(40), move |d| {
                let recorder = Arc::clone(&recorder);
                async move {
                    *recorder.lock().unwrap().entry(d.clone()).or_insert(0) += 1;
                    tokio::task::yield_now().await;
                    ProbeResult::error(d, "not reachable")
                }
            })
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 40);
        assert!(calls.values().all(|&count| count == 1));
    }

    #[tokio::test]
    async fn test_in_flight_probes_never_exceed_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (gauge, high) = (Arc::clone(&in_flight), Arc::clone(&peak));

        let results = ConcurrentProcessor::new(4)
            .run_collect(batch(24), move |d| {
                let (gauge, high) = (Arc::clone(&gauge), Arc::clone(&high));
                async move {
                    let now = gauge.fetch_add(1, Ordering::SeqCst) + 1;
                    high.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    gauge.fetch_sub(1, Ordering::SeqCst);
                    ProbeResult::ok(d, Protocol::Http)
                }
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 24);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_worker_count_is_bounded_by_batch() {
        let processor = ConcurrentProcessor::new(8);
        assert_eq!(processor.worker_count(3), 3);
        assert_eq!(processor.worker_count(20), 8);
        assert_eq!(processor.worker_count(0), 0);
        assert_eq!(ConcurrentProcessor::new(0).worker_count(20), 1);
        assert_eq!(ConcurrentProcessor::new(500).worker_count(1000), MAX_CONCURRENCY);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let results = ConcurrentProcessor::new(4)
            .run_collect(Vec::new(), |d| async move { ProbeResult::ok(d, Protocol::Https) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_results_stream_in_completion_order() {
        let domains = vec![Domain::from("slow.com"), Domain::from("fast.com")];
        let mut stream = ConcurrentProcessor::new(2).run(domains, |d| async move {
            if d.as_str() == "slow.com" {
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
            ProbeResult::ok(d, Protocol::Https)
        });

        assert_eq!(stream.expected(), 2);
        let first = stream.next().await.unwrap();
        assert_eq!(first.domain.as_str(), "fast.com");
        let second = stream.next().await.unwrap();
        assert_eq!(second.domain.as_str(), "slow.com");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_panicking_probe_is_reported() {
        let err = ConcurrentProcessor::new(2)
            .run_collect(batch(5), |d| async move {
                if d.as_str() == "host3.example.com" {
                    panic!("probe blew up");
                }
                ProbeResult::ok(d, Protocol::Https)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, HostCheckError::Internal { .. }));
    }

    #[tokio::test]
    async fn test_statuses_pass_through_unchanged() {
        let results = ConcurrentProcessor::new(3)
            .run_collect(batch(9), |d| async move {
                let n: usize = d.as_str()[4..5].parse().unwrap();
                match n % 3 {
                    0 => ProbeResult::ok(d, Protocol::Https),
                    1 => ProbeResult::warn(d, Protocol::Https, "EAI_NONAME"),
                    _ => ProbeResult::error(d, "not reachable"),
                }
            })
            .await
            .unwrap();

        let count = |s: ProbeStatus| results.iter().filter(|r| r.status == s).count();
        assert_eq!(count(ProbeStatus::Ok), 3);
        assert_eq!(count(ProbeStatus::Warn), 3);
        assert_eq!(count(ProbeStatus::Error), 3);
    }

    #[test]
    fn test_work_queue_claims_each_item_once() {
        let queue = WorkQueue::new(batch(3));
        assert_eq!(queue.len(), 3);
        let mut claimed = Vec::new();
        while let Some(d) = queue.claim() {
            claimed.push(d);
        }
        assert_eq!(claimed.len(), 3);
        assert!(queue.is_empty());
        assert!(queue.claim().is_none());
    }
}
