//! Tests for admission, execution and the preparation pipeline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use vidbot_media::{ArtifactFetcher, DownloadedArtifact, FetchRequest, MediaError, MediaResult};
use vidbot_models::{
    ArtifactMetadata, DeliveredMedia, FailureKind, PreparationJob, PreparationOutcome, RecordId,
    RequesterId, SearchCandidate,
};

use crate::collaborators::{Delivery, MediaLibrary, Notifier};
use crate::error::{WorkerError, WorkerResult};
use crate::executor::PreparationExecutor;
use crate::prepare::Preparer;

// =============================================================================
// Test Doubles
// =============================================================================

#[derive(Clone, Copy)]
enum FetchMode {
    Produce,
    AgeRestricted,
    Fail,
    Panic,
}

struct MockFetcher {
    mode: FetchMode,
    release: Option<Arc<Semaphore>>,
    calls: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    produced: Mutex<Vec<PathBuf>>,
}

impl MockFetcher {
    fn new(mode: FetchMode) -> Self {
        Self {
            mode,
            release: None,
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            produced: Mutex::new(Vec::new()),
        }
    }

    /// Hold every fetch until a permit is added to `release`.
    fn gated(mode: FetchMode, release: Arc<Semaphore>) -> Self {
        Self {
            release: Some(release),
            ..Self::new(mode)
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArtifactFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> MediaResult<DownloadedArtifact> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);

        match &self.release {
            Some(gate) => gate.acquire().await.unwrap().forget(),
            None => tokio::time::sleep(Duration::from_millis(20)).await,
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        match self.mode {
            FetchMode::Produce => {
                tokio::fs::create_dir_all(&request.output_dir).await?;
                let path = request
                    .output_dir
                    .join(format!("{}.mp4", request.file_prefix));
                tokio::fs::write(&path, b"video").await?;
                self.produced.lock().unwrap().push(path.clone());
                Ok(DownloadedArtifact::new(path, 5, "best"))
            }
            FetchMode::AgeRestricted => Err(MediaError::age_restricted(
                "ERROR: Sign in to confirm your age",
            )),
            FetchMode::Fail => Err(MediaError::download_failed("Requested format is not available")),
            FetchMode::Panic => {
                // Leave a partial download behind before blowing up.
                tokio::fs::create_dir_all(&request.output_dir).await?;
                let part = request
                    .output_dir
                    .join(format!("{}.mp4.part", request.file_prefix));
                tokio::fs::write(&part, b"partial").await?;
                panic!("fetcher exploded")
            }
        }
    }
}

#[derive(Default)]
struct MockLibrary {
    blocked: HashSet<String>,
    records: Mutex<Vec<ArtifactMetadata>>,
    links: Mutex<Vec<(String, RecordId)>>,
}

#[async_trait]
impl MediaLibrary for MockLibrary {
    async fn is_blocked(&self, external_id: &str, source_url: &str) -> WorkerResult<bool> {
        Ok(self.blocked.contains(external_id) || self.blocked.contains(source_url))
    }

    async fn create_record(&self, metadata: &ArtifactMetadata) -> WorkerResult<RecordId> {
        let mut records = self.records.lock().unwrap();
        records.push(metadata.clone());
        Ok(RecordId(records.len() as i64))
    }

    async fn link_query(&self, query_norm: &str, record: RecordId) -> WorkerResult<()> {
        self.links.lock().unwrap().push((query_norm.to_string(), record));
        Ok(())
    }
}

#[derive(Default)]
struct MockDelivery {
    fail: bool,
    /// Delivered path and whether the file existed at delivery time
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver(
        &self,
        _requester: RequesterId,
        artifact: &Path,
        _caption: &str,
    ) -> WorkerResult<DeliveredMedia> {
        self.seen
            .lock()
            .unwrap()
            .push((artifact.to_path_buf(), artifact.exists()));
        if self.fail {
            return Err(WorkerError::delivery_failed("platform rejected the upload"));
        }
        Ok(DeliveredMedia {
            file_id: "file-1".to_string(),
            file_unique_id: "uniq-1".to_string(),
            duration_seconds: Some(30),
            width: Some(720),
            height: Some(1280),
            size_bytes: Some(5),
        })
    }
}

#[derive(Default)]
struct RecordingNotifier {
    outcomes: Mutex<Vec<(RequesterId, PreparationOutcome)>>,
}

impl RecordingNotifier {
    fn outcomes(&self) -> Vec<(RequesterId, PreparationOutcome)> {
        self.outcomes.lock().unwrap().clone()
    }

    fn kinds(&self) -> Vec<Option<FailureKind>> {
        self.outcomes()
            .iter()
            .map(|(_, o)| o.failure_kind())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, requester: RequesterId, outcome: &PreparationOutcome) -> WorkerResult<()> {
        self.outcomes.lock().unwrap().push((requester, outcome.clone()));
        Ok(())
    }
}

// =============================================================================
// Test Helpers
// =============================================================================

struct Harness {
    executor: PreparationExecutor,
    fetcher: Arc<MockFetcher>,
    library: Arc<MockLibrary>,
    delivery: Arc<MockDelivery>,
    notifier: Arc<RecordingNotifier>,
    dir: TempDir,
}

fn harness(fetcher: MockFetcher, library: MockLibrary, delivery: MockDelivery, max_jobs: usize) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let fetcher = Arc::new(fetcher);
    let library = Arc::new(library);
    let delivery = Arc::new(delivery);
    let notifier = Arc::new(RecordingNotifier::default());

    let preparer = Preparer::new(
        fetcher.clone(),
        library.clone(),
        delivery.clone(),
        dir.path().join("downloads"),
        60,
    );
    let executor = PreparationExecutor::new(preparer, notifier.clone(), max_jobs);

    Harness {
        executor,
        fetcher,
        library,
        delivery,
        notifier,
        dir,
    }
}

fn simple(mode: FetchMode) -> Harness {
    harness(MockFetcher::new(mode), MockLibrary::default(), MockDelivery::default(), 2)
}

fn job(requester: i64, id: &str) -> PreparationJob {
    let candidate = SearchCandidate::new(id, format!("Video {}", id), 1)
        .with_duration(Some(30))
        .with_thumbnail(Some("https://img/t.jpg".to_string()));
    PreparationJob::from_candidate(RequesterId(requester), candidate)
}

async fn settle(h: &Harness) {
    tokio::time::timeout(Duration::from_secs(5), h.executor.wait_idle())
        .await
        .expect("executor did not go idle");
}

// =============================================================================
// Admission
// =============================================================================

#[tokio::test]
async fn test_back_to_back_start_admits_exactly_once() {
    let release = Arc::new(Semaphore::new(0));
    let h = harness(
        MockFetcher::gated(FetchMode::Produce, release.clone()),
        MockLibrary::default(),
        MockDelivery::default(),
        2,
    );

    let first = job(1, "abcdef");
    let again = job(1, "abcdef");
    assert!(h.executor.start(first.dedup_key(), first));
    assert!(!h.executor.start(again.dedup_key(), again));

    // Same video, different requester: a different key.
    assert!(h.executor.submit(job(2, "abcdef")));
    assert_eq!(h.executor.in_flight(), 2);
    assert!(matches!(
        h.executor.try_submit(job(2, "abcdef")),
        Err(WorkerError::AlreadyInProgress(_))
    ));

    release.add_permits(2);
    settle(&h).await;

    assert_eq!(h.fetcher.calls(), 2);
    assert_eq!(h.notifier.outcomes().len(), 2);
    assert_eq!(h.executor.in_flight(), 0);
}

#[tokio::test]
async fn test_key_readmitted_after_termination() {
    let h = simple(FetchMode::Fail);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;
    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.outcomes().len(), 2);
}

#[tokio::test]
async fn test_concurrency_ceiling_is_respected() {
    let h = harness(
        MockFetcher::new(FetchMode::Produce),
        MockLibrary::default(),
        MockDelivery::default(),
        1,
    );

    for id in ["aaaaaa", "bbbbbb", "cccccc"] {
        assert!(h.executor.submit(job(1, id)));
    }
    settle(&h).await;

    assert_eq!(h.fetcher.calls(), 3);
    assert_eq!(h.fetcher.max_running.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Pipeline outcomes
// =============================================================================

#[tokio::test]
async fn test_success_records_links_and_removes_artifact() {
    let h = simple(FetchMode::Produce);

    let job = job(9, "abcdef").with_query(Some("funny cats".to_string()));
    assert!(h.executor.submit(job));
    settle(&h).await;

    let outcomes = h.notifier.outcomes();
    assert_eq!(outcomes.len(), 1);
    let (requester, outcome) = &outcomes[0];
    assert_eq!(*requester, RequesterId(9));
    match outcome {
        PreparationOutcome::Success { metadata, record_id } => {
            assert_eq!(*record_id, RecordId(1));
            assert_eq!(metadata.external_id, "abcdef");
            assert_eq!(metadata.title, "Video abcdef");
            assert_eq!(metadata.thumbnail_url.as_deref(), Some("https://img/t.jpg"));
            assert_eq!(metadata.width, Some(720));
        }
        other => panic!("expected success, got {:?}", other),
    }

    assert_eq!(
        h.library.links.lock().unwrap().clone(),
        vec![("funny cats".to_string(), RecordId(1))]
    );

    // Delivery saw the file; it is gone afterwards.
    let seen = h.delivery.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].1);
    for path in h.fetcher.produced.lock().unwrap().iter() {
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }
}

#[tokio::test]
async fn test_age_restricted_gets_distinct_message() {
    let h = simple(FetchMode::AgeRestricted);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::AgeRestricted)]);
    match &h.notifier.outcomes()[0].1 {
        PreparationOutcome::Failure { message, .. } => {
            assert!(message.contains("age-restricted"));
            assert_ne!(message, FailureKind::DownloadFailed.user_message());
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(h.library.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_download_failure_is_classified() {
    let h = simple(FetchMode::Fail);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::DownloadFailed)]);
    assert!(h.delivery.seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_panic_becomes_single_internal_failure() {
    let h = simple(FetchMode::Panic);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::Internal)]);
    assert_eq!(h.executor.in_flight(), 0);
    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;
}

#[tokio::test]
async fn test_panic_removes_job_work_dir() {
    let h = simple(FetchMode::Panic);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::Internal)]);
    let downloads = h.dir.path().join("downloads");
    let leftovers: Vec<_> = std::fs::read_dir(&downloads)
        .map(|d| d.filter_map(Result::ok).map(|e| e.path()).collect())
        .unwrap_or_default();
    assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
}

#[tokio::test]
async fn test_too_long_fails_before_fetching() {
    let h = simple(FetchMode::Produce);

    let candidate = SearchCandidate::new("longone", "Long", 1).with_duration(Some(61));
    assert!(h
        .executor
        .submit(PreparationJob::from_candidate(RequesterId(1), candidate)));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::TooLong)]);
    match &h.notifier.outcomes()[0].1 {
        PreparationOutcome::Failure { message, .. } => assert!(message.contains("1 minute")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_unknown_duration_is_attempted() {
    let h = simple(FetchMode::Produce);

    assert!(h.executor.submit(PreparationJob::new(RequesterId(1), "bareid1")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![None]);
    let records = h.library.records.lock().unwrap().clone();
    assert_eq!(records[0].title, "Video");
    assert_eq!(records[0].source_url, "https://www.youtube.com/watch?v=bareid1");
}

#[tokio::test]
async fn test_blocked_source_fails_before_fetching() {
    let library = MockLibrary {
        blocked: HashSet::from(["abcdef".to_string()]),
        ..Default::default()
    };
    let h = harness(MockFetcher::new(FetchMode::Produce), library, MockDelivery::default(), 2);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::Blocked)]);
    assert_eq!(h.fetcher.calls(), 0);
}

#[tokio::test]
async fn test_delivery_failure_still_removes_artifact() {
    let delivery = MockDelivery {
        fail: true,
        ..Default::default()
    };
    let h = harness(MockFetcher::new(FetchMode::Produce), MockLibrary::default(), delivery, 2);

    assert!(h.executor.submit(job(1, "abcdef")));
    settle(&h).await;

    assert_eq!(h.notifier.kinds(), vec![Some(FailureKind::DeliveryFailed)]);
    assert!(h.library.records.lock().unwrap().is_empty());
    for path in h.fetcher.produced.lock().unwrap().iter() {
        assert!(!path.exists());
    }
    assert!(std::fs::read_dir(h.dir.path().join("downloads"))
        .map(|mut d| d.next().is_none())
        .unwrap_or(true));
}
