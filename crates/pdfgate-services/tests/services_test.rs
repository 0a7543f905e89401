use async_trait::async_trait;
use chrono::Utc;
use pdfgate_core::constants::{JOB_INPUT_PREFIX, JOB_META_PREFIX};
use pdfgate_core::{AppError, FailureKind, JobId, JobLimits, JobState, SourceFormat};
use pdfgate_processing::ConvertError;
use pdfgate_services::{
    Converter, ExpirySweeper, JobQueue, JobResult, JobStore, MetadataStore, StatusService,
    StorageError, StorageResult, SubmissionService, SubmitRequest, SyncConversionService,
};
use pdfgate_storage::keys::{input_key, result_key};
use pdfgate_storage::{MemoryQueue, MemoryStore, StorageBackend};
use std::sync::Arc;
use std::time::Duration;

const TTL: Duration = Duration::from_secs(3600);

struct Harness {
    store: Arc<MemoryStore>,
    queue: Arc<MemoryQueue>,
    jobs: JobStore,
    submit: SubmissionService,
    status: StatusService,
}

fn limits() -> JobLimits {
    JobLimits {
        max_file_size: 1024,
        job_ttl: TTL,
        max_queue_depth: 3,
        ..JobLimits::default()
    }
}

fn harness_with(limits: JobLimits) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let queue = Arc::new(MemoryQueue::new());
    let jobs = JobStore::new(store.clone(), limits.job_ttl);
    Harness {
        submit: SubmissionService::new(jobs.clone(), queue.clone(), limits),
        status: StatusService::new(jobs.clone()),
        store,
        queue,
        jobs,
    }
}

fn harness() -> Harness {
    harness_with(limits())
}

fn request(filename: &str, payload: &[u8]) -> SubmitRequest {
    SubmitRequest {
        filename: filename.to_string(),
        payload: payload.to_vec(),
        declared_format: None,
        as_base64: false,
    }
}

async fn finish(jobs: &JobStore, id: &JobId, pdf: Option<&[u8]>) {
    let snapshot = jobs.load(id).await.unwrap().unwrap();
    let now = Utc::now();
    let processing = snapshot
        .record
        .start_processing("test-worker", now, chrono::Duration::seconds(60))
        .unwrap();
    let snapshot = jobs
        .transition(&snapshot, &processing)
        .await
        .unwrap()
        .unwrap();
    let terminal = match pdf {
        Some(bytes) => {
            jobs.put_result(id, bytes.to_vec()).await.unwrap();
            processing
                .complete(result_key(id), bytes.len() as u64, now)
                .unwrap()
        }
        None => processing
            .fail(
                FailureKind::ConversionFailed,
                "source document is corrupt",
                Some("Error: <tmp>/input.docx".into()),
                now,
            )
            .unwrap(),
    };
    assert!(jobs.transition(&snapshot, &terminal).await.unwrap().is_some());
}

#[tokio::test]
async fn submitted_job_is_immediately_visible_as_queued() {
    let h = harness();
    let job = h.submit.submit(request("a.docx", b"PK\x03\x04")).await.unwrap();

    assert_eq!(job.filename, "a.docx");
    assert_eq!(job.source_format, SourceFormat::Docx);
    let record = h.status.get_status(&job.job_id).await.unwrap();
    assert_eq!(record.state, JobState::Queued { attempt: 0 });
    assert_eq!(h.queue.depth().await.unwrap(), 1);
    assert_eq!(
        h.jobs.load_input(&job.job_id).await.unwrap().as_deref(),
        Some(&b"PK\x03\x04"[..])
    );
}

#[tokio::test]
async fn oversized_payload_leaves_no_trace() {
    let h = harness();
    let err = h
        .submit
        .submit(request("big.docx", &vec![b'x'; 2048]))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::PayloadTooLarge { size: 2048, max: 1024 }));
    assert_eq!(h.queue.depth().await.unwrap(), 0);
    assert!(h.store.scan(JOB_META_PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn validation_rejects_empty_and_unknown_formats() {
    let h = harness();
    assert!(matches!(
        h.submit.submit(request("a.docx", b"")).await,
        Err(AppError::InvalidInput(_))
    ));
    assert!(matches!(
        h.submit.submit(request("a.exe", b"MZ")).await,
        Err(AppError::UnsupportedFormat(_))
    ));

    let mut declared = request("upload.bin", b"<p>hi</p>");
    declared.declared_format = Some("html".to_string());
    let job = h.submit.submit(declared).await.unwrap();
    assert_eq!(job.source_format, SourceFormat::Html);

    let mut bogus = request("a.docx", b"data");
    bogus.declared_format = Some("pdf".to_string());
    assert!(matches!(
        h.submit.submit(bogus).await,
        Err(AppError::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn formats_outside_the_allowed_set_are_refused() {
    let h = harness_with(JobLimits {
        allowed_formats: vec![SourceFormat::Html],
        ..limits()
    });
    assert!(matches!(
        h.submit.submit(request("a.docx", b"data")).await,
        Err(AppError::UnsupportedFormat(_))
    ));
}

#[tokio::test]
async fn full_queue_refuses_new_jobs() {
    let h = harness();
    for i in 0..3 {
        h.submit
            .submit(request(&format!("{}.txt", i), b"text"))
            .await
            .unwrap();
    }
    let err = h.submit.submit(request("4.txt", b"text")).await.unwrap_err();
    assert!(matches!(err, AppError::QueueFull { depth: 3, max: 3 }));
    assert_eq!(h.store.scan(JOB_META_PREFIX).await.unwrap().len(), 3);
}

struct BrokenQueue;

#[async_trait]
impl JobQueue for BrokenQueue {
    async fn enqueue(&self, _: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
    async fn dequeue(&self, _: Duration) -> StorageResult<Option<String>> {
        Ok(None)
    }
    async fn ack(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }
    async fn requeue(&self, _: &str) -> StorageResult<()> {
        Ok(())
    }
    async fn depth(&self) -> StorageResult<usize> {
        Ok(0)
    }
    async fn ping(&self) -> StorageResult<()> {
        Err(StorageError::Unavailable("connection refused".to_string()))
    }
    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Redis
    }
}

#[tokio::test]
async fn failed_enqueue_rolls_back_record_and_input() {
    let store = Arc::new(MemoryStore::new());
    let jobs = JobStore::new(store.clone(), TTL);
    let submit = SubmissionService::new(jobs, Arc::new(BrokenQueue), limits());

    let err = submit.submit(request("a.docx", b"data")).await.unwrap_err();

    assert!(matches!(err, AppError::QueueUnavailable(_)));
    assert!(store.scan(JOB_META_PREFIX).await.unwrap().is_empty());
    assert!(store.scan(JOB_INPUT_PREFIX).await.unwrap().is_empty());
}

#[tokio::test]
async fn result_is_not_ready_until_done() {
    let h = harness();
    let job = h.submit.submit(request("a.docx", b"data")).await.unwrap();
    assert!(matches!(
        h.status.get_result(&job.job_id).await,
        Err(AppError::NotReady(_))
    ));

    finish(&h.jobs, &job.job_id, Some(b"%PDF-1.7 body")).await;

    match h.status.get_result(&job.job_id).await.unwrap() {
        JobResult::Ready { record, pdf } => {
            assert_eq!(pdf, b"%PDF-1.7 body");
            assert_eq!(record.pdf_filename(), "a.pdf");
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn failed_job_reports_kind_and_trace() {
    let h = harness();
    let job = h.submit.submit(request("a.docx", b"data")).await.unwrap();
    finish(&h.jobs, &job.job_id, None).await;

    match h.status.get_result(&job.job_id).await.unwrap() {
        JobResult::Failed {
            kind, error, trace, ..
        } => {
            assert_eq!(kind, FailureKind::ConversionFailed);
            assert_eq!(error, "source document is corrupt");
            assert_eq!(trace.as_deref(), Some("Error: <tmp>/input.docx"));
        }
        other => panic!("unexpected result {:?}", other),
    }
}

#[tokio::test]
async fn done_job_without_blob_is_not_found() {
    let h = harness();
    let job = h.submit.submit(request("a.docx", b"data")).await.unwrap();
    finish(&h.jobs, &job.job_id, Some(b"%PDF")).await;
    h.store.delete(&result_key(&job.job_id)).await.unwrap();

    assert!(matches!(
        h.status.get_result(&job.job_id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn delete_removes_everything_and_is_not_repeatable() {
    let h = harness();
    let job = h.submit.submit(request("a.docx", b"data")).await.unwrap();

    h.status.delete_job(&job.job_id).await.unwrap();

    assert!(matches!(
        h.status.get_status(&job.job_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(h.store.get(&input_key(&job.job_id)).await.unwrap().is_none());
    assert!(matches!(
        h.status.delete_job(&job.job_id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let h = harness();
    assert!(matches!(
        h.status.get_status(&JobId::new()).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.status.get_result(&JobId::new()).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn expired_jobs_become_not_found() {
    let h = harness_with(JobLimits {
        job_ttl: Duration::from_secs(10),
        ..limits()
    });
    let job = h.submit.submit(request("a.docx", b"data")).await.unwrap();
    finish(&h.jobs, &job.job_id, Some(b"%PDF")).await;

    tokio::time::advance(Duration::from_secs(11)).await;

    assert!(matches!(
        h.status.get_status(&job.job_id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        h.status.get_result(&job.job_id).await,
        Err(AppError::NotFound(_))
    ));

    let sweeper = ExpirySweeper::new(h.jobs.clone(), Duration::from_secs(60));
    let report = sweeper.sweep().await.unwrap();
    assert_eq!(report.purged, 3);
    assert_eq!(h.store.raw_len().await, 0);
}

#[tokio::test]
async fn sweeper_removes_orphan_blobs() {
    let h = harness();
    let live = h.submit.submit(request("a.docx", b"data")).await.unwrap();
    let orphan = JobId::new();
    h.store
        .put(&result_key(&orphan), b"%PDF".to_vec(), TTL)
        .await
        .unwrap();
    h.store
        .put(&input_key(&orphan), b"data".to_vec(), TTL)
        .await
        .unwrap();

    let sweeper = ExpirySweeper::new(h.jobs.clone(), Duration::from_secs(60));
    let report = sweeper.sweep().await.unwrap();

    assert_eq!(report.orphan_blobs, 2);
    assert_eq!(report.expired_records, 0);
    assert!(h.jobs.load_input(&live.job_id).await.unwrap().is_some());
}

struct EchoConverter;

#[async_trait]
impl Converter for EchoConverter {
    async fn convert(&self, input: &[u8], format: SourceFormat) -> Result<Vec<u8>, ConvertError> {
        assert!(format.is_html());
        let mut out = b"%PDF-".to_vec();
        out.extend_from_slice(input);
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

#[tokio::test]
async fn sync_path_renders_html_inline() {
    let sync = SyncConversionService::new(
        Arc::new(EchoConverter),
        JobLimits {
            sync_max_html_bytes: 32,
            ..JobLimits::default()
        },
    );

    let pdf = sync.render_html(Some("<h1>Hi</h1>")).await.unwrap();
    assert_eq!(pdf, b"%PDF-<h1>Hi</h1>");

    let placeholder = sync.render_html(None).await.unwrap();
    assert_eq!(placeholder, b"%PDF-<p>No HTML provided</p>");

    let long = "x".repeat(64);
    assert!(matches!(
        sync.render_html(Some(&long)).await,
        Err(AppError::PayloadTooLarge { size: 64, max: 32 })
    ));
}
