//! Application state shared by every handler.

use pdfgate_core::Config;
use pdfgate_processing::Converter;
use pdfgate_services::{
    JobStore, StatusService, SubmissionService, SyncConversionService,
};
use pdfgate_storage::{JobQueue, MetadataStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub jobs: JobStore,
    pub queue: Arc<dyn JobQueue>,
    pub converter: Arc<dyn Converter>,
    pub submission: SubmissionService,
    pub status: StatusService,
    pub sync: SyncConversionService,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn MetadataStore>,
        queue: Arc<dyn JobQueue>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        let jobs = JobStore::new(store, config.limits.job_ttl);
        Self {
            submission: SubmissionService::new(jobs.clone(), queue.clone(), config.limits.clone()),
            status: StatusService::new(jobs.clone()),
            sync: SyncConversionService::new(converter.clone(), config.limits.clone()),
            config,
            jobs,
            queue,
            converter,
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        self.jobs.backend()
    }
}
