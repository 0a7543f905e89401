//! Shared key generation for the metadata store.
//!
//! Every job owns up to three keys: its record, its result blob, and its input blob.

use pdfgate_core::constants::{JOB_INPUT_PREFIX, JOB_META_PREFIX, JOB_RESULT_PREFIX};
use pdfgate_core::JobId;

pub fn meta_key(id: &JobId) -> String {
    format!("{}{}", JOB_META_PREFIX, id)
}

pub fn result_key(id: &JobId) -> String {
    format!("{}{}", JOB_RESULT_PREFIX, id)
}

pub fn input_key(id: &JobId) -> String {
    format!("{}{}", JOB_INPUT_PREFIX, id)
}

/// Extract the job id from any of the three job keys.
pub fn job_id_from_key(key: &str) -> Option<JobId> {
    [JOB_META_PREFIX, JOB_RESULT_PREFIX, JOB_INPUT_PREFIX]
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix))
        .and_then(|rest| rest.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_use_expected_prefixes() {
        let id = JobId::new();
        assert_eq!(meta_key(&id), format!("pdf_meta:{}", id));
        assert_eq!(result_key(&id), format!("pdf_result:{}", id));
        assert_eq!(input_key(&id), format!("pdf_input:{}", id));
    }

    #[test]
    fn job_id_round_trips_through_every_key() {
        let id = JobId::new();
        for key in [meta_key(&id), result_key(&id), input_key(&id)] {
            assert_eq!(job_id_from_key(&key), Some(id));
        }
        assert_eq!(job_id_from_key("pdf_meta:garbage"), None);
        assert_eq!(job_id_from_key("other:123"), None);
    }
}
