/// Jobs are identified by random (v4) UUIDs generated at submission.
pub type JobId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a fresh, never-reused job identifier.
pub fn new_job_id() -> JobId {
    uuid::Uuid::new_v4()
}
