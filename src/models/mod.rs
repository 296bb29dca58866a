//! # Data Models
//!
//! SeaORM entities for the job queue, ingested records and seller credentials.

pub mod card_record;
pub mod owner_credential;
pub mod report_record;
pub mod sync_job;

pub use card_record::Entity as CardRecord;
pub use owner_credential::Entity as OwnerCredential;
pub use report_record::Entity as ReportRecord;
pub use sync_job::{Entity as SyncJob, JobKind, JobStatus};
