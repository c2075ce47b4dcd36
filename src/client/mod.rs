// Client module - talks to the downloader web backend over JSON/HTTP

pub mod controller;
pub mod diagnostics;
pub mod errors;
pub mod format_selector;
pub mod http;
pub mod metadata;
pub mod models;
pub mod schemes;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use controller::{CancelHandle, JobController, JobHandle, JobOutcome, JobState, PollPolicy};
pub use diagnostics::{diagnose_error, FailureReason};
pub use errors::{ClientError, TransportError};
pub use format_selector::{FormatSelector, QualityOption};
pub use http::HttpTransport;
pub use metadata::{classify, is_playlist, InputKind, MetadataClient};
pub use models::{
    DownloadRequest, FormatOption, JobSnapshot, JobStatus, MediaType, NetworkConfig, Resolution,
    SearchResult, VideoMetadata, VideoRef,
};
pub use schemes::{ApiScheme, SchemeKind};
pub use traits::{Scheduler, TokioScheduler, Transport};
