// api.video API client module
//
// Remote Upload API collaborator:
// - Authentication (API key -> Basic auth)
// - Part upload over multipart (video source / upload token)
// - Error responses kept verbatim (status, message, body)

pub mod auth;
pub mod client;
pub mod error;
pub mod remote;
pub mod types;

pub use client::ApiClient;
pub use error::InfraError;
pub use remote::{ApiConnector, HttpConnector, PartRequest, ProgressFn, RemoteUploadApi};
