//! HTTP clients for the import endpoints.

pub mod batch_upload;

pub use batch_upload::{BatchUploader, UploadError, UploadReport};
