// Library root
// ------------
// The binary (`main.rs`) is a thin wrapper over these modules.
//
// Module responsibilities:
// - `api`: file validation and the HTTP upload itself.
// - `error`: the failure taxonomy shared by every step.
// - `ui`: console reporting of progress and outcome.
// - `cli`: argument parsing and usage text.
// - `logger`: tracing subscriber set-up.
pub mod api;
pub mod cli;
pub mod error;
pub mod logger;
pub mod ui;

pub use api::{FileKind, PreparedUpload, UploadClient, UploadReceipt, UploadRequest};
pub use error::{ErrorKind, UploadError, UploadResult};
