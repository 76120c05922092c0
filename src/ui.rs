// UI layer: turns the upload flow into console output. Everything writes
// to a generic `Write` sink so the binary can pass stdout and tests can
// pass a Vec<u8>. The spinner goes to stderr and hides itself when stderr
// is not a terminal.

use crate::api::{PreparedUpload, UploadClient, UploadReceipt, UploadRequest};
use crate::error::UploadError;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Run one upload end to end and report every step. Returns `true` only
/// when the server confirmed the upload. Write errors on the sink are
/// ignored: a closed stdout must not turn a good upload into a failure.
pub fn run_upload<W: Write>(api: &UploadClient, request: &UploadRequest, out: &mut W) -> bool {
    let prepared = match api.prepare(request) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(kind = ?e.kind(), "upload rejected before sending: {}", e);
            let _ = report_failure(out, &e);
            return false;
        }
    };

    let _ = report_progress(out, &prepared);

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Uploading...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    let outcome = api.send(&prepared);
    spinner.finish_and_clear();

    match outcome {
        Ok(receipt) => {
            tracing::info!(file_id = %receipt.file_id, "upload accepted");
            let _ = report_success(out, &receipt);
            true
        }
        Err(e) => {
            tracing::warn!(kind = ?e.kind(), "upload failed: {}", e);
            let _ = report_failure(out, &e);
            false
        }
    }
}

pub fn report_progress<W: Write>(out: &mut W, upload: &PreparedUpload) -> std::io::Result<()> {
    writeln!(out, "📤 Uploading file: {}", upload.request.file_path.display())?;
    writeln!(out, "   Server: {}", upload.request.server_url)?;
    writeln!(out, "   File size: {} bytes", upload.size)
}

pub fn report_success<W: Write>(out: &mut W, receipt: &UploadReceipt) -> std::io::Result<()> {
    writeln!(out, "✅ Success!")?;
    writeln!(out, "   File ID: {}", receipt.file_id)?;
    writeln!(out, "   File Name: {}", receipt.file_name)?;
    writeln!(out, "   Processed At: {}", receipt.processed_at)
}

/// One message per error kind; HTTP and connection failures get a second
/// indented line with details.
pub fn report_failure<W: Write>(out: &mut W, err: &UploadError) -> std::io::Result<()> {
    match err {
        UploadError::HttpStatus { message, .. } => {
            writeln!(out, "❌ {}", err)?;
            writeln!(out, "   Message: {}", message)
        }
        UploadError::Connection { .. } => {
            writeln!(out, "❌ Error: {}", err)?;
            writeln!(
                out,
                "   Please check if the server is running and the URL is correct."
            )
        }
        UploadError::Unexpected(_) => writeln!(out, "❌ Unexpected error: {}", err),
        _ => writeln!(out, "❌ Error: {}", err),
    }
}
