// Command-line arguments. Positional on purpose: the tool is usually
// driven from EDA flow scripts as `eda-upload <key> <file> [url]`.

use crate::api::{UploadRequest, DEFAULT_SERVER_URL};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;

/// Printed to stdout when required arguments are missing.
pub const USAGE: &str = "\
Usage: eda-upload <api_key> <file_path> [server_url]

Example:
  eda-upload my-api-key-123 file.json
  eda-upload my-api-key-123 file.json https://api.example.com
";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "eda-upload",
    version,
    about = "Upload an EDA output file (CSV or JSON) to the dashboard server"
)]
pub struct Cli {
    /// API key sent in the X-API-Key header
    #[arg(allow_hyphen_values = true)]
    pub api_key: String,

    /// Path to the .csv or .json file to upload
    #[arg(allow_hyphen_values = true)]
    pub file_path: PathBuf,

    /// Base URL of the dashboard server
    #[arg(default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Extra positional arguments are accepted and ignored
    #[arg(hide = true)]
    pub extra: Vec<String>,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// What `main` should do after looking at the arguments.
#[derive(Debug)]
pub enum Invocation {
    Run(Cli),
    /// Print the usage text and exit with status 1.
    Usage,
    /// Let clap render its own message (help, version, bad flag).
    Clap(clap::Error),
}

impl Cli {
    pub fn parse_args<I, T>(args: I) -> Invocation
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        match Cli::try_parse_from(args) {
            Ok(cli) => Invocation::Run(cli),
            Err(e) if e.kind() == ErrorKind::MissingRequiredArgument => Invocation::Usage,
            Err(e) => Invocation::Clap(e),
        }
    }

    pub fn to_request(&self) -> UploadRequest {
        UploadRequest::new(self.api_key.clone(), self.file_path.clone())
            .with_server_url(self.server_url.clone())
    }
}
