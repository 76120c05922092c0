// Entrypoint for the uploader.
// - Keeps `main` small: parse arguments, build the client, hand off to `ui`.
// - Every failure ends up as exit code 1; success is 0.

use eda_upload::cli::{Cli, Invocation, USAGE};
use eda_upload::{logger, ui, UploadClient};
use std::process;

fn main() {
    let cli = match Cli::parse_args(std::env::args_os()) {
        Invocation::Run(cli) => cli,
        Invocation::Usage => {
            print!("{}", USAGE);
            process::exit(1);
        }
        Invocation::Clap(e) => {
            // --help and --version exit 0, anything else 1.
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    logger::init_cli_logger(cli.verbose);
    tracing::debug!(file = %cli.file_path.display(), server = %cli.server_url, "starting upload");
    if !cli.extra.is_empty() {
        tracing::debug!(ignored = ?cli.extra, "ignoring extra arguments");
    }

    let api = match UploadClient::new() {
        Ok(api) => api,
        Err(e) => {
            println!("❌ Unexpected error: {:#}", e);
            process::exit(1);
        }
    };

    let success = ui::run_upload(&api, &cli.to_request(), &mut std::io::stdout());
    process::exit(if success { 0 } else { 1 });
}
