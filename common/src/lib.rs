//! Shared runner and core operations for the `cp` and `tee` utilities
//!
//! - [`copy`]: file copy primitives and the recursive directory copier used by `cp`
//! - [`tee`](mod@tee): the stream duplicator behind `tee`
//! - [`run`]: sets up logging and a single-threaded runtime, executes a tool's main future and
//!   reports its outcome
//!
//! Fatal errors are reported once, on stderr, as `<prefix><error chain>` and turned into `None`
//! so that binaries can exit with status 1.

pub mod config;
pub mod copy;
pub mod tee;

#[cfg(test)]
mod testutils;

pub use config::OutputConfig;
pub use copy::{copy_dir, copy_file, copy_file_into_dir, copy_tree};
pub use tee::tee;

fn init_tracing(output: &OutputConfig) {
    let filter = tracing_subscriber::EnvFilter::new(output.log_level());
    // at the default verbosity only error diagnostics are shown, keep them free of decorations
    let decorate = output.verbose > 0;
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_level(decorate)
        .with_target(decorate)
        .without_time()
        .try_init()
        .is_err()
    {
        tracing::debug!("global subscriber already installed, keeping it");
    }
}

pub fn run<Fut, Summary>(output: OutputConfig, func: impl FnOnce() -> Fut) -> Option<Summary>
where
    Summary: std::fmt::Display,
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
{
    init_tracing(&output);
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!("{}failed to start runtime: {:#}", output.error_prefix, &error);
            return None;
        }
    };
    let res = runtime.block_on(func());
    // a read of stdin may still be parked on the blocking pool, it must not delay exit
    runtime.shutdown_background();
    match res {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                eprintln!("{summary}");
            }
            Some(summary)
        }
        Err(error) => {
            tracing::error!("{}{:#}", output.error_prefix, &error);
            None
        }
    }
}
