//! treewatch CLI library
//!
//! Everything the `treewatch` binary does lives here so it can be tested
//! without spawning a process.

pub mod args;
pub mod logging;
pub mod output;
pub mod settings;

use anyhow::{Context, Result};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use watcher::TreeWatcher;

pub use args::Args;

/// How long shutdown waits for buffered output to reach stdout
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Watch `args.root` and stream records to stdout until told to stop
///
/// Returns once Ctrl-C or SIGTERM arrives, or stdout is closed by the reader.
pub async fn run(args: Args) -> Result<()> {
    let config = settings::resolve(&args)?;

    let (sink, rx) = output::channel();
    let watcher = TreeWatcher::start(&args.root, &config, Arc::new(sink))
        .with_context(|| format!("Cannot watch {}", args.root.display()))?;

    let mut writer = tokio::spawn(output::write_records(rx, tokio::io::stdout(), args.format));

    tokio::select! {
        signal = shutdown_signal() => {
            signal?;
            info!("Shutting down");
        }
        written = &mut writer => {
            // Writer only ends early when stdout goes away
            watcher.stop();
            return match written.context("Output writer panicked")? {
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    info!("Output closed by reader, exiting");
                    Ok(())
                }
                other => other.context("Failed to write output"),
            };
        }
    }

    // Stop flushes what is buffered; dropping the watcher closes the channel
    watcher.stop();
    drop(watcher);

    match tokio::time::timeout(DRAIN_TIMEOUT, writer).await {
        Ok(written) => written
            .context("Output writer panicked")?
            .context("Failed to write output")?,
        Err(_) => warn!("Output did not drain within {:?}", DRAIN_TIMEOUT),
    }
    Ok(())
}

/// Resolve on Ctrl-C, or SIGTERM on unix
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result.context("Failed to listen for Ctrl-C")?,
            _ = terminate.recv() => {}
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    Ok(())
}
