use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use dydash_core::{
    DashboardApi, FileCatalog, FileStats, PollerHooks, PollerSettings, StatusPoller, StatusUpdate,
};
use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::cli::{DEFAULT_ITEMS_PER_LINK, OutputFormat, StatusArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_status_update, stats_line};

/// Poller side effects for a terminal: print each update, stop after the
/// requested number of ticks and keep a file listing for post-download totals.
struct TerminalHooks {
    api: Arc<dyn DashboardApi>,
    format: OutputFormat,
    ticks: Option<usize>,
    seen: AtomicUsize,
    shutdown: Arc<watch::Sender<bool>>,
    catalog: Mutex<FileCatalog>,
}

impl TerminalHooks {
    fn new(
        api: Arc<dyn DashboardApi>,
        format: OutputFormat,
        ticks: Option<usize>,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> Self {
        Self {
            api,
            format,
            ticks,
            seen: AtomicUsize::new(0),
            shutdown,
            catalog: Mutex::new(FileCatalog::default()),
        }
    }

    /// Re-list files and return their totals. A failed listing keeps the
    /// previous totals.
    async fn current_stats(&self) -> FileStats {
        let mut catalog = self.catalog.lock().await;
        if let Err(err) = catalog.refresh(self.api.as_ref()).await {
            warn!(error = %err, "file listing refresh failed");
        }
        catalog.stats()
    }
}

#[async_trait]
impl PollerHooks for TerminalHooks {
    async fn on_update(&self, update: &StatusUpdate) {
        if let Err(err) = render_status_update(update, self.format) {
            warn!(error = %err.display_message(), "failed to render status");
        }
        let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
        if self.ticks.is_some_and(|limit| seen >= limit) {
            debug!(seen, "tick limit reached");
            self.shutdown.send_replace(true);
        }
    }

    async fn refresh_catalog(&self) {
        self.current_stats().await;
    }

    async fn refresh_statistics(&self) {
        let stats = self.current_stats().await;
        if self.format == OutputFormat::Table {
            println!("{}", stats_line(&stats));
        }
    }
}

pub(crate) async fn handle_status(
    ctx: &AppContext,
    args: StatusArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let (sender, receiver) = watch::channel(false);
    let sender = Arc::new(sender);
    let hooks = Arc::new(TerminalHooks::new(
        Arc::clone(&ctx.api),
        format,
        args.ticks,
        Arc::clone(&sender),
    ));
    let settings = PollerSettings {
        interval: Duration::from_millis(args.interval_ms.max(1)),
        items_per_link_estimate: DEFAULT_ITEMS_PER_LINK,
        ..PollerSettings::default()
    };
    let mut poller = StatusPoller::new(
        Arc::clone(&ctx.api),
        Arc::clone(&ctx.scheduler),
        hooks,
        settings,
    );

    if !args.watch {
        return match poller.tick().await {
            Some(_) => {
                poller.settle().await;
                Ok(())
            }
            None => Err(CliError::failure(anyhow!("download status unavailable"))),
        };
    }

    let interrupt = {
        let sender = Arc::clone(&sender);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                sender.send_replace(true);
            }
        })
    };
    poller.run(receiver).await;
    interrupt.abort();
    poller.settle().await;
    Ok(())
}
