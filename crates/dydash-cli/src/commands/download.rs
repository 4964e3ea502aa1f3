use std::sync::Arc;

use dydash_core::{DownloadController, LinkTable};

use crate::cli::{DEFAULT_ITEMS_PER_LINK, DownloadStartArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::commands::config::load_store;
use crate::commands::links::enriched_table;
use crate::output::render_job;

pub(crate) async fn handle_download_start(
    ctx: &AppContext,
    args: DownloadStartArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let store = load_store(ctx).await?;
    let config = store.effective();
    let mut table = LinkTable::from_links(&config.link);
    if let Some(index) = args.only.iter().find(|index| **index >= table.len()) {
        return Err(CliError::validation(format!(
            "no link at position {index} ({} configured)",
            table.len()
        )));
    }
    if !args.only.is_empty() {
        table.select_only(&args.only);
    }
    let table = enriched_table(ctx, table).await;

    let controller =
        DownloadController::new(Arc::clone(&ctx.api), Arc::clone(&ctx.notifier), args.estimate);
    let job = controller.start(&config, &table).await?;
    render_job(&job, format)
}

pub(crate) async fn handle_download_stop(ctx: &AppContext) -> CliResult<()> {
    let controller = DownloadController::new(
        Arc::clone(&ctx.api),
        Arc::clone(&ctx.notifier),
        DEFAULT_ITEMS_PER_LINK,
    );
    controller.stop().await?;
    Ok(())
}
