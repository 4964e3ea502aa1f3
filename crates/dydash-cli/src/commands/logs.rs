use dydash_core::fetch_log_lines;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliResult};
use crate::output::render_logs;

pub(crate) async fn handle_logs(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let lines = fetch_log_lines(ctx.api.as_ref()).await?;
    render_logs(&lines, format)
}
