use std::sync::Arc;

use anyhow::{Context, anyhow};
use dydash_core::{
    FileCatalog, FileType, FilterState, ThumbnailPlan, ThumbnailResolver, ThumbnailSettings,
    ThumbnailState, preview_target,
};
use serde::Serialize;
use tracing::info;

use crate::cli::{FilePathArgs, FilePreviewArgs, FilesListArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{describe_thumbnail, format_size, render_file_page, render_json, render_stats};

async fn loaded_catalog(ctx: &AppContext, page_size: usize) -> CliResult<FileCatalog> {
    let mut catalog = FileCatalog::new(page_size);
    let count = catalog.refresh(ctx.api.as_ref()).await?;
    info!(count, "file listing loaded");
    Ok(catalog)
}

pub(crate) async fn handle_files_list(
    ctx: &AppContext,
    args: FilesListArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let mut catalog = loaded_catalog(ctx, args.page_size).await?;
    catalog.apply_filters(FilterState {
        type_filter: args.file_type,
        source_filter: args.source,
        sort_key: args.sort,
        search_text: args.search.unwrap_or_default(),
    });
    if catalog.filtered_len() > 0 && catalog.paginate(args.page, args.page_size).is_empty() {
        return Err(CliError::validation(format!(
            "page {} is out of range (1-{})",
            args.page,
            catalog.total_pages()
        )));
    }
    render_file_page(&catalog.current_page(), format)
}

pub(crate) async fn handle_files_stats(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let catalog = loaded_catalog(ctx, 0).await?;
    render_stats(&catalog.stats(), &catalog.sources(), format)
}

#[derive(Serialize)]
struct ThumbnailReport<'a> {
    path: &'a str,
    plan: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<ThumbnailState>,
}

const fn plan_label(plan: ThumbnailPlan) -> &'static str {
    match plan {
        ThumbnailPlan::Resolve => "resolve",
        ThumbnailPlan::Direct => "direct",
        ThumbnailPlan::Icon => "icon",
    }
}

pub(crate) async fn handle_files_thumbnail(
    ctx: &AppContext,
    args: FilePathArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let file_type = FileType::from_name(&args.path);
    let plan = ThumbnailPlan::for_type(file_type);
    let state = match plan {
        ThumbnailPlan::Resolve => {
            let mut resolver = ThumbnailResolver::new(
                Arc::clone(&ctx.api),
                Arc::clone(&ctx.scheduler),
                ThumbnailSettings::default(),
                args.path.as_str(),
            );
            let state = resolver
                .resolve(|state| {
                    if format == OutputFormat::Table {
                        println!("{}", describe_thumbnail(state));
                    }
                })
                .await;
            Some(state)
        }
        ThumbnailPlan::Direct | ThumbnailPlan::Icon => None,
    };

    match format {
        OutputFormat::Json => render_json(&ThumbnailReport {
            path: &args.path,
            plan: plan_label(plan),
            state,
        })?,
        OutputFormat::Table => match plan {
            ThumbnailPlan::Direct => {
                println!("{} thumbnails load directly from the file", file_type.as_str());
            }
            ThumbnailPlan::Icon => {
                println!("{} files have no thumbnail", file_type.as_str());
            }
            ThumbnailPlan::Resolve => {}
        },
    }

    if let Some(ThumbnailState::Error { reason }) = state {
        return Err(CliError::failure(anyhow!(
            "thumbnail for {}: {}",
            args.path,
            reason.message()
        )));
    }
    Ok(())
}

pub(crate) async fn handle_files_preview(
    ctx: &AppContext,
    args: FilePreviewArgs,
) -> CliResult<()> {
    let catalog = loaded_catalog(ctx, 0).await?;
    let record = catalog
        .find(&args.path)
        .ok_or_else(|| CliError::validation(format!("no file at {}", args.path)))?;
    let target = preview_target(record)?;

    let bytes = ctx
        .api
        .fetch_media(target.kind, &target.path)
        .await
        .map_err(|err| CliError::failure(anyhow!("preview failed: {err}")))?;
    tokio::fs::write(&args.out, &bytes)
        .await
        .with_context(|| format!("failed to write {}", args.out.display()))
        .map_err(CliError::failure)?;
    println!(
        "wrote {} to {}",
        format_size(u64::try_from(bytes.len()).unwrap_or(u64::MAX)),
        args.out.display()
    );
    Ok(())
}
