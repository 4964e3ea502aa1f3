use std::sync::Arc;

use dydash_core::{LinkEnricher, LinkTable};
use tracing::debug;

use crate::cli::{LinkAddArgs, LinkIndexArgs, LinkUpdateArgs, OutputFormat};
use crate::client::{AppContext, CliResult};
use crate::commands::config::load_store;
use crate::output::{render_link_table, resolution_label};

/// Enrich every pending row of `table` and wait until all of them settle.
pub(crate) async fn enriched_table(ctx: &AppContext, mut table: LinkTable) -> LinkTable {
    LinkEnricher::new(Arc::clone(&ctx.api))
        .enrich_all(&mut table, |index, row| {
            debug!(
                index,
                state = resolution_label(row.resolution()),
                "link row updated"
            );
        })
        .await;
    table
}

pub(crate) async fn handle_links_list(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let store = load_store(ctx).await?;
    let table = LinkTable::from_links(&store.effective().link);
    let table = enriched_table(ctx, table).await;
    render_link_table(&table, format)
}

pub(crate) async fn handle_links_add(ctx: &AppContext, args: LinkAddArgs) -> CliResult<()> {
    let mut store = load_store(ctx).await?;
    let index = store.add_link(&args.link).await?;
    println!("link added at position {index}");
    Ok(())
}

pub(crate) async fn handle_links_update(ctx: &AppContext, args: LinkUpdateArgs) -> CliResult<()> {
    let mut store = load_store(ctx).await?;
    store.update_link(args.index, args.link.trim()).await?;
    println!("link {} updated", args.index);
    Ok(())
}

pub(crate) async fn handle_links_remove(ctx: &AppContext, args: LinkIndexArgs) -> CliResult<()> {
    let mut store = load_store(ctx).await?;
    let removed = store.remove_link(args.index).await?;
    println!("removed {removed}");
    Ok(())
}

pub(crate) async fn handle_links_clear(ctx: &AppContext) -> CliResult<()> {
    let mut store = load_store(ctx).await?;
    store.clear_links().await?;
    println!("all links removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_for;
    use anyhow::{Result, anyhow};
    use dydash_core::{LinkKind, Resolution, WorkCount};
    use httpmock::prelude::*;
    use serde_json::json;

    fn serve_config(server: &MockServer, links: &[&str]) {
        let links = links.to_vec();
        server.mock(move |when, then| {
            when.method(GET).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({ "link": links }));
        });
    }

    #[tokio::test]
    async fn enrichment_resolves_users_with_their_work_count() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/link/parse")
                .json_body(json!({"link": "https://v.douyin.com/user"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "nickname": "alice",
                    "link_type": "user",
                    "sec_uid": "MS4wLjABAAAA"
                }));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/api/link/parse")
                .json_body(json!({"link": "https://v.douyin.com/bad"}));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "message": "unsupported link"}));
        });
        let count = server.mock(|when, then| {
            when.method(POST).path("/api/user/work-count");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true, "work_count": 12}));
        });

        let ctx = context_for(&server)?;
        let table = LinkTable::from_links(&[
            "https://v.douyin.com/user".to_string(),
            "https://v.douyin.com/bad".to_string(),
            "  ".to_string(),
        ]);
        let table = enriched_table(&ctx, table).await;

        let resolved = table.rows()[0]
            .resolved()
            .ok_or_else(|| anyhow!("first row should resolve"))?;
        assert_eq!(resolved.kind, LinkKind::User);
        assert_eq!(resolved.display_name, "alice");
        assert_eq!(resolved.work_count, WorkCount::Known(12));
        assert_eq!(
            table.rows()[1].resolution(),
            &Resolution::Failed {
                message: "unsupported link".into()
            }
        );
        assert_eq!(table.rows()[2].resolution(), &Resolution::Skipped);
        count.assert();
        Ok(())
    }

    #[tokio::test]
    async fn links_list_renders_enriched_rows() -> Result<()> {
        let server = MockServer::start_async().await;
        serve_config(&server, &["https://v.douyin.com/video"]);
        let parse = server.mock(|when, then| {
            when.method(POST).path("/api/link/parse");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "success": true,
                    "nickname": "clip",
                    "link_type": "video",
                    "aweme_id": "7300000000000000000"
                }));
        });

        handle_links_list(&context_for(&server)?, OutputFormat::Json).await?;
        parse.assert();
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_links_are_refused_without_saving() -> Result<()> {
        let server = MockServer::start_async().await;
        serve_config(&server, &["https://v.douyin.com/a"]);
        let save = server.mock(|when, then| {
            when.method(POST).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
        });

        let err = handle_links_add(
            &context_for(&server)?,
            LinkAddArgs {
                link: " https://v.douyin.com/a ".into(),
            },
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("duplicate link should fail"))?;
        assert_eq!(err.exit_code(), 2);
        save.assert_hits(0);
        Ok(())
    }

    #[tokio::test]
    async fn removing_a_link_persists_the_shorter_list() -> Result<()> {
        let server = MockServer::start_async().await;
        serve_config(&server, &["https://v.douyin.com/a", "https://v.douyin.com/b"]);
        let save = server.mock(|when, then| {
            when.method(POST).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
        });

        handle_links_remove(&context_for(&server)?, LinkIndexArgs { index: 0 }).await?;
        save.assert();

        let err = handle_links_remove(&context_for(&server)?, LinkIndexArgs { index: 5 })
            .await
            .err()
            .ok_or_else(|| anyhow!("out-of-range index should fail"))?;
        assert_eq!(err.exit_code(), 2);
        save.assert_hits(1);
        Ok(())
    }
}
