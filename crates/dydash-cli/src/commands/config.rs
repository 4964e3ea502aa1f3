use std::sync::Arc;

use anyhow::Context;
use dydash_api_models::{CookieSettings, DownloadMode, IncrementalFlags};
use dydash_core::{ConfigForm, ConfigStore, CountInputs};
use serde::Deserialize;

use crate::cli::{ConfigSaveArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_config;

/// Fields accepted by `config save --file`. Anything omitted keeps its
/// stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConfigFile {
    link: Option<Vec<String>>,
    path: Option<String>,
    music: Option<bool>,
    cover: Option<bool>,
    avatar: Option<bool>,
    json: Option<bool>,
    folderstyle: Option<bool>,
    database: Option<bool>,
    mode: Option<Vec<DownloadMode>>,
    thread: Option<u32>,
    #[serde(default)]
    number: CountFile,
    increase: Option<IncrementalFlags>,
    cookies: Option<CookieSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CountFile {
    post: Option<u32>,
    like: Option<u32>,
    mix: Option<u32>,
}

impl ConfigFile {
    pub(crate) fn into_form(self) -> ConfigForm {
        ConfigForm {
            links: self.link,
            path: self.path,
            music: self.music,
            cover: self.cover,
            avatar: self.avatar,
            json: self.json,
            folderstyle: self.folderstyle,
            database: self.database,
            modes: self.mode,
            threads: self.thread,
            counts: CountInputs {
                post: self.number.post,
                like: self.number.like,
                mix: self.number.mix,
            },
            settings_counts: CountInputs::default(),
            increase: self.increase,
            cookies: self.cookies,
        }
    }
}

fn store_for(ctx: &AppContext) -> ConfigStore {
    ConfigStore::new(Arc::clone(&ctx.api), Arc::clone(&ctx.notifier))
}

/// A store holding the backend's current configuration.
pub(crate) async fn load_store(ctx: &AppContext) -> CliResult<ConfigStore> {
    let mut store = store_for(ctx);
    store.load().await?;
    Ok(store)
}

pub(crate) async fn handle_config_get(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let store = load_store(ctx).await?;
    render_config(&store.effective(), format)
}

pub(crate) async fn handle_config_save(
    ctx: &AppContext,
    args: ConfigSaveArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let payload = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))
        .map_err(CliError::failure)?;
    let file: ConfigFile = serde_json::from_str(&payload).map_err(|err| {
        CliError::validation(format!("configuration file is not valid: {err}"))
    })?;

    let mut store = load_store(ctx).await?;
    let saved = store.save(&file.into_form()).await?;
    render_config(saved, format)
}

pub(crate) async fn handle_config_reset(ctx: &AppContext, format: OutputFormat) -> CliResult<()> {
    let mut store = store_for(ctx);
    store.reset();
    let saved = store.save(&ConfigForm::default()).await?;
    render_config(saved, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::context_for;
    use anyhow::{Result, anyhow};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn stored_config() -> serde_json::Value {
        json!({
            "link": ["https://v.douyin.com/a"],
            "path": "/data/douyin/",
            "music": true,
            "cover": false,
            "avatar": false,
            "json": false,
            "folderstyle": true,
            "mode": ["post"],
            "number": {"post": 5, "like": 0, "allmix": 2, "mix": 0, "music": 0},
            "database": true,
            "increase": {"post": true, "like": false, "allmix": true, "mix": true, "music": false},
            "thread": 8,
            "cookies": {},
            "proxy": "socks5://127.0.0.1:1080"
        })
    }

    fn temp_file(contents: &str) -> Result<PathBuf> {
        let path = std::env::temp_dir().join(format!("dydash-config-{}.json", Uuid::new_v4()));
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn config_file_leaves_omitted_fields_unset() -> Result<()> {
        let file: ConfigFile = serde_json::from_value(json!({
            "thread": 3,
            "number": {"like": 7}
        }))?;
        let form = file.into_form();
        assert_eq!(form.threads, Some(3));
        assert_eq!(form.counts.like, Some(7));
        assert_eq!(form.counts.post, None);
        assert_eq!(form.path, None);
        assert_eq!(form.links, None);
        Ok(())
    }

    #[test]
    fn config_file_rejects_unknown_fields() {
        assert!(serde_json::from_value::<ConfigFile>(json!({"threads": 3})).is_err());
    }

    #[tokio::test]
    async fn config_get_fetches_configuration() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(stored_config());
        });

        handle_config_get(&context_for(&server)?, OutputFormat::Table).await?;
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn config_save_layers_file_over_stored_values() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(stored_config());
        });
        let save = server.mock(|when, then| {
            when.method(POST).path("/api/config").json_body(json!({
                "link": ["https://v.douyin.com/a"],
                "path": "/data/douyin/",
                "music": true,
                "cover": false,
                "avatar": false,
                "json": false,
                "folderstyle": true,
                "mode": ["post"],
                "number": {"post": 5, "like": 0, "allmix": 2, "mix": 0, "music": 0},
                "database": true,
                "increase": {"post": true, "like": false, "allmix": true, "mix": true, "music": false},
                "thread": 2,
                "cookies": {
                    "msToken": "",
                    "ttwid": "",
                    "odin_tt": "",
                    "passport_csrf_token": "",
                    "sid_guard": ""
                },
                "proxy": "socks5://127.0.0.1:1080"
            }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": true}));
        });

        let path = temp_file(r#"{"thread": 2}"#)?;
        handle_config_save(
            &context_for(&server)?,
            ConfigSaveArgs { file: path.clone() },
            OutputFormat::Json,
        )
        .await?;
        save.assert();
        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn config_save_rejects_malformed_file_before_any_request() -> Result<()> {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/config");
            then.status(200);
        });

        let path = temp_file("{not json")?;
        let err = handle_config_save(
            &context_for(&server)?,
            ConfigSaveArgs { file: path.clone() },
            OutputFormat::Table,
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("malformed file should fail"))?;
        assert_eq!(err.exit_code(), 2);
        mock.assert_hits(0);
        std::fs::remove_file(&path)?;
        Ok(())
    }

    #[tokio::test]
    async fn config_reset_persists_defaults() -> Result<()> {
        let server = MockServer::start_async().await;
        let save = server.mock(|when, then| {
            when.method(POST).path("/api/config");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"success": false, "message": "config is read-only"}));
        });

        let err = handle_config_reset(&context_for(&server)?, OutputFormat::Table)
            .await
            .err()
            .ok_or_else(|| anyhow!("rejected reset should fail"))?;
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("config is read-only"));
        save.assert();
        Ok(())
    }
}
