//! Loaded configuration and the form layer that edits it.
//!
//! The store holds the last configuration the backend accepted. Edits are
//! assembled into a candidate, persisted, and only then committed, so a failed
//! save leaves the prior state untouched.

use std::sync::Arc;

use dydash_api_models::{
    CookieSettings, DEFAULT_DOWNLOAD_PATH, DownloadConfig, DownloadCounts, DownloadMode,
    IncrementalFlags,
};
use tracing::{debug, warn};

use crate::api::DashboardApi;
use crate::error::{DashError, DashResult};
use crate::notify::{Notifier, NotifyLevel};

/// Per-mode count inputs from one form section. `None` means the input was
/// left empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountInputs {
    /// Published works limit.
    pub post: Option<u32>,
    /// Liked works limit.
    pub like: Option<u32>,
    /// Collection limit.
    pub mix: Option<u32>,
}

/// Values read from the editing surface. Every field is optional; absent
/// fields fall back to the prior configuration and then to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigForm {
    /// Link rows, including blank ones.
    pub links: Option<Vec<String>>,
    /// Download directory; blank counts as absent.
    pub path: Option<String>,
    /// Music switch.
    pub music: Option<bool>,
    /// Cover switch.
    pub cover: Option<bool>,
    /// Avatar switch.
    pub avatar: Option<bool>,
    /// JSON metadata switch.
    pub json: Option<bool>,
    /// Folder-per-work switch.
    pub folderstyle: Option<bool>,
    /// Database switch.
    pub database: Option<bool>,
    /// Selected download modes.
    pub modes: Option<Vec<DownloadMode>>,
    /// Worker thread count; zero counts as absent.
    pub threads: Option<u32>,
    /// Count inputs from the main section.
    pub counts: CountInputs,
    /// Count inputs from the settings section, used when the main section is empty.
    pub settings_counts: CountInputs,
    /// Incremental switches.
    pub increase: Option<IncrementalFlags>,
    /// Cookie values.
    pub cookies: Option<CookieSettings>,
}

impl ConfigForm {
    /// Populate every input from `config`, as the editing surface does after a
    /// load or reset.
    #[must_use]
    pub fn from_config(config: &DownloadConfig) -> Self {
        let counts = CountInputs {
            post: Some(config.number.post),
            like: Some(config.number.like),
            mix: Some(config.number.mix),
        };
        Self {
            links: Some(config.link.clone()),
            path: Some(config.path.clone()),
            music: Some(config.music),
            cover: Some(config.cover),
            avatar: Some(config.avatar),
            json: Some(config.json),
            folderstyle: Some(config.folderstyle),
            database: Some(config.database),
            modes: Some(config.mode.clone()),
            threads: Some(config.thread),
            counts,
            settings_counts: counts,
            increase: Some(config.increase),
            cookies: Some(config.cookies.clone()),
        }
    }
}

/// First present candidate, else `fallback`.
fn first_of<T>(candidates: impl IntoIterator<Item = Option<T>>, fallback: T) -> T {
    candidates.into_iter().flatten().next().unwrap_or(fallback)
}

/// Holds the configuration last loaded from or accepted by the backend.
pub struct ConfigStore {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    current: Option<DownloadConfig>,
}

impl ConfigStore {
    /// Create an empty store; nothing is loaded until [`ConfigStore::load`].
    #[must_use]
    pub fn new(api: Arc<dyn DashboardApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            notifier,
            current: None,
        }
    }

    /// Configuration currently held, if any has been loaded or saved.
    #[must_use]
    pub const fn current(&self) -> Option<&DownloadConfig> {
        self.current.as_ref()
    }

    /// Configuration currently held, or the defaults when nothing is loaded.
    #[must_use]
    pub fn effective(&self) -> DownloadConfig {
        self.current.clone().unwrap_or_default()
    }

    /// Fetch the configuration from the backend and replace the held copy.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Api`] when the fetch fails; the prior state is kept
    /// and an error notification is emitted.
    pub async fn load(&mut self) -> DashResult<&DownloadConfig> {
        match self.api.fetch_config().await {
            Ok(config) => {
                debug!(links = config.link.len(), "configuration loaded");
                Ok(&*self.current.insert(config))
            }
            Err(err) => {
                warn!(error = %err, detail = %err.detail(), "configuration load failed");
                self.notifier
                    .notify(NotifyLevel::Error, "failed to load configuration");
                Err(DashError::api("load configuration", err))
            }
        }
    }

    /// Assemble a full configuration from `form`.
    ///
    /// Each field resolves in order: form input, settings-section input (for
    /// counts), held configuration, default. Blank links are dropped. Keys the
    /// client does not model are carried over from the held configuration.
    #[must_use]
    pub fn collect(&self, form: &ConfigForm) -> DownloadConfig {
        let defaults = DownloadConfig::default();
        let prior = self.current.as_ref();
        let extra = prior.map(|config| config.extra.clone()).unwrap_or_default();

        let link = first_of(
            [
                form.links.as_ref().map(|links| {
                    links
                        .iter()
                        .filter(|link| !link.trim().is_empty())
                        .cloned()
                        .collect()
                }),
                prior.map(|config| config.link.clone()),
            ],
            defaults.link,
        );
        let path = first_of(
            [
                form.path.clone().filter(|path| !path.trim().is_empty()),
                prior
                    .map(|config| config.path.clone())
                    .filter(|path| !path.trim().is_empty()),
            ],
            DEFAULT_DOWNLOAD_PATH.to_string(),
        );
        let prior_number = prior.map(|config| config.number);

        DownloadConfig {
            link,
            path,
            music: first_of([form.music, prior.map(|c| c.music)], defaults.music),
            cover: first_of([form.cover, prior.map(|c| c.cover)], defaults.cover),
            avatar: first_of([form.avatar, prior.map(|c| c.avatar)], defaults.avatar),
            json: first_of([form.json, prior.map(|c| c.json)], defaults.json),
            folderstyle: first_of(
                [form.folderstyle, prior.map(|c| c.folderstyle)],
                defaults.folderstyle,
            ),
            database: first_of([form.database, prior.map(|c| c.database)], defaults.database),
            mode: first_of(
                [form.modes.clone(), prior.map(|config| config.mode.clone())],
                defaults.mode.clone(),
            ),
            number: DownloadCounts {
                post: first_of(
                    [form.counts.post, form.settings_counts.post, prior_number.map(|n| n.post)],
                    0,
                ),
                like: first_of(
                    [form.counts.like, form.settings_counts.like, prior_number.map(|n| n.like)],
                    0,
                ),
                mix: first_of(
                    [form.counts.mix, form.settings_counts.mix, prior_number.map(|n| n.mix)],
                    0,
                ),
                allmix: prior_number.map_or(0, |n| n.allmix),
                music: prior_number.map_or(0, |n| n.music),
            },
            increase: first_of(
                [form.increase, prior.map(|config| config.increase)],
                defaults.increase,
            ),
            thread: first_of(
                [
                    form.threads.filter(|threads| *threads > 0),
                    prior.map(|config| config.thread).filter(|threads| *threads > 0),
                ],
                defaults.thread,
            ),
            cookies: first_of(
                [form.cookies.clone(), prior.map(|config| config.cookies.clone())],
                defaults.cookies.clone(),
            ),
            extra,
        }
    }

    /// Collect `form` and persist it; the held configuration is replaced only
    /// when the backend accepts it.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Api`] on transport failure and
    /// [`DashError::Rejected`] when the backend answers `success: false`.
    pub async fn save(&mut self, form: &ConfigForm) -> DashResult<&DownloadConfig> {
        let candidate = self.collect(form);
        self.persist(candidate, "save configuration").await?;
        self.notifier
            .notify(NotifyLevel::Success, "configuration saved");
        Ok(self.effective_ref())
    }

    /// Restore defaults locally. Nothing is sent to the backend until the next save.
    pub fn reset(&mut self) -> &DownloadConfig {
        self.notifier
            .notify(NotifyLevel::Success, "configuration reset to defaults");
        self.current.insert(DownloadConfig::default())
    }

    /// Append a link and persist the result. Returns the new row index.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Validation`] for blank or duplicate links (with a
    /// notification), or the persistence error.
    pub async fn add_link(&mut self, link: &str) -> DashResult<usize> {
        let link = link.trim();
        if link.is_empty() {
            self.notifier.notify(NotifyLevel::Error, "enter a link first");
            return Err(DashError::Validation {
                field: "link",
                reason: "link must not be blank",
            });
        }
        let mut candidate = self.effective();
        if candidate.link.iter().any(|existing| existing == link) {
            self.notifier
                .notify(NotifyLevel::Warning, "link already exists");
            return Err(DashError::Validation {
                field: "link",
                reason: "link already exists",
            });
        }
        candidate.link.push(link.to_string());
        let index = candidate.link.len() - 1;
        self.persist(candidate, "add link").await?;
        self.notifier.notify(NotifyLevel::Success, "link added");
        Ok(index)
    }

    /// Replace the link at `index` and persist the result.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Validation`] when `index` is out of range, or the
    /// persistence error.
    pub async fn update_link(&mut self, index: usize, value: &str) -> DashResult<()> {
        let mut candidate = self.effective();
        let Some(slot) = candidate.link.get_mut(index) else {
            return Err(DashError::Validation {
                field: "index",
                reason: "no link at this position",
            });
        };
        value.clone_into(slot);
        self.persist(candidate, "update link").await
    }

    /// Remove the link at `index` and persist the result. Returns the removed link.
    ///
    /// # Errors
    ///
    /// Returns [`DashError::Validation`] when `index` is out of range, or the
    /// persistence error.
    pub async fn remove_link(&mut self, index: usize) -> DashResult<String> {
        let mut candidate = self.effective();
        if index >= candidate.link.len() {
            return Err(DashError::Validation {
                field: "index",
                reason: "no link at this position",
            });
        }
        let removed = candidate.link.remove(index);
        self.persist(candidate, "remove link").await?;
        self.notifier.notify(NotifyLevel::Success, "link removed");
        Ok(removed)
    }

    /// Remove every link and persist the result.
    ///
    /// # Errors
    ///
    /// Returns the persistence error.
    pub async fn clear_links(&mut self) -> DashResult<()> {
        let mut candidate = self.effective();
        candidate.link.clear();
        self.persist(candidate, "clear links").await?;
        self.notifier.notify(NotifyLevel::Success, "all links cleared");
        Ok(())
    }

    async fn persist(&mut self, candidate: DownloadConfig, operation: &'static str) -> DashResult<()> {
        match self.api.save_config(&candidate).await {
            Ok(ack) if ack.success => {
                debug!(operation, links = candidate.link.len(), "configuration persisted");
                self.current = Some(candidate);
                Ok(())
            }
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| "configuration save failed".to_string());
                warn!(operation, %message, "configuration save rejected");
                self.notifier.notify(NotifyLevel::Error, &message);
                Err(DashError::Rejected { operation, message })
            }
            Err(err) => {
                warn!(operation, error = %err, detail = %err.detail(), "configuration save failed");
                self.notifier
                    .notify(NotifyLevel::Error, "configuration save failed");
                Err(DashError::api(operation, err))
            }
        }
    }

    fn effective_ref(&mut self) -> &DownloadConfig {
        self.current.get_or_insert_with(DownloadConfig::default)
    }
}
