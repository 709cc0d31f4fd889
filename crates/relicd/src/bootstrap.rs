//! Bootstrap sequencer: brings up the proxy's collaborators in order.
//!
//! 1. Load `config.toml`
//! 2. Read `database-credentials.json` to locate the document store
//! 3. Build the DigitalOcean client
//! 4. Open the store and reconcile orphaned server records
//! 5. Connect analytics
//! 6. Connect the Discord bot
//!
//! Steps 1 to 4 are fatal when config, credentials, compute client or store
//! fail. The compute client is built before reconciliation so cleanup never
//! runs without it. Analytics and Discord failures leave the proxy running
//! without them.
//!
//! The store is only held open for a reconciliation pass. Between startup
//! and shutdown the provisioning side owns the file.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use relic_cache::CacheRegistry;
use relic_compute::{ComputeProvider, DigitalOceanClient, DigitalOceanConfig};
use relic_core::{DatabaseCredentials, Settings};
use relic_reconcile::{ReconcileConfig, ReconcileReport, Reconciler};
use relic_state::{StateResult, StateStore, StoreConnector, StoreFile};

use crate::analytics::AnalyticsClient;
use crate::discord::{self, DiscordBot};
use crate::error::FatalError;

/// Everything the running proxy holds between startup and shutdown.
pub struct ProxyServices {
    cache: Arc<CacheRegistry>,
    store: Arc<dyn StoreConnector>,
    compute: Arc<dyn ComputeProvider>,
    reconcile_config: ReconcileConfig,
    analytics: Option<AnalyticsClient>,
    discord: Option<DiscordBot>,
    startup_report: ReconcileReport,
}

impl ProxyServices {
    /// Shared cache handed to request-handling code.
    pub fn cache(&self) -> &Arc<CacheRegistry> {
        &self.cache
    }

    pub fn analytics(&self) -> Option<&AnalyticsClient> {
        self.analytics.as_ref()
    }

    pub fn discord(&self) -> Option<&DiscordBot> {
        self.discord.as_ref()
    }

    /// What the startup reconciliation removed.
    pub fn startup_report(&self) -> &ReconcileReport {
        &self.startup_report
    }

    /// Open the store, reconcile both collections, and release the store.
    pub async fn reconcile(&self) -> StateResult<ReconcileReport> {
        reconcile_pass(self.store.as_ref(), &self.compute, &self.reconcile_config).await
    }

    /// Run the shutdown safety-net reconciliation and drop cached state.
    pub async fn shutdown(self) -> ReconcileReport {
        info!("proxy shutting down");
        let report = match self.reconcile().await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "error opening database for shutdown cleanup");
                ReconcileReport::default()
            }
        };
        let dropped = self.cache.clear_all();
        info!(
            documents_deleted = report.total(),
            cache_entries_dropped = dropped,
            "proxy stopped"
        );
        report
    }
}

/// Run the full startup sequence from the data directory.
pub async fn bootstrap(data_dir: &Path) -> Result<ProxyServices, FatalError> {
    let settings = load_settings(data_dir)?;
    let creds = load_credentials(data_dir)?;
    let compute = connect_compute(&settings)?;
    let store = StoreFile::new(creds.database_path);
    bootstrap_with(&settings, Arc::new(store), Arc::new(compute)).await
}

/// Run the sequence from reconciliation onward with already-built
/// gateways.
pub async fn bootstrap_with(
    settings: &Settings,
    store: Arc<dyn StoreConnector>,
    compute: Arc<dyn ComputeProvider>,
) -> Result<ProxyServices, FatalError> {
    let cache = Arc::new(CacheRegistry::new());
    let reconcile_config = reconcile_config(settings)?;

    let startup_report = reconcile_pass(store.as_ref(), &compute, &reconcile_config)
        .await
        .map_err(FatalError::Database)?;

    let analytics = connect_analytics(settings);
    let discord = connect_discord(settings).await;

    if let Some(bot) = &discord {
        announce_startup(bot, settings, &startup_report).await;
    }

    info!(
        analytics = analytics.is_some(),
        discord = discord.is_some(),
        "proxy services started"
    );
    Ok(ProxyServices {
        cache,
        store,
        compute,
        reconcile_config,
        analytics,
        discord,
        startup_report,
    })
}

/// One-shot cleanup: load settings, connect the gateways, reconcile.
pub async fn reconcile_once(data_dir: &Path) -> Result<ReconcileReport, FatalError> {
    let settings = load_settings(data_dir)?;
    let creds = load_credentials(data_dir)?;
    let store = StateStore::open(&creds.database_path).map_err(FatalError::Database)?;
    let compute = connect_compute(&settings)?;
    let reconciler = Reconciler::new(Arc::new(store), Arc::new(compute))
        .with_config(reconcile_config(&settings)?);
    Ok(reconciler.reconcile_all().await)
}

/// The store handle lives only as long as this pass.
async fn reconcile_pass(
    store: &dyn StoreConnector,
    compute: &Arc<dyn ComputeProvider>,
    config: &ReconcileConfig,
) -> StateResult<ReconcileReport> {
    let store = store.connect()?;
    let reconciler = Reconciler::new(store, Arc::clone(compute)).with_config(config.clone());
    Ok(reconciler.reconcile_all().await)
}

fn load_settings(data_dir: &Path) -> Result<Settings, FatalError> {
    let settings = Settings::load(data_dir).map_err(FatalError::Config)?;
    info!(dir = ?data_dir, "config loaded");
    Ok(settings)
}

fn load_credentials(data_dir: &Path) -> Result<DatabaseCredentials, FatalError> {
    let creds = DatabaseCredentials::load(data_dir).map_err(FatalError::Credentials)?;
    info!(project = %creds.project_id, path = ?creds.database_path, "database credentials loaded");
    Ok(creds)
}

fn connect_compute(settings: &Settings) -> Result<DigitalOceanClient, FatalError> {
    let token = settings
        .require_str("digital_ocean_auth")
        .map_err(FatalError::Config)?;
    let mut config = DigitalOceanConfig::new(token);
    if let Some(url) = settings
        .get_str("digital_ocean.api_url")
        .map_err(FatalError::Config)?
    {
        config = config.with_api_url(url);
    }
    let timeout = settings
        .get_u64_or("digital_ocean.timeout_secs", 30)
        .map_err(FatalError::Config)?;
    config = config.with_timeout(Duration::from_secs(timeout));

    let client = DigitalOceanClient::new(config).map_err(FatalError::Compute)?;
    info!("connected to digital ocean");
    Ok(client)
}

fn reconcile_config(settings: &Settings) -> Result<ReconcileConfig, FatalError> {
    let defaults = ReconcileConfig::default();
    let concurrency = settings
        .get_u64_or("reconcile.concurrency", defaults.concurrency as u64)
        .map_err(FatalError::Config)?;
    let attempts = settings
        .get_u64_or(
            "reconcile.termination_attempts",
            u64::from(defaults.termination_attempts),
        )
        .map_err(FatalError::Config)?;
    let backoff_ms = settings
        .get_u64_or(
            "reconcile.retry_backoff_ms",
            defaults.retry_backoff.as_millis() as u64,
        )
        .map_err(FatalError::Config)?;

    Ok(defaults
        .with_concurrency(usize::try_from(concurrency).unwrap_or(usize::MAX))
        .with_termination_attempts(u32::try_from(attempts).unwrap_or(u32::MAX))
        .with_retry_backoff(Duration::from_millis(backoff_ms)))
}

fn connect_analytics(settings: &Settings) -> Option<AnalyticsClient> {
    let result = settings
        .require_str("analytics.write_key")
        .and_then(|key| Ok((key, settings.require_str("analytics.data_plane_url")?)));

    let (write_key, url) = match result {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "error connecting to analytics");
            return None;
        }
    };

    match AnalyticsClient::connect(write_key, url) {
        Ok(client) => Some(client),
        Err(e) => {
            error!(error = %e, "error connecting to analytics");
            None
        }
    }
}

async fn connect_discord(settings: &Settings) -> Option<DiscordBot> {
    let token = match settings.require_str("discord.bot_token") {
        Ok(token) => token,
        Err(e) => {
            error!(error = %e, "error starting up the discord bot");
            return None;
        }
    };
    let api_url = match settings.get_str("discord.api_url") {
        Ok(url) => url.unwrap_or(discord::DEFAULT_API_URL),
        Err(e) => {
            error!(error = %e, "error starting up the discord bot");
            return None;
        }
    };

    match DiscordBot::connect(token, api_url).await {
        Ok(bot) => Some(bot),
        Err(e) => {
            error!(error = %e, "error starting up the discord bot");
            None
        }
    }
}

/// Channel for the startup summary. Accepts the id as a string or a bare
/// integer.
fn status_channel(settings: &Settings) -> Option<String> {
    const KEY: &str = "discord.status_channel";
    match settings.get_str(KEY) {
        Ok(channel) => channel.map(str::to_string),
        Err(_) => match settings.get_i64(KEY) {
            Ok(id) => id.map(|id| id.to_string()),
            Err(e) => {
                warn!(error = %e, "ignoring discord.status_channel");
                None
            }
        },
    }
}

/// Post the startup cleanup summary to `discord.status_channel`, if set.
async fn announce_startup(bot: &DiscordBot, settings: &Settings, report: &ReconcileReport) {
    let Some(channel) = status_channel(settings) else {
        return;
    };
    let message = format!(
        "Proxy online. Cleaned up {} stale server document(s).",
        report.total()
    );
    if let Err(e) = bot.send_message(&channel, &message).await {
        warn!(error = %e, %channel, "failed to post startup status");
    }
}
