//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::ClientConfig;
use crate::network::Messenger;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ClientConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ClientConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Keep the returned watcher alive for as long as
    /// updates are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "Config file change detected, reloading");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                            }
                        }
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply each reloaded config to `messenger` until the channel closes.
///
/// The shard table is replaced first; chain settings and the default shard
/// follow only once it succeeded. A failed reload is logged and leaves the
/// messenger exactly as it was.
pub async fn apply_config_updates(
    messenger: Arc<Messenger>,
    mut updates: mpsc::UnboundedReceiver<ClientConfig>,
) {
    while let Some(config) = updates.recv().await {
        if let Err(e) = messenger.reconfigure(config.shards.clone()).await {
            tracing::error!(error = %e, "Shard reconfiguration failed, keeping current configuration");
            continue;
        }
        if messenger.chain_type() != config.chain.chain_type {
            messenger.set_chain_type(config.chain.chain_type);
        }
        if messenger.chain_id() != config.chain.chain_id {
            messenger.set_chain_id(config.chain.chain_id);
        }
        if let Some(shard_id) = config.chain.default_shard_id {
            if let Err(e) = messenger.set_default_shard(shard_id) {
                tracing::warn!(error = %e, "Configured default shard not applied");
            }
        }
    }
    tracing::debug!("Config update channel closed");
}
