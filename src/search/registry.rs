//! Registry of named index configurations
//!
//! Configurations are registered and applied during startup. After that the
//! registry is only read, by the request builder and the gateway.

use crate::engine::SearchEngine;
use crate::metrics::CONFIGURATION_APPLIES_TOTAL;
use crate::search::error::{SearchError, SearchResult};
use crate::search::settings::IndexConfiguration;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle of one named configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationState {
    /// Registered but not yet pushed to the engine
    Unconfigured,
    /// Settings accepted by the engine
    Configured,
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    configuration: Arc<IndexConfiguration>,
    state: ConfigurationState,
}

/// Listing entry for one configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationSummary {
    pub name: String,
    pub index_uid: String,
    pub state: ConfigurationState,
}

/// Holds the named configurations and applies them to the engine
pub struct ConfigurationRegistry {
    engine: Arc<dyn SearchEngine>,
    entries: DashMap<String, RegistryEntry>,
}

impl ConfigurationRegistry {
    pub fn new(engine: Arc<dyn SearchEngine>) -> Self {
        Self {
            engine,
            entries: DashMap::new(),
        }
    }

    /// Add or replace a configuration
    ///
    /// Replacing with different settings puts the name back to
    /// `Unconfigured`; re-registering an identical configuration keeps its
    /// state.
    pub fn register(&self, configuration: IndexConfiguration) -> Arc<IndexConfiguration> {
        let name = configuration.name.clone();
        let configuration = Arc::new(configuration);

        let state = match self.entries.get(&name) {
            Some(existing) if *existing.configuration == *configuration => existing.state,
            Some(_) => {
                info!(name = %name, "Replacing registered configuration");
                ConfigurationState::Unconfigured
            }
            None => {
                info!(name = %name, index_uid = %configuration.index_uid, "Registered configuration");
                ConfigurationState::Unconfigured
            }
        };

        self.entries.insert(
            name,
            RegistryEntry {
                configuration: configuration.clone(),
                state,
            },
        );

        configuration
    }

    /// Push one configuration's settings to its index
    ///
    /// The configuration is validated first, so an invalid one never reaches
    /// the engine. Engine failures are returned as-is and not retried.
    pub async fn apply(&self, name: &str) -> SearchResult<()> {
        let configuration = self
            .get(name)
            .ok_or_else(|| SearchError::IndexNotFound(format!("no configuration named `{}`", name)))?;

        let result = self.push(&configuration).await;

        let outcome = match &result {
            Ok(()) => "ok",
            Err(e) => e.kind(),
        };
        CONFIGURATION_APPLIES_TOTAL
            .with_label_values(&[name, outcome])
            .inc();

        match result {
            Ok(()) => {
                // Only mark the entry that was applied; a concurrent re-register wins
                if let Some(mut entry) = self.entries.get_mut(name) {
                    if Arc::ptr_eq(&entry.configuration, &configuration) {
                        entry.state = ConfigurationState::Configured;
                    }
                }
                info!(name, index_uid = %configuration.index_uid, "Configuration applied");
                Ok(())
            }
            Err(e) => {
                warn!(name, error = %e, "Failed to apply configuration");
                Err(e)
            }
        }
    }

    async fn push(&self, configuration: &IndexConfiguration) -> SearchResult<()> {
        configuration.check()?;

        self.engine
            .create_or_get_index(&configuration.index_uid, &configuration.primary_key)
            .await?;
        debug!(index_uid = %configuration.index_uid, "Updating index settings");
        self.engine
            .update_settings(&configuration.index_uid, &configuration.settings)
            .await
    }

    /// Apply every configuration in name order, stopping at the first error
    pub async fn apply_all(&self) -> SearchResult<()> {
        for name in self.names() {
            self.apply(&name).await?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<IndexConfiguration>> {
        self.entries
            .get(name)
            .map(|entry| entry.configuration.clone())
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn state(&self, name: &str) -> Option<ConfigurationState> {
        self.entries.get(name).map(|entry| entry.state)
    }

    pub fn is_configured(&self, name: &str) -> bool {
        self.state(name) == Some(ConfigurationState::Configured)
    }

    /// Index uid for `name`, only once its configuration has been applied
    pub fn applied_index(&self, name: &str) -> Option<String> {
        self.entries
            .get(name)
            .filter(|entry| entry.state == ConfigurationState::Configured)
            .map(|entry| entry.configuration.index_uid.clone())
    }

    /// Configured entries, sorted by name
    pub fn configured(&self) -> Vec<Arc<IndexConfiguration>> {
        self.names()
            .iter()
            .filter_map(|name| {
                self.entries
                    .get(name)
                    .filter(|entry| entry.state == ConfigurationState::Configured)
                    .map(|entry| entry.configuration.clone())
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<ConfigurationSummary> {
        self.names()
            .into_iter()
            .filter_map(|name| {
                self.entries.get(&name).map(|entry| ConfigurationSummary {
                    index_uid: entry.configuration.index_uid.clone(),
                    state: entry.state,
                    name,
                })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::InMemoryEngine;
    use crate::search::settings::IndexSettings;

    fn setup() -> (Arc<InMemoryEngine>, ConfigurationRegistry) {
        let engine = Arc::new(InMemoryEngine::new());
        let registry = ConfigurationRegistry::new(engine.clone());
        (engine, registry)
    }

    fn config(name: &str) -> IndexConfiguration {
        IndexConfiguration::new(name, format!("idx_{}", name), "id", IndexSettings::default())
    }

    #[tokio::test]
    async fn test_apply_marks_configured() {
        let (engine, registry) = setup();
        registry.register(config("v1"));

        assert_eq!(registry.state("v1"), Some(ConfigurationState::Unconfigured));
        assert!(registry.applied_index("v1").is_none());

        registry.apply("v1").await.unwrap();

        assert!(registry.is_configured("v1"));
        assert_eq!(registry.applied_index("v1").as_deref(), Some("idx_v1"));
        assert_eq!(engine.settings("idx_v1"), Some(IndexSettings::default()));
    }

    #[tokio::test]
    async fn test_apply_twice_is_idempotent() {
        let (engine, registry) = setup();
        registry.register(config("v1"));

        registry.apply("v1").await.unwrap();
        let once = engine.settings("idx_v1");
        registry.apply("v1").await.unwrap();

        assert_eq!(engine.settings("idx_v1"), once);
        assert_eq!(engine.settings_updates("idx_v1"), 2);
        assert_eq!(engine.index_uids(), vec!["idx_v1"]);
    }

    #[tokio::test]
    async fn test_invalid_configuration_never_reaches_engine() {
        let (engine, registry) = setup();
        registry.register(config("bad").with_searchable_attributes(Vec::<String>::new()));

        let err = registry.apply("bad").await.unwrap_err();
        assert!(matches!(err, SearchError::Configuration(_)));
        assert!(engine.index_uids().is_empty());
        assert!(!registry.is_configured("bad"));
    }

    #[tokio::test]
    async fn test_unknown_name() {
        let (_, registry) = setup();
        assert!(matches!(
            registry.apply("v9").await,
            Err(SearchError::IndexNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_engine_unavailable_surfaces() {
        let (engine, registry) = setup();
        registry.register(config("v1"));
        engine.set_unavailable(true);

        assert!(matches!(
            registry.apply("v1").await,
            Err(SearchError::EngineUnavailable(_))
        ));
        assert!(!registry.is_configured("v1"));
    }

    #[tokio::test]
    async fn test_register_replacement_resets_state() {
        let (_, registry) = setup();
        registry.register(config("v1"));
        registry.apply("v1").await.unwrap();

        registry.register(config("v1"));
        assert!(registry.is_configured("v1"));

        let mut changed = config("v1");
        changed.settings.stop_words.insert("the".to_string());
        registry.register(changed);
        assert!(!registry.is_configured("v1"));
    }

    #[tokio::test]
    async fn test_apply_all_in_name_order() {
        let (engine, registry) = setup();
        registry.register(config("v2"));
        registry.register(config("v1"));

        registry.apply_all().await.unwrap();

        assert_eq!(registry.names(), vec!["v1", "v2"]);
        assert_eq!(registry.configured().len(), 2);
        assert_eq!(engine.index_uids(), vec!["idx_v1", "idx_v2"]);

        let summaries = registry.summaries();
        assert_eq!(summaries[0].name, "v1");
        assert_eq!(summaries[1].state, ConfigurationState::Configured);
    }
}
