//! The full set of persistent datasets, built explicitly from a config.
//!
//! A [`Workspace`] owns one handle per dataset, all sharing one backing
//! store. Callers construct it and pass it where it is needed; nothing in
//! this crate holds process-wide state.

use std::sync::Arc;

use tracing::info;

use crate::clock::{Clock, FixedOffsetFormatter, SystemClock, TimestampFormatter};
use crate::config::StorageConfig;
use crate::history::ActivityHistory;
use crate::kv::SharedStore;
use crate::preferences::PreferenceStore;
use crate::projects::ProjectStorage;

/// Projects, Hamming projects, activity history and preferences.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub projects: ProjectStorage,
    pub hamming_projects: ProjectStorage,
    pub history: ActivityHistory,
    pub preferences: PreferenceStore,
}

impl Workspace {
    /// Build every dataset over `store` using wall-clock time.
    pub fn open(store: SharedStore, config: &StorageConfig) -> Self {
        Self::open_with_clock(store, config, Arc::new(SystemClock))
    }

    /// Build every dataset over `store` with an explicit time source.
    pub fn open_with_clock(
        store: SharedStore,
        config: &StorageConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let formatter: Arc<dyn TimestampFormatter> = Arc::new(FixedOffsetFormatter::new(
            config.display_offset_secs,
            config.display_pattern.clone(),
        ));

        let projects = ProjectStorage::new(
            Arc::clone(&store),
            config.projects_key.clone(),
            config.max_projects,
        )
        .with_clock(Arc::clone(&clock))
        .with_formatter(Arc::clone(&formatter));

        let hamming_projects = ProjectStorage::new(
            Arc::clone(&store),
            config.hamming_projects_key.clone(),
            config.max_hamming_projects,
        )
        .with_clock(Arc::clone(&clock))
        .with_formatter(Arc::clone(&formatter));

        let history = ActivityHistory::new(
            Arc::clone(&store),
            config.history_key.clone(),
            config.max_history_entries,
        )
        .with_clock(clock)
        .with_formatter(formatter);

        let preferences = PreferenceStore::new(store, config.preferences_key.clone());

        info!(
            projects = %config.projects_key,
            hamming = %config.hamming_projects_key,
            "workspace opened"
        );

        Self {
            projects,
            hamming_projects,
            history,
            preferences,
        }
    }

    /// The project dataset selected by `hamming`.
    pub fn project_set(&self, hamming: bool) -> &ProjectStorage {
        if hamming {
            &self.hamming_projects
        } else {
            &self.projects
        }
    }
}
