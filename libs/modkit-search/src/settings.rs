use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use modkit_query_errors::QueryError;
use serde::{Deserialize, Serialize};

/// Deployment-tunable search limits.
///
/// ```yaml
/// default_per_page: 25
/// max_per_page: 100
/// max_page: 500
/// max_predicates: 20
/// max_or_conditions: 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSettings {
    #[serde(default = "default_per_page")]
    pub default_per_page: i64,
    #[serde(default = "default_max_per_page")]
    pub max_per_page: i64,
    #[serde(default)]
    pub max_page: Option<i64>,
    #[serde(default)]
    pub max_predicates: Option<usize>,
    #[serde(default)]
    pub max_or_conditions: Option<usize>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
            max_page: None,
            max_predicates: None,
            max_or_conditions: None,
        }
    }
}

fn default_per_page() -> i64 {
    25
}

fn default_max_per_page() -> i64 {
    100
}

impl SearchSettings {
    /// Extract settings from an already assembled figment.
    ///
    /// # Errors
    /// Returns a configuration error when a value has the wrong type or an
    /// unknown key is present.
    pub fn from_figment(figment: &Figment) -> Result<Self, QueryError> {
        figment
            .extract()
            .map_err(|e| QueryError::configuration("search_settings", e.to_string()))
    }

    /// Defaults, overridden by the YAML file at `path` (if it exists), then by
    /// environment variables starting with `env_prefix`
    /// (`SEARCH_MAX_PER_PAGE=50`).
    ///
    /// # Errors
    /// See [`SearchSettings::from_figment`].
    pub fn load(path: impl AsRef<Path>, env_prefix: &str) -> Result<Self, QueryError> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed(env_prefix));
        Self::from_figment(&figment)
    }
}
