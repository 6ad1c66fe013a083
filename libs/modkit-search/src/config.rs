use modkit_query_errors::QueryError;

use crate::pagination::PaginationLimits;
use crate::policy::{SecurityPolicies, SecurityPolicy};
use crate::settings::SearchSettings;

/// Frozen search configuration of a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchableConfig {
    model: String,
    default_order: Vec<String>,
    limits: PaginationLimits,
    policies: SecurityPolicies,
    max_predicates: Option<usize>,
    max_or_conditions: Option<usize>,
}

#[must_use]
#[derive(Debug, Clone)]
pub struct SearchableConfigBuilder {
    model: String,
    default_order: Vec<String>,
    settings: SearchSettings,
    policies: Vec<SecurityPolicy>,
}

impl SearchableConfigBuilder {
    /// Order scopes applied when a request names none.
    pub fn default_order<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_order = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_per_page(mut self, per_page: i64) -> Self {
        self.settings.default_per_page = per_page;
        self
    }

    pub fn max_per_page(mut self, per_page: i64) -> Self {
        self.settings.max_per_page = per_page;
        self
    }

    pub fn max_page(mut self, page: i64) -> Self {
        self.settings.max_page = Some(page);
        self
    }

    /// Upper bound on predicate entries per request, counted at every level.
    pub fn max_predicates(mut self, max: usize) -> Self {
        self.settings.max_predicates = Some(max);
        self
    }

    /// Upper bound on OR branches per request, counted at every level.
    pub fn max_or_conditions(mut self, max: usize) -> Self {
        self.settings.max_or_conditions = Some(max);
        self
    }

    /// Register a policy requiring every predicate in `required`.
    pub fn security_policy<I, S>(mut self, name: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policies.push(SecurityPolicy::new(name, required));
        self
    }

    /// Take pagination and complexity limits from deployment settings.
    pub fn with_settings(mut self, settings: &SearchSettings) -> Self {
        self.settings = settings.clone();
        self
    }

    /// Validate and freeze.
    ///
    /// # Errors
    /// Returns a configuration error when `default_per_page` is not within
    /// `1..=max_per_page`, `max_page` is below 1, a complexity limit is zero,
    /// or a policy is empty or declared twice.
    pub fn build(self) -> Result<SearchableConfig, QueryError> {
        let model = self.model.as_str();
        let settings = self.settings;
        if settings.max_per_page < 1 {
            return Err(QueryError::configuration(
                model,
                format!("max_per_page must be at least 1, got {}", settings.max_per_page),
            ));
        }
        if !(1..=settings.max_per_page).contains(&settings.default_per_page) {
            return Err(QueryError::configuration(
                model,
                format!(
                    "default_per_page must be between 1 and max_per_page ({}), got {}",
                    settings.max_per_page, settings.default_per_page
                ),
            ));
        }
        if let Some(max_page) = settings.max_page
            && max_page < 1
        {
            return Err(QueryError::configuration(
                model,
                format!("max_page must be at least 1, got {max_page}"),
            ));
        }
        if settings.max_predicates == Some(0) || settings.max_or_conditions == Some(0) {
            return Err(QueryError::configuration(
                model,
                "complexity limits must be at least 1",
            ));
        }

        let policies = SecurityPolicies::new(model, self.policies)?;
        Ok(SearchableConfig {
            model: self.model,
            default_order: self.default_order,
            limits: PaginationLimits {
                default_per_page: settings.default_per_page,
                max_per_page: settings.max_per_page,
                max_page: settings.max_page,
            },
            policies,
            max_predicates: settings.max_predicates,
            max_or_conditions: settings.max_or_conditions,
        })
    }
}

impl SearchableConfig {
    pub fn builder(model: impl Into<String>) -> SearchableConfigBuilder {
        SearchableConfigBuilder {
            model: model.into(),
            default_order: Vec::new(),
            settings: SearchSettings::default(),
            policies: Vec::new(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    #[must_use]
    pub fn limits(&self) -> &PaginationLimits {
        &self.limits
    }

    #[must_use]
    pub fn policies(&self) -> &SecurityPolicies {
        &self.policies
    }

    #[must_use]
    pub fn max_predicates(&self) -> Option<usize> {
        self.max_predicates
    }

    #[must_use]
    pub fn max_or_conditions(&self) -> Option<usize> {
        self.max_or_conditions
    }
}
