use std::sync::OnceLock;

use modkit_predicate::PredicateSet;
use modkit_query_errors::QueryError;
use sea_orm::{Condition, EntityTrait, QueryFilter, QuerySelect, Select};
use serde_json::Value as Json;
use tracing::{debug, warn};

use crate::config::SearchableConfig;
use crate::pagination::{self, PageWindow, Pagination};
use crate::request::{PredicateMap, SearchRequest};
use crate::sort::SortScopes;

/// Unexecuted result of [`SearchModel::search`].
#[derive(Debug, Clone)]
pub struct ComposedRelation<E: EntityTrait> {
    select: Select<E>,
    window: PageWindow,
}

impl<E: EntityTrait> ComposedRelation<E> {
    #[must_use]
    pub fn select(&self) -> &Select<E> {
        &self.select
    }

    #[must_use]
    pub fn window(&self) -> PageWindow {
        self.window
    }

    #[must_use]
    pub fn into_select(self) -> Select<E> {
        self.select
    }

    #[must_use]
    pub fn into_parts(self) -> (Select<E>, PageWindow) {
        (self.select, self.window)
    }
}

/// Everything needed to search one entity: predicates, order scopes and
/// configuration, cross-validated and frozen.
#[derive(Debug, Clone)]
pub struct SearchModel<E: EntityTrait> {
    predicates: PredicateSet<E>,
    sorts: SortScopes<E>,
    config: SearchableConfig,
}

impl<E: EntityTrait> SearchModel<E> {
    /// Bundle the parts of a searchable model.
    ///
    /// # Errors
    /// Returns a configuration error when a security policy requires a
    /// predicate the set does not define, or the default order names an
    /// unknown scope.
    pub fn new(
        predicates: PredicateSet<E>,
        sorts: SortScopes<E>,
        config: SearchableConfig,
    ) -> Result<Self, QueryError> {
        let model = predicates.model();
        for policy in config.policies().iter() {
            let unknown: Vec<&str> = policy
                .required()
                .iter()
                .map(String::as_str)
                .filter(|name| !predicates.contains(name))
                .collect();
            if !unknown.is_empty() {
                return Err(QueryError::configuration(
                    model,
                    format!(
                        "security policy '{}' requires undefined predicates: {}",
                        policy.name(),
                        unknown.join(", ")
                    ),
                ));
            }
        }
        if let Some(scope) = config.default_order().iter().find(|s| !sorts.contains(s)) {
            return Err(QueryError::configuration(
                model,
                format!("default order scope '{scope}' is not declared"),
            ));
        }
        Ok(Self {
            predicates,
            sorts,
            config,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        self.predicates.model()
    }

    #[must_use]
    pub fn predicates(&self) -> &PredicateSet<E> {
        &self.predicates
    }

    #[must_use]
    pub fn sorts(&self) -> &SortScopes<E> {
        &self.sorts
    }

    #[must_use]
    pub fn config(&self) -> &SearchableConfig {
        &self.config
    }

    pub fn predicate_names(&self) -> impl Iterator<Item = &str> {
        self.predicates.predicate_names()
    }

    #[must_use]
    pub fn has_predicates(&self, field: &str) -> bool {
        self.predicates.has_predicates(field)
    }

    #[must_use]
    pub fn predicates_for(&self, field: &str) -> Vec<String> {
        self.predicates.predicates_for(field)
    }

    pub fn order_names(&self) -> impl Iterator<Item = &str> {
        self.sorts.names()
    }

    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.config.policies().names()
    }

    /// Compose `select` with the filters, ordering and page of `request`.
    ///
    /// Validation runs completely before anything is composed: OR shape,
    /// security policy, complexity limits, predicate names, order names,
    /// pagination. Only then are conditions built and applied.
    ///
    /// # Errors
    /// Any [`QueryError`]; on error no relation is returned.
    #[tracing::instrument(level = "debug", skip_all, fields(model = %self.model()))]
    pub fn search(
        &self,
        select: Select<E>,
        request: &SearchRequest,
    ) -> Result<ComposedRelation<E>, QueryError> {
        let model = self.model();
        let filters = &request.filters;
        filters.check_branches(model)?;

        let supplied = filters.names();
        if let Some(policy) = request.security.as_deref() {
            self.config.policies().enforce(model, policy, &supplied)?;
        }
        self.check_complexity(filters)?;
        if let Some(unknown) = supplied.iter().find(|name| !self.predicates.contains(name)) {
            return Err(self.predicates.unknown_predicate(unknown));
        }
        if let Some(unknown) = request.orders.iter().find(|name| !self.sorts.contains(name)) {
            return Err(self.sorts.unknown_order(unknown));
        }
        let window = pagination::validate(model, &request.pagination, self.config.limits())?;

        let mut select = select.filter(self.compose(filters)?);
        let orders = if request.orders.is_empty() {
            self.config.default_order()
        } else {
            request.orders.as_slice()
        };
        for scope in orders {
            select = self.sorts.apply(select, scope)?;
        }
        let select = select.limit(window.limit()).offset(window.offset());

        debug!(
            predicates = filters.predicate_count(),
            or_branches = filters.or_count(),
            page = window.page(),
            per_page = window.per_page(),
            "search composed"
        );
        Ok(ComposedRelation { select, window })
    }

    /// [`SearchModel::search`] with filters given as a JSON object.
    ///
    /// # Errors
    /// Malformed filters, plus everything [`SearchModel::search`] reports.
    pub fn search_json(
        &self,
        select: Select<E>,
        filters: &Json,
        orders: &[&str],
        pagination: Pagination,
        security: Option<&str>,
    ) -> Result<ComposedRelation<E>, QueryError> {
        let request = SearchRequest {
            filters: PredicateMap::from_json(self.model(), filters)?,
            orders: orders.iter().map(|s| (*s).to_owned()).collect(),
            pagination,
            security: security.map(str::to_owned),
        };
        self.search(select, &request)
    }

    fn check_complexity(&self, filters: &PredicateMap) -> Result<(), QueryError> {
        let limits = [
            ("max_predicates", self.config.max_predicates(), filters.predicate_count()),
            ("max_or_conditions", self.config.max_or_conditions(), filters.or_count()),
        ];
        for (limit, max, actual) in limits {
            if let Some(max) = max
                && actual > max
            {
                warn!(model = %self.model(), limit, max, actual, "search rejected: query too complex");
                return Err(QueryError::limit_exceeded(self.model(), limit, max, actual));
            }
        }
        Ok(())
    }

    /// AND of this level's predicates, AND-ed with the OR of its branches.
    fn compose(&self, filters: &PredicateMap) -> Result<Condition, QueryError> {
        let mut condition = Condition::all();
        for (name, arg) in filters.predicates() {
            condition = condition.add(self.predicates.condition(name, arg)?);
        }
        if !filters.branches().is_empty() {
            let mut any = Condition::any();
            for branch in filters.branches() {
                any = any.add(self.compose(branch)?);
            }
            condition = condition.add(any);
        }
        Ok(condition)
    }
}

/// Process-wide slot for a [`SearchModel`], installed once at startup.
pub struct SearchModelCell<E: EntityTrait> {
    name: &'static str,
    cell: OnceLock<SearchModel<E>>,
}

impl<E: EntityTrait> SearchModelCell<E> {
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceLock::new(),
        }
    }

    /// Freeze `model` into the cell.
    ///
    /// # Errors
    /// Returns a configuration error if a model was already installed.
    pub fn install(&self, model: SearchModel<E>) -> Result<&SearchModel<E>, QueryError> {
        self.cell.set(model).map_err(|_| {
            QueryError::configuration(self.name, "search model is already frozen")
        })?;
        self.get()
    }

    /// # Errors
    /// Returns a configuration error if nothing was installed yet.
    pub fn get(&self) -> Result<&SearchModel<E>, QueryError> {
        self.cell.get().ok_or_else(|| {
            QueryError::configuration(self.name, "search model used before it was installed")
        })
    }
}

/// Entities searchable through a model installed in a [`SearchModelCell`].
///
/// ```rust,ignore
/// static POSTS: SearchModelCell<post::Entity> = SearchModelCell::new("post");
///
/// impl Searchable for post::Entity {
///     fn search_model() -> Result<&'static SearchModel<Self>, QueryError> {
///         POSTS.get()
///     }
/// }
///
/// let page = post::Entity::search(&request)?.into_select().all(&db).await?;
/// ```
pub trait Searchable: EntityTrait {
    /// # Errors
    /// Returns a configuration error when the model is not installed.
    fn search_model() -> Result<&'static SearchModel<Self>, QueryError>;

    /// Search starting from `Self::find()`.
    ///
    /// # Errors
    /// See [`SearchModel::search`].
    fn search(request: &SearchRequest) -> Result<ComposedRelation<Self>, QueryError> {
        Self::search_model()?.search(Self::find(), request)
    }
}
