use std::collections::BTreeSet;

use modkit_query_errors::QueryError;
use serde_json::Value as Json;

use crate::pagination::Pagination;

/// Key holding OR branches in a JSON filter object.
pub const OR_KEY: &str = "or";

/// Filters of one request: predicates AND-combined at this level, plus OR
/// branches, each itself a `PredicateMap`.
///
/// ```json
/// {"status_eq": "published", "or": [{"title_cont": "Ruby"}, {"title_cont": "Rails"}]}
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateMap {
    predicates: Vec<(String, Json)>,
    or: Vec<PredicateMap>,
}

impl PredicateMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add predicate `name` with argument `arg` at this level.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, arg: Json) -> Self {
        self.predicates.push((name.into(), arg));
        self
    }

    /// Add one OR branch.
    #[must_use]
    pub fn or_branch(mut self, branch: Self) -> Self {
        self.or.push(branch);
        self
    }

    /// Parse a JSON filter object. `null` is an empty filter.
    ///
    /// # Errors
    /// Returns an invalid-argument error when the root is not an object,
    /// `or` is not an array of objects, or an OR branch is empty.
    pub fn from_json(model: &str, value: &Json) -> Result<Self, QueryError> {
        let entries = match value {
            Json::Null => return Ok(Self::default()),
            Json::Object(entries) => entries,
            _ => {
                return Err(QueryError::invalid_argument(
                    model,
                    "filters",
                    "a JSON object of predicate names",
                ));
            }
        };

        let mut map = Self::default();
        for (key, arg) in entries {
            if key != OR_KEY {
                map.predicates.push((key.clone(), arg.clone()));
                continue;
            }
            let Json::Array(branches) = arg else {
                return Err(invalid_or(model));
            };
            for branch in branches {
                if !branch.is_object() {
                    return Err(invalid_or(model));
                }
                map.or.push(Self::from_json(model, branch)?);
            }
        }
        map.check_branches(model)?;
        Ok(map)
    }

    #[must_use]
    pub fn predicates(&self) -> &[(String, Json)] {
        &self.predicates
    }

    #[must_use]
    pub fn branches(&self) -> &[Self] {
        &self.or
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty() && self.or.is_empty()
    }

    /// Every predicate name at every level.
    #[must_use]
    pub fn names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names(&self, names: &mut BTreeSet<String>) {
        names.extend(self.predicates.iter().map(|(name, _)| name.clone()));
        for branch in &self.or {
            branch.collect_names(names);
        }
    }

    /// Predicate entries at every level.
    #[must_use]
    pub fn predicate_count(&self) -> usize {
        self.predicates.len() + self.or.iter().map(Self::predicate_count).sum::<usize>()
    }

    /// OR branches at every level.
    #[must_use]
    pub fn or_count(&self) -> usize {
        self.or.len() + self.or.iter().map(Self::or_count).sum::<usize>()
    }

    /// An empty OR branch would match everything; reject it at any depth.
    ///
    /// # Errors
    /// Returns an invalid-argument error naming `or`.
    pub fn check_branches(&self, model: &str) -> Result<(), QueryError> {
        for branch in &self.or {
            if branch.is_empty() {
                return Err(QueryError::invalid_argument(
                    model,
                    OR_KEY,
                    "a non-empty object per OR branch",
                ));
            }
            branch.check_branches(model)?;
        }
        Ok(())
    }
}

fn invalid_or(model: &str) -> QueryError {
    QueryError::invalid_argument(model, OR_KEY, "an array of JSON objects")
}

/// One search call: filters, order scope names, pagination and an optional
/// security policy name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub filters: PredicateMap,
    pub orders: Vec<String>,
    pub pagination: Pagination,
    pub security: Option<String>,
}

impl SearchRequest {
    #[must_use]
    pub fn new(filters: PredicateMap) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn order(mut self, scope: impl Into<String>) -> Self {
        self.orders.push(scope.into());
        self
    }

    #[must_use]
    pub fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    #[must_use]
    pub fn security(mut self, policy: impl Into<String>) -> Self {
        self.security = Some(policy.into());
        self
    }
}
