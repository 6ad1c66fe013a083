use std::collections::BTreeMap;

use modkit_query_errors::QueryError;
use sea_orm::{EntityTrait, Order, QueryOrder, Select};

/// Named order scopes of a model (`newest`, `most_viewed`, ...).
///
/// Each scope is an ordered list of `(column, direction)` pairs applied with
/// `ORDER BY` in sequence.
#[derive(Debug, Clone)]
pub struct SortScopes<E: EntityTrait> {
    model: String,
    scopes: BTreeMap<String, Vec<(E::Column, Order)>>,
}

#[must_use]
pub struct SortScopesBuilder<E: EntityTrait> {
    model: String,
    scopes: Vec<(String, Vec<(E::Column, Order)>)>,
}

impl<E: EntityTrait> SortScopesBuilder<E> {
    pub fn scope(
        mut self,
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (E::Column, Order)>,
    ) -> Self {
        self.scopes
            .push((name.into(), columns.into_iter().collect()));
        self
    }

    /// Freeze the scopes.
    ///
    /// # Errors
    /// Returns a configuration error for a duplicate or empty scope.
    pub fn build(self) -> Result<SortScopes<E>, QueryError> {
        let mut scopes = BTreeMap::new();
        for (name, columns) in self.scopes {
            if columns.is_empty() {
                return Err(QueryError::configuration(
                    &self.model,
                    format!("order scope '{name}' has no columns"),
                ));
            }
            if scopes.contains_key(&name) {
                return Err(QueryError::configuration(
                    &self.model,
                    format!("order scope '{name}' is declared more than once"),
                ));
            }
            scopes.insert(name, columns);
        }
        Ok(SortScopes {
            model: self.model,
            scopes,
        })
    }
}

impl<E: EntityTrait> SortScopes<E> {
    pub fn builder(model: impl Into<String>) -> SortScopesBuilder<E> {
        SortScopesBuilder {
            model: model.into(),
            scopes: Vec::new(),
        }
    }

    /// Valid scope names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.scopes.contains_key(name)
    }

    /// The error reported for an unknown scope name.
    #[must_use]
    pub fn unknown_order(&self, name: &str) -> QueryError {
        QueryError::invalid_order(&self.model, name, self.names().map(str::to_owned).collect())
    }

    /// Append scope `name` to the ordering of `select`.
    ///
    /// # Errors
    /// Returns an invalid-order error when `name` is not a declared scope.
    pub fn apply(&self, select: Select<E>, name: &str) -> Result<Select<E>, QueryError> {
        let columns = self
            .scopes
            .get(name)
            .ok_or_else(|| self.unknown_order(name))?;
        Ok(columns
            .iter()
            .fold(select, |select, (column, order)| {
                select.order_by(*column, order.clone())
            }))
    }
}
