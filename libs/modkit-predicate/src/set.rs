use std::collections::BTreeMap;

use modkit_query_errors::QueryError;
use sea_orm::{ColumnTrait, Condition, DbBackend, EntityTrait, Iterable, QueryFilter, Select};
use serde_json::Value as Json;

use crate::condition::{self, BuildContext};
use crate::dialect::Dialect;
use crate::family::TypeFamily;
use crate::field::FieldDeclaration;
use crate::operator::Operator;
use crate::temporal::Clock;

const MAX_SUGGESTIONS: usize = 3;
const MIN_SIMILARITY: f64 = 0.7;

/// One generated predicate: `{field}_{suffix}` bound to a field and operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateDefinition {
    name: String,
    field: String,
    field_index: usize,
    operator: Operator,
}

impl PredicateDefinition {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }
}

/// Frozen predicate registry for one entity.
///
/// Produced by [`PredicateSetBuilder::build`]. Every predicate name is known
/// once the set exists; dispatch is a map lookup and never mutates the set,
/// so a single value can be shared by any number of concurrent callers.
#[derive(Debug, Clone)]
pub struct PredicateSet<E: EntityTrait> {
    model: String,
    dialect: Dialect,
    clock: Clock,
    fields: Vec<FieldDeclaration<E::Column>>,
    definitions: BTreeMap<String, PredicateDefinition>,
}

/// Builder for [`PredicateSet`].
#[must_use]
pub struct PredicateSetBuilder<E: EntityTrait> {
    model: String,
    dialect: Dialect,
    clock: Clock,
    fields: Vec<FieldDeclaration<E::Column>>,
}

impl<E: EntityTrait> PredicateSetBuilder<E> {
    /// Declare a field; its family comes from the column definition.
    pub fn field(mut self, column: E::Column) -> Self {
        self.fields.push(FieldDeclaration::new(column));
        self
    }

    /// Declare a field with an explicit family.
    ///
    /// Needed where the storage type hides the shape of the data, e.g. a JSON
    /// text column holding an array on SQLite.
    pub fn field_as(mut self, column: E::Column, family: TypeFamily) -> Self {
        let storage = column.def().get_column_type().clone();
        self.fields
            .push(FieldDeclaration::with_family(column, storage, family));
        self
    }

    pub fn fields(mut self, columns: impl IntoIterator<Item = E::Column>) -> Self {
        self.fields
            .extend(columns.into_iter().map(FieldDeclaration::new));
        self
    }

    /// Declare every column of the entity.
    pub fn all_fields(self) -> Self {
        self.fields(E::Column::iter())
    }

    /// Backend whose SQL dialect is used for array, document and date-part
    /// operators. Defaults to Postgres.
    pub fn backend(mut self, backend: DbBackend) -> Self {
        self.dialect = backend.into();
        self
    }

    /// Clock for relative temporal predicates. Defaults to the system clock.
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Derive every predicate name and freeze the set.
    ///
    /// # Errors
    /// Returns a configuration error if a field is declared twice or two
    /// fields derive the same predicate name.
    pub fn build(self) -> Result<PredicateSet<E>, QueryError> {
        let mut definitions: BTreeMap<String, PredicateDefinition> = BTreeMap::new();
        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.name() == field.name()) {
                return Err(QueryError::configuration(
                    &self.model,
                    format!("field '{}' is declared more than once", field.name()),
                ));
            }
            for &operator in field.family().operators() {
                let name = format!("{}_{}", field.name(), operator.suffix());
                if let Some(existing) = definitions.get(&name) {
                    return Err(QueryError::configuration(
                        &self.model,
                        format!(
                            "predicate '{name}' is derived by both '{}' and '{}'",
                            existing.field,
                            field.name()
                        ),
                    ));
                }
                definitions.insert(
                    name.clone(),
                    PredicateDefinition {
                        name,
                        field: field.name().to_owned(),
                        field_index: index,
                        operator,
                    },
                );
            }
        }

        tracing::debug!(
            model = %self.model,
            fields = self.fields.len(),
            predicates = definitions.len(),
            "predicate set built"
        );

        Ok(PredicateSet {
            model: self.model,
            dialect: self.dialect,
            clock: self.clock,
            fields: self.fields,
            definitions,
        })
    }
}

impl<E: EntityTrait> PredicateSet<E> {
    /// Start declaring the predicate set of model `model`.
    pub fn builder(model: impl Into<String>) -> PredicateSetBuilder<E> {
        PredicateSetBuilder {
            model: model.into(),
            dialect: Dialect::default(),
            clock: Clock::default(),
            fields: Vec::new(),
        }
    }

    /// Model name used in error tags.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    #[must_use]
    pub fn definition(&self, name: &str) -> Option<&PredicateDefinition> {
        self.definitions.get(name)
    }

    /// All predicate names, sorted.
    pub fn predicate_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    #[must_use]
    pub fn has_predicates(&self, field: &str) -> bool {
        self.field(field).is_some()
    }

    /// Predicate names generated for `field`, in operator-table order.
    #[must_use]
    pub fn predicates_for(&self, field: &str) -> Vec<String> {
        self.field(field)
            .map(|f| {
                f.family()
                    .operators()
                    .iter()
                    .map(|op| format!("{}_{}", f.name(), op.suffix()))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDeclaration<E::Column>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Declared fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDeclaration<E::Column>] {
        &self.fields
    }

    /// Build the condition of predicate `name` applied to `arg`.
    ///
    /// # Errors
    /// - invalid predicate if `name` was not generated for this model
    /// - invalid argument if `arg` has the wrong shape for the operator
    pub fn condition(&self, name: &str, arg: &Json) -> Result<Condition, QueryError> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| self.unknown_predicate(name))?;
        let field = self
            .fields
            .get(definition.field_index)
            .ok_or_else(|| QueryError::configuration(&self.model, "predicate without a field"))?;
        let ctx = BuildContext {
            dialect: self.dialect,
            clock: &self.clock,
        };
        condition::build(field, definition.operator, arg, &ctx)
            .map_err(|expected| QueryError::invalid_argument(&self.model, name, expected.0))
    }

    /// Apply predicate `name` to `select`, returning the narrowed relation.
    ///
    /// # Errors
    /// See [`PredicateSet::condition`].
    pub fn apply(&self, select: Select<E>, name: &str, arg: &Json) -> Result<Select<E>, QueryError> {
        Ok(select.filter(self.condition(name, arg)?))
    }

    /// The error reported for an unknown predicate name, with suggestions.
    #[must_use]
    pub fn unknown_predicate(&self, name: &str) -> QueryError {
        let valid: Vec<String> = self.definitions.keys().cloned().collect();
        let suggestions = self.suggestions(name);
        QueryError::invalid_predicate(&self.model, name, valid, suggestions)
    }

    /// Same-field names first (longest declared field that prefixes `name`),
    /// otherwise the closest names by Jaro-Winkler similarity.
    fn suggestions(&self, name: &str) -> Vec<String> {
        let prefixed = self
            .fields
            .iter()
            .filter(|f| {
                name.strip_prefix(f.name())
                    .is_some_and(|rest| rest.starts_with('_'))
            })
            .max_by_key(|f| f.name().len());
        if let Some(field) = prefixed {
            return self.predicates_for(field.name());
        }

        let mut scored: Vec<(f64, &String)> = self
            .definitions
            .keys()
            .map(|candidate| (strsim::jaro_winkler(name, candidate), candidate))
            .filter(|(score, _)| *score >= MIN_SIMILARITY)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
        scored
            .into_iter()
            .take(MAX_SUGGESTIONS)
            .map(|(_, candidate)| candidate.clone())
            .collect()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::testing::article;
    use modkit_query_errors::{ErrorCategory, QueryErrorKind};
    use sea_orm::{DbBackend, QueryTrait, Value};
    use serde_json::json;

    fn set() -> PredicateSet<article::Entity> {
        article::predicates(DbBackend::Sqlite)
    }

    fn sql(select: Select<article::Entity>) -> String {
        select.build(DbBackend::Sqlite).to_string()
    }

    #[test]
    fn names_follow_field_and_suffix() {
        let set = set();
        assert!(set.contains("title_cont"));
        assert!(set.contains("view_count_between"));
        assert!(set.contains("published_at_this_week"));
        assert!(set.contains("featured_false"));
        assert!(set.contains("metadata_has_key"));
        assert!(set.contains("tags_overlaps"));
        assert!(!set.contains("title_gt"));
        assert!(!set.contains("view_count_cont"));
    }

    #[test]
    fn introspection_lists_field_predicates() {
        let set = set();
        assert!(set.has_predicates("featured"));
        assert!(!set.has_predicates("nope"));
        assert_eq!(
            set.predicates_for("featured"),
            vec![
                "featured_eq",
                "featured_true",
                "featured_false",
                "featured_present",
                "featured_null"
            ]
        );
        let names: Vec<&str> = set.predicate_names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn unknown_name_suggests_same_field() {
        let err = set()
            .apply(article::Entity::find(), "title_like", &json!("x"))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidPredicate);
        let QueryErrorKind::InvalidPredicate {
            name, suggestions, ..
        } = err.kind()
        else {
            panic!("unexpected kind: {err:?}");
        };
        assert_eq!(name, "title_like");
        assert!(suggestions.iter().any(|s| s == "title_cont"));
        assert!(err.to_string().contains("title_cont"));
    }

    #[test]
    fn unknown_name_falls_back_to_similarity() {
        let err = set().unknown_predicate("titel_cont");
        let QueryErrorKind::InvalidPredicate { suggestions, .. } = err.kind() else {
            panic!("unexpected kind: {err:?}");
        };
        assert_eq!(suggestions.first().map(String::as_str), Some("title_cont"));
    }

    #[test]
    fn duplicate_derived_name_fails_build() {
        let err = PredicateSet::<article::Entity>::builder("article")
            .field(article::Column::Title)
            .field(article::Column::Title)
            .build()
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Configuration);
    }

    #[test]
    fn wrong_argument_shape_is_reported() {
        let err = set()
            .condition("view_count_between", &json!(5))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);
        assert!(err.to_string().contains("view_count_between"));

        let err = set().condition("published_at_month", &json!(13)).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    }

    #[test]
    fn like_predicates_are_case_insensitive_and_escaped() {
        let stmt = set()
            .apply(article::Entity::find(), "title_cont", &json!("50%_Off"))
            .unwrap()
            .build(DbBackend::Sqlite);
        assert!(stmt.sql.contains("LOWER("), "{}", stmt.sql);
        assert!(stmt.sql.contains("ESCAPE"), "{}", stmt.sql);
        let values = stmt.values.unwrap().0;
        assert!(values.contains(&Value::from("%50\\%\\_Off%".to_owned())));
    }

    #[test]
    fn mysql_like_uses_the_default_escape() {
        let stmt = article::predicates(DbBackend::MySql)
            .apply(article::Entity::find(), "title_start", &json!("Über"))
            .unwrap()
            .build(DbBackend::MySql);
        assert!(stmt.sql.contains("LOWER(?)"), "{}", stmt.sql);
        assert!(!stmt.sql.contains("ESCAPE"), "{}", stmt.sql);
    }

    #[test]
    fn eq_null_means_is_null() {
        let q = sql(set()
            .apply(article::Entity::find(), "status_eq", &Json::Null)
            .unwrap());
        assert!(q.contains("\"articles\".\"status\" IS NULL"), "{q}");
    }

    #[test]
    fn present_false_is_blank() {
        let set = set();
        let present_false = sql(set
            .apply(article::Entity::find(), "title_present", &json!(false))
            .unwrap());
        let blank = sql(set
            .apply(article::Entity::find(), "title_blank", &Json::Null)
            .unwrap());
        assert_eq!(present_false, blank);
    }

    #[test]
    fn empty_in_matches_nothing() {
        let stmt = set()
            .apply(article::Entity::find(), "status_in", &json!([]))
            .unwrap()
            .build(DbBackend::Sqlite);
        assert!(!stmt.sql.contains(" IN "), "{}", stmt.sql);
        assert_eq!(stmt.values.unwrap().0, vec![Value::from(false)]);
    }

    #[test]
    fn values_are_bound_not_interpolated() {
        let stmt = set()
            .apply(
                article::Entity::find(),
                "title_eq",
                &json!("x'; DROP TABLE articles; --"),
            )
            .unwrap()
            .build(DbBackend::Sqlite);
        assert!(!stmt.sql.contains("DROP TABLE"), "{}", stmt.sql);
        assert_eq!(stmt.values.unwrap().0.len(), 1);
    }
}
