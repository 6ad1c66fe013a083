use modkit_query_errors::QueryError;
use sea_orm::{EntityTrait, Select};
use serde_json::Value as Json;

use crate::set::PredicateSet;

/// Call generated predicates directly on a `Select`.
///
/// The result is an ordinary `Select`, so predicates chain with `SeaORM`'s own
/// query methods.
///
/// # Example
/// ```rust,ignore
/// use modkit_predicate::PredicateSelectExt;
///
/// let drafts = post::Entity::find()
///     .predicate(&predicates, "status_eq", json!("draft"))?
///     .predicate(&predicates, "title_cont", json!("rust"))?
///     .order_by_desc(post::Column::Id);
/// ```
pub trait PredicateSelectExt<E: EntityTrait>: Sized {
    /// Narrow the relation with predicate `name` of `set`.
    ///
    /// # Errors
    /// Unknown predicate names and malformed arguments, see
    /// [`PredicateSet::condition`].
    fn predicate(self, set: &PredicateSet<E>, name: &str, arg: Json) -> Result<Self, QueryError>;
}

impl<E: EntityTrait> PredicateSelectExt<E> for Select<E> {
    fn predicate(self, set: &PredicateSet<E>, name: &str, arg: Json) -> Result<Self, QueryError> {
        set.apply(self, name, &arg)
    }
}
