#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Search orchestration over [`modkit_predicate`] predicate sets.
//!
//! A [`SearchModel`] turns one [`SearchRequest`] (filters with optional OR
//! groups, order scopes, pagination, security policy) into an unexecuted
//! `Select`. Every check runs before the first condition is built, and any
//! failure returns a [`QueryError`] instead of a partially filtered relation.
//!
//! ```rust,ignore
//! let model = SearchModel::new(
//!     predicates,
//!     SortScopes::builder("post")
//!         .scope("newest", [(post::Column::PublishedAt, Order::Desc)])
//!         .build()?,
//!     SearchableConfig::builder("post")
//!         .default_order(["newest"])
//!         .max_per_page(100)
//!         .security_policy("status_required", ["status_eq"])
//!         .build()?,
//! )?;
//!
//! let page = model
//!     .search_json(
//!         post::Entity::find(),
//!         &json!({"or": [{"title_cont": "Ruby"}, {"title_cont": "Rails"}]}),
//!         &[],
//!         Pagination::new(1, 20),
//!         None,
//!     )?
//!     .into_select()
//!     .all(&db)
//!     .await?;
//! ```

mod config;
mod model;
mod pagination;
mod policy;
mod request;
mod settings;
mod sort;

pub use config::{SearchableConfig, SearchableConfigBuilder};
pub use model::{ComposedRelation, SearchModel, SearchModelCell, Searchable};
pub use modkit_query_errors::QueryError;
pub use pagination::{PageWindow, Pagination, PaginationLimits, validate as validate_pagination};
pub use policy::{SecurityPolicies, SecurityPolicy};
pub use request::{OR_KEY, PredicateMap, SearchRequest};
pub use settings::SearchSettings;
pub use sort::{SortScopes, SortScopesBuilder};
