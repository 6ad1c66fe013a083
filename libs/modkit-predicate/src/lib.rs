#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Typed filter predicates generated from `SeaORM` column metadata.
//!
//! A [`PredicateSet`] is declared once per entity. Each declared column is
//! classified into a [`TypeFamily`], and the family's fixed operator table
//! yields predicate names of the form `{field}_{suffix}`:
//!
//! ```rust,ignore
//! let predicates = PredicateSet::<post::Entity>::builder("post")
//!     .field(post::Column::Title)        // title_eq, title_cont, title_present, ...
//!     .field(post::Column::ViewCount)    // view_count_gt, view_count_between, ...
//!     .field(post::Column::PublishedAt)  // published_at_within, published_at_this_week, ...
//!     .backend(DbBackend::Postgres)
//!     .build()?;
//!
//! let select = predicates.apply(post::Entity::find(), "view_count_gteq", &json!(100))?;
//! ```
//!
//! Predicates compile to `sea_orm::Condition`s. Every user value is bound as
//! a parameter.

mod condition;
mod dialect;
mod ext;
mod family;
mod field;
mod operator;
mod set;
mod temporal;
mod value;

pub use dialect::Dialect;
pub use ext::PredicateSelectExt;
pub use family::{TypeFamily, classify};
pub use field::FieldDeclaration;
pub use modkit_query_errors::QueryError;
pub use operator::Operator;
pub use set::{PredicateDefinition, PredicateSet, PredicateSetBuilder};
pub use temporal::{CalendarWindow, Clock, Window, calendar_window, year_window};
