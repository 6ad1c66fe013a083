#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Error taxonomy for predicate dispatch and search composition.
//!
//! Every failure surfaced by the predicate and search layers is a
//! [`QueryError`]. The error carries three structured parts so that error
//! trackers can group and filter without parsing messages:
//!
//! - [`ErrorTags`]: the filterable `category` / `module` pair
//! - `context`: a small, high-level JSON map (offending value, model, policy)
//! - `extra`: the detailed JSON map (full valid-name lists, supplied sets)
//!
//! All kinds are fail-closed: a `search` call either returns a fully
//! composed relation or one of these errors, never both.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Coarse category of a [`QueryError`], used as the primary grouping tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidPredicate,
    InvalidOrder,
    InvalidPagination,
    InvalidSecurity,
    InvalidArgument,
    Configuration,
}

impl ErrorCategory {
    /// Stable string form, identical to the serialized representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPredicate => "invalid_predicate",
            Self::InvalidOrder => "invalid_order",
            Self::InvalidPagination => "invalid_pagination",
            Self::InvalidSecurity => "invalid_security",
            Self::InvalidArgument => "invalid_argument",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filterable tag pair attached to every error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorTags {
    /// Error category.
    pub category: ErrorCategory,
    /// Model (or subsystem) the error originated from.
    pub module: String,
}

/// Which pagination input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationField {
    Page,
    PerPage,
}

impl fmt::Display for PaginationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => f.write_str("page"),
            Self::PerPage => f.write_str("per_page"),
        }
    }
}

/// Direction of the pagination bound that was violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundRule {
    /// Value is below the minimum.
    Min,
    /// Value exceeds the maximum.
    Max,
}

impl fmt::Display for BoundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Min => f.write_str("is below the minimum of"),
            Self::Max => f.write_str("exceeds the maximum of"),
        }
    }
}

/// Details of a security policy rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SecurityViolation {
    /// The request named a policy that was never registered.
    #[error("unknown security policy '{policy}'; registered policies: {}", list(.known))]
    UnknownPolicy { policy: String, known: Vec<String> },

    /// The request did not filter by every predicate the policy requires.
    #[error(
        "security policy '{policy}' requires predicates [{}]; missing [{}]",
        list(.required),
        list(.missing)
    )]
    MissingPredicates {
        policy: String,
        required: Vec<String>,
        supplied: Vec<String>,
        missing: Vec<String>,
    },
}

/// Details of a configuration failure.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ConfigurationIssue {
    /// Declarative setup was rejected.
    #[error("invalid configuration: {message}")]
    Invalid { message: String },

    /// The query is more complex than the model allows.
    #[error("query exceeds {limit}: {actual} > {max}")]
    LimitExceeded {
        limit: String,
        max: usize,
        actual: usize,
    },
}

/// The kind of a [`QueryError`] together with its kind-specific payload.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryErrorKind {
    #[error("unknown predicate '{name}'; did you mean one of: {}", list(.suggestions))]
    InvalidPredicate {
        name: String,
        valid: Vec<String>,
        suggestions: Vec<String>,
    },

    #[error("unknown order '{name}'; valid orders: {}", list(.valid))]
    InvalidOrder { name: String, valid: Vec<String> },

    #[error("invalid pagination: {field}={value} {rule} {bound}")]
    InvalidPagination {
        field: PaginationField,
        value: i64,
        rule: BoundRule,
        bound: i64,
    },

    #[error("{0}")]
    InvalidSecurity(SecurityViolation),

    #[error("invalid argument for '{predicate}': expected {expected}")]
    InvalidArgument { predicate: String, expected: String },

    #[error("{0}")]
    Configuration(ConfigurationIssue),
}

impl QueryErrorKind {
    /// Category tag for this kind.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidPredicate { .. } => ErrorCategory::InvalidPredicate,
            Self::InvalidOrder { .. } => ErrorCategory::InvalidOrder,
            Self::InvalidPagination { .. } => ErrorCategory::InvalidPagination,
            Self::InvalidSecurity(_) => ErrorCategory::InvalidSecurity,
            Self::InvalidArgument { .. } => ErrorCategory::InvalidArgument,
            Self::Configuration(_) => ErrorCategory::Configuration,
        }
    }
}

/// Base error type for the query layer.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error("{kind}")]
pub struct QueryError {
    kind: QueryErrorKind,
    tags: ErrorTags,
    context: Map<String, Value>,
    extra: Map<String, Value>,
}

impl QueryError {
    fn new(
        module: &str,
        kind: QueryErrorKind,
        context: Map<String, Value>,
        extra: Map<String, Value>,
    ) -> Self {
        let mut context = context;
        context.insert("model".to_owned(), json!(module));
        Self {
            tags: ErrorTags {
                category: kind.category(),
                module: module.to_owned(),
            },
            kind,
            context,
            extra,
        }
    }

    /// Unknown predicate name. `valid` is the full list of names declared for
    /// the model; `suggestions` is the short list shown in the message.
    #[must_use]
    pub fn invalid_predicate(
        module: &str,
        name: impl Into<String>,
        valid: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        let name = name.into();
        Self::new(
            module,
            QueryErrorKind::InvalidPredicate {
                name: name.clone(),
                valid: valid.clone(),
                suggestions: suggestions.clone(),
            },
            object([("predicate", json!(name)), ("suggestions", json!(suggestions))]),
            object([("valid_predicates", json!(valid))]),
        )
    }

    /// Unknown order-scope name.
    #[must_use]
    pub fn invalid_order(module: &str, name: impl Into<String>, valid: Vec<String>) -> Self {
        let name = name.into();
        Self::new(
            module,
            QueryErrorKind::InvalidOrder {
                name: name.clone(),
                valid: valid.clone(),
            },
            object([("order", json!(name))]),
            object([("valid_orders", json!(valid))]),
        )
    }

    /// Page or page size outside the configured bounds.
    #[must_use]
    pub fn invalid_pagination(
        module: &str,
        field: PaginationField,
        value: i64,
        rule: BoundRule,
        bound: i64,
    ) -> Self {
        Self::new(
            module,
            QueryErrorKind::InvalidPagination {
                field,
                value,
                rule,
                bound,
            },
            object([("field", json!(field)), ("value", json!(value))]),
            object([("rule", json!(rule)), ("bound", json!(bound))]),
        )
    }

    /// The request named a security policy the model does not define.
    #[must_use]
    pub fn unknown_policy(module: &str, policy: impl Into<String>, known: Vec<String>) -> Self {
        let policy = policy.into();
        Self::new(
            module,
            QueryErrorKind::InvalidSecurity(SecurityViolation::UnknownPolicy {
                policy: policy.clone(),
                known: known.clone(),
            }),
            object([("policy", json!(policy))]),
            object([("known_policies", json!(known))]),
        )
    }

    /// The request did not supply every predicate a policy requires.
    #[must_use]
    pub fn missing_predicates(
        module: &str,
        policy: impl Into<String>,
        required: Vec<String>,
        supplied: Vec<String>,
        missing: Vec<String>,
    ) -> Self {
        let policy = policy.into();
        Self::new(
            module,
            QueryErrorKind::InvalidSecurity(SecurityViolation::MissingPredicates {
                policy: policy.clone(),
                required: required.clone(),
                supplied: supplied.clone(),
                missing: missing.clone(),
            }),
            object([("policy", json!(policy)), ("missing", json!(missing))]),
            object([("required", json!(required)), ("supplied", json!(supplied))]),
        )
    }

    /// Predicate argument has the wrong shape.
    #[must_use]
    pub fn invalid_argument(
        module: &str,
        predicate: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let predicate = predicate.into();
        let expected = expected.into();
        Self::new(
            module,
            QueryErrorKind::InvalidArgument {
                predicate: predicate.clone(),
                expected: expected.clone(),
            },
            object([("predicate", json!(predicate))]),
            object([("expected", json!(expected))]),
        )
    }

    /// Declarative setup was invalid or a frozen value was misused.
    #[must_use]
    pub fn configuration(module: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            module,
            QueryErrorKind::Configuration(ConfigurationIssue::Invalid {
                message: message.clone(),
            }),
            object([("message", json!(message))]),
            Map::new(),
        )
    }

    /// A configured complexity limit was exceeded.
    #[must_use]
    pub fn limit_exceeded(module: &str, limit: &str, max: usize, actual: usize) -> Self {
        Self::new(
            module,
            QueryErrorKind::Configuration(ConfigurationIssue::LimitExceeded {
                limit: limit.to_owned(),
                max,
                actual,
            }),
            object([("limit", json!(limit))]),
            object([("max", json!(max)), ("actual", json!(actual))]),
        )
    }

    #[must_use]
    pub fn kind(&self) -> &QueryErrorKind {
        &self.kind
    }

    #[must_use]
    pub fn tags(&self) -> &ErrorTags {
        &self.tags
    }

    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        self.tags.category
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.tags.module
    }

    /// High-level context map.
    #[must_use]
    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    /// Detailed extra-data map.
    #[must_use]
    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// `true` when the caller sent a bad query, `false` for setup problems.
    ///
    /// Exceeded complexity limits count as client errors: the model is fine,
    /// the request is too large.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self.kind,
            QueryErrorKind::Configuration(ConfigurationIssue::Invalid { .. })
        )
    }
}

fn object<const N: usize>(entries: [(&str, Value); N]) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect()
}

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_owned()
    } else {
        items.join(", ")
    }
}
