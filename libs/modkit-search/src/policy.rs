//! Security policies: named sets of predicates a request must filter by.
//!
//! Enforcement is fail-closed. A request naming a policy passes only when
//! every required predicate appears somewhere in it, top level or inside
//! any OR branch.

use std::collections::{BTreeMap, BTreeSet};

use modkit_query_errors::QueryError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityPolicy {
    name: String,
    required: BTreeSet<String>,
}

impl SecurityPolicy {
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            required: required.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn required(&self) -> &BTreeSet<String> {
        &self.required
    }
}

/// Registered policies of a model, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityPolicies {
    policies: BTreeMap<String, SecurityPolicy>,
}

impl SecurityPolicies {
    /// Register the given policies.
    ///
    /// # Errors
    /// Returns a configuration error for a duplicate name or a policy with no
    /// required predicates.
    pub fn new(
        module: &str,
        policies: impl IntoIterator<Item = SecurityPolicy>,
    ) -> Result<Self, QueryError> {
        let mut map = BTreeMap::new();
        for policy in policies {
            if policy.required.is_empty() {
                return Err(QueryError::configuration(
                    module,
                    format!("security policy '{}' requires no predicates", policy.name),
                ));
            }
            if map.contains_key(&policy.name) {
                return Err(QueryError::configuration(
                    module,
                    format!("security policy '{}' is declared more than once", policy.name),
                ));
            }
            map.insert(policy.name.clone(), policy);
        }
        Ok(Self { policies: map })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecurityPolicy> {
        self.policies.values()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SecurityPolicy> {
        self.policies.get(name)
    }

    /// Check that `supplied` covers every predicate required by `policy`.
    ///
    /// # Errors
    /// Returns an invalid-security error when the policy is unknown or when
    /// required predicates are missing.
    pub fn enforce(
        &self,
        model: &str,
        policy: &str,
        supplied: &BTreeSet<String>,
    ) -> Result<(), QueryError> {
        let Some(found) = self.policies.get(policy) else {
            tracing::warn!(model, policy, "search rejected: unknown security policy");
            return Err(QueryError::unknown_policy(
                model,
                policy,
                self.names().map(str::to_owned).collect(),
            ));
        };

        let missing: Vec<String> = found.required.difference(supplied).cloned().collect();
        if missing.is_empty() {
            return Ok(());
        }

        tracing::warn!(
            model,
            policy,
            missing = ?missing,
            "search rejected: security policy not satisfied"
        );
        Err(QueryError::missing_predicates(
            model,
            policy,
            found.required.iter().cloned().collect(),
            supplied.iter().cloned().collect(),
            missing,
        ))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use modkit_query_errors::{ErrorCategory, QueryErrorKind, SecurityViolation};
    use tracing_test::traced_test;

    fn policies() -> SecurityPolicies {
        SecurityPolicies::new(
            "post",
            [SecurityPolicy::new("status_required", ["status_eq"])],
        )
        .unwrap()
    }

    fn names(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn satisfied_policy_passes() {
        assert!(
            policies()
                .enforce("post", "status_required", &names(&["status_eq", "title_cont"]))
                .is_ok()
        );
    }

    #[test]
    #[traced_test]
    fn missing_predicate_is_reported_with_sets() {
        let err = policies()
            .enforce("post", "status_required", &names(&["title_cont"]))
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidSecurity);
        assert_eq!(
            err.kind(),
            &QueryErrorKind::InvalidSecurity(SecurityViolation::MissingPredicates {
                policy: "status_required".to_owned(),
                required: vec!["status_eq".to_owned()],
                supplied: vec!["title_cont".to_owned()],
                missing: vec!["status_eq".to_owned()],
            })
        );
        assert!(logs_contain("security policy not satisfied"));
    }

    #[test]
    fn unknown_policy_lists_known_ones() {
        let err = policies()
            .enforce("post", "nope", &BTreeSet::new())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown security policy 'nope'; registered policies: status_required"
        );
    }

    #[test]
    fn empty_and_duplicate_policies_are_rejected() {
        let empty = SecurityPolicies::new("post", [SecurityPolicy::new("open", Vec::<String>::new())]);
        assert_eq!(empty.unwrap_err().category(), ErrorCategory::Configuration);

        let dup = SecurityPolicies::new(
            "post",
            [
                SecurityPolicy::new("p", ["a_eq"]),
                SecurityPolicy::new("p", ["b_eq"]),
            ],
        );
        assert_eq!(dup.unwrap_err().category(), ErrorCategory::Configuration);
    }
}
