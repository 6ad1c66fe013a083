use std::fmt;

use serde::Serialize;

/// Operator semantics a predicate is bound to.
///
/// The suffix is what gets appended to the field name to form the predicate
/// name (`view_count` + `gteq` → `view_count_gteq`). Some operators share a
/// suffix across families (`contains` on arrays and documents), but never
/// within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    NotEq,
    /// Case-insensitive substring match.
    Contains,
    StartsWith,
    EndsWith,
    Present,
    Blank,
    Null,
    NotNull,
    In,
    NotIn,
    Gt,
    Gteq,
    Lt,
    Lteq,
    Between,
    NotBetween,
    /// Value lies within the given duration before now.
    Within,
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    ThisYear,
    Year,
    Month,
    Day,
    IsTrue,
    /// False or NULL.
    IsFalse,
    ArrayContains,
    Overlaps,
    ContainsAll,
    Empty,
    HasKey,
    HasAnyKey,
    HasAllKeys,
    /// Partial-match containment of a JSON fragment.
    DocumentContains,
}

impl Operator {
    /// Name suffix used when deriving predicate names.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::NotEq => "not_eq",
            Self::Contains => "cont",
            Self::StartsWith => "start",
            Self::EndsWith => "end",
            Self::Present => "present",
            Self::Blank => "blank",
            Self::Null => "null",
            Self::NotNull => "not_null",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Gt => "gt",
            Self::Gteq => "gteq",
            Self::Lt => "lt",
            Self::Lteq => "lteq",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::Within => "within",
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::ThisWeek => "this_week",
            Self::ThisMonth => "this_month",
            Self::ThisYear => "this_year",
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::IsTrue => "true",
            Self::IsFalse => "false",
            Self::ArrayContains | Self::DocumentContains => "contains",
            Self::Overlaps => "overlaps",
            Self::ContainsAll => "contains_all",
            Self::Empty => "empty",
            Self::HasKey => "has_key",
            Self::HasAnyKey => "has_any_key",
            Self::HasAllKeys => "has_all_keys",
        }
    }

    /// Presence-style operators take an optional boolean flag; `false`
    /// selects the dual operator returned here.
    #[must_use]
    pub(crate) fn flag_dual(self, family: crate::TypeFamily) -> Option<Self> {
        use crate::TypeFamily as F;
        match (self, family) {
            (Self::Present, F::String) => Some(Self::Blank),
            (Self::Blank, F::String) => Some(Self::Present),
            (Self::Present, F::Array) => Some(Self::Empty),
            (Self::Empty, F::Array) => Some(Self::Present),
            (Self::Present | Self::NotNull, _) => Some(Self::Null),
            (Self::Null, _) => Some(Self::NotNull),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}
