use std::fmt;

use sea_orm::ColumnType;
use serde::{Deserialize, Serialize};

use crate::operator::Operator;

/// Coarse classification of a column's storage type.
///
/// The family decides which operator table a field gets. Storage types the
/// classifier does not recognize fall back to [`TypeFamily::Opaque`], which
/// only offers equality and null checks, so new column types never break
/// predicate declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFamily {
    String,
    Numeric,
    Temporal,
    Boolean,
    Array,
    Document,
    Opaque,
}

impl TypeFamily {
    /// The fixed operator table for this family, in declaration order.
    #[must_use]
    pub fn operators(self) -> &'static [Operator] {
        use Operator as O;
        match self {
            Self::String => &[
                O::Eq,
                O::NotEq,
                O::Contains,
                O::StartsWith,
                O::EndsWith,
                O::Present,
                O::Blank,
                O::Null,
                O::NotNull,
                O::In,
                O::NotIn,
            ],
            Self::Numeric => &[
                O::Eq,
                O::NotEq,
                O::Gt,
                O::Gteq,
                O::Lt,
                O::Lteq,
                O::Between,
                O::NotBetween,
                O::In,
                O::NotIn,
                O::Present,
                O::Null,
            ],
            Self::Temporal => &[
                O::Eq,
                O::NotEq,
                O::Gt,
                O::Gteq,
                O::Lt,
                O::Lteq,
                O::Between,
                O::NotBetween,
                O::Within,
                O::Today,
                O::Yesterday,
                O::ThisWeek,
                O::ThisMonth,
                O::ThisYear,
                O::Year,
                O::Month,
                O::Day,
                O::Present,
                O::Null,
            ],
            Self::Boolean => &[O::Eq, O::IsTrue, O::IsFalse, O::Present, O::Null],
            Self::Array => &[
                O::ArrayContains,
                O::Overlaps,
                O::ContainsAll,
                O::Empty,
                O::Present,
            ],
            Self::Document => &[
                O::HasKey,
                O::HasAnyKey,
                O::HasAllKeys,
                O::DocumentContains,
            ],
            Self::Opaque => &[O::Eq, O::Null],
        }
    }

    /// Whether `op` belongs to this family's table.
    #[must_use]
    pub fn supports(self, op: Operator) -> bool {
        self.operators().contains(&op)
    }
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Numeric => "numeric",
            Self::Temporal => "temporal",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Document => "document",
            Self::Opaque => "opaque",
        };
        f.write_str(s)
    }
}

/// Map a column storage type to its predicate family.
#[must_use]
pub fn classify(storage: &ColumnType) -> TypeFamily {
    match storage {
        ColumnType::Char { .. } | ColumnType::String { .. } | ColumnType::Text => TypeFamily::String,
        ColumnType::TinyInteger
        | ColumnType::SmallInteger
        | ColumnType::Integer
        | ColumnType::BigInteger
        | ColumnType::TinyUnsigned
        | ColumnType::SmallUnsigned
        | ColumnType::Unsigned
        | ColumnType::BigUnsigned
        | ColumnType::Float
        | ColumnType::Double
        | ColumnType::Decimal { .. }
        | ColumnType::Money { .. }
        | ColumnType::Year { .. } => TypeFamily::Numeric,
        ColumnType::Date
        | ColumnType::DateTime
        | ColumnType::Timestamp
        | ColumnType::TimestampWithTimeZone => TypeFamily::Temporal,
        ColumnType::Boolean => TypeFamily::Boolean,
        ColumnType::Array { .. } => TypeFamily::Array,
        ColumnType::Json | ColumnType::JsonBinary => TypeFamily::Document,
        _ => TypeFamily::Opaque,
    }
}
