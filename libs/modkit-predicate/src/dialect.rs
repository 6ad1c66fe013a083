use sea_orm::DbBackend;
use sea_orm::sea_query::{Expr, SimpleExpr};

/// SQL dialect used for operators that have no portable spelling
/// (array and JSON operators, date-part extraction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    #[default]
    Postgres,
    MySql,
    Sqlite,
}

impl From<DbBackend> for Dialect {
    fn from(backend: DbBackend) -> Self {
        if backend == DbBackend::Postgres {
            Self::Postgres
        } else if backend == DbBackend::MySql {
            Self::MySql
        } else {
            Self::Sqlite
        }
    }
}

impl Dialect {
    /// Build a custom expression from a template written with numbered
    /// `$1, $2, ...` placeholders.
    ///
    /// Postgres keeps the numbered form. MySQL and SQLite bind positionally,
    /// so every placeholder must appear exactly once and in ascending order.
    pub(crate) fn custom<I>(self, template: &str, exprs: I) -> SimpleExpr
    where
        I: IntoIterator<Item = SimpleExpr>,
    {
        let sql = match self {
            Self::Postgres => template.to_owned(),
            Self::MySql | Self::Sqlite => positional(template),
        };
        Expr::cust_with_exprs(sql, exprs)
    }
}

fn positional(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' && chars.peek().is_some_and(char::is_ascii_digit) {
            while chars.peek().is_some_and(char::is_ascii_digit) {
                chars.next();
            }
            out.push('?');
        } else {
            out.push(c);
        }
    }
    out
}
