//! Condition builders: one predicate application → one `Condition`.
//!
//! Every user-supplied value is bound through `Expr::value`. Custom SQL
//! templates only ever contain fixed text written here plus placeholders.

use chrono::TimeDelta;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition, Value};
use serde_json::Value as Json;

use crate::dialect::Dialect;
use crate::family::TypeFamily;
use crate::field::FieldDeclaration;
use crate::operator::Operator;
use crate::temporal::{CalendarWindow, Clock, Window, calendar_window, year_window};
use crate::value::{self, ArgResult, Expected};

/// Inputs shared by every predicate application of one set.
pub struct BuildContext<'a> {
    pub dialect: Dialect,
    pub clock: &'a Clock,
}

/// `WHERE false`.
#[must_use]
pub fn deny_all() -> Condition {
    Condition::all().add(Expr::value(false))
}

fn column<C: ColumnTrait>(c: C) -> Expr {
    Expr::col((c.entity_name(), c))
}

fn operand<C: ColumnTrait>(c: C) -> SimpleExpr {
    column(c).into()
}

fn all(e: SimpleExpr) -> Condition {
    Condition::all().add(e)
}

/// OR over `items`; nothing to match against matches nothing.
fn any_of<T>(items: Vec<T>, f: impl Fn(T) -> SimpleExpr) -> Condition {
    if items.is_empty() {
        return deny_all();
    }
    items.into_iter().fold(Condition::any(), |acc, item| acc.add(f(item)))
}

/// AND over `items`; vacuously true when empty.
fn all_of<T>(items: Vec<T>, f: impl Fn(T) -> SimpleExpr) -> Condition {
    items.into_iter().fold(Condition::all(), |acc, item| acc.add(f(item)))
}

/// Build the condition for `op` applied to `field` with argument `arg`.
pub fn build<C: ColumnTrait>(
    field: &FieldDeclaration<C>,
    op: Operator,
    arg: &Json,
    ctx: &BuildContext<'_>,
) -> ArgResult<Condition> {
    let c = field.column();
    let family = field.family();
    let storage = field.storage();

    if let Some(dual) = op.flag_dual(family) {
        let effective = if value::flag(arg)? { op } else { dual };
        return Ok(presence(field, effective, ctx.dialect));
    }

    let one = |arg: &Json| value::scalar(arg, family, storage);
    let cond = match op {
        Operator::Eq if arg.is_null() => all(column(c).is_null()),
        Operator::NotEq if arg.is_null() => all(column(c).is_not_null()),
        Operator::Eq => all(column(c).eq(one(arg)?)),
        Operator::NotEq => all(column(c).ne(one(arg)?)),
        Operator::Gt => all(column(c).gt(one(arg)?)),
        Operator::Gteq => all(column(c).gte(one(arg)?)),
        Operator::Lt => all(column(c).lt(one(arg)?)),
        Operator::Lteq => all(column(c).lte(one(arg)?)),
        Operator::Between => {
            let (low, high) = value::pair(arg, family, storage)?;
            all(column(c).between(low, high))
        }
        Operator::NotBetween => {
            let (low, high) = value::pair(arg, family, storage)?;
            all(column(c).not_between(low, high))
        }
        Operator::In => {
            let values = value::list(arg, family, storage)?;
            if values.is_empty() {
                deny_all()
            } else {
                all(column(c).is_in(values))
            }
        }
        Operator::NotIn => {
            let values = value::list(arg, family, storage)?;
            if values.is_empty() {
                all(column(c).is_not_null())
            } else {
                all(column(c).is_not_in(values))
            }
        }
        Operator::Contains | Operator::StartsWith | Operator::EndsWith => {
            like(ctx.dialect, c, op, value::text(arg)?)
        }
        Operator::IsTrue => all(column(c).eq(true)),
        Operator::IsFalse => Condition::any()
            .add(column(c).eq(false))
            .add(column(c).is_null()),
        Operator::Within => within(field, arg, ctx.clock)?,
        Operator::Today => window(field, CalendarWindow::Today, ctx.clock)?,
        Operator::Yesterday => window(field, CalendarWindow::Yesterday, ctx.clock)?,
        Operator::ThisWeek => window(field, CalendarWindow::ThisWeek, ctx.clock)?,
        Operator::ThisMonth => window(field, CalendarWindow::ThisMonth, ctx.clock)?,
        Operator::ThisYear => window(field, CalendarWindow::ThisYear, ctx.clock)?,
        Operator::Year => year(field, arg)?,
        Operator::Month => date_part(c, DatePart::Month, arg, ctx.dialect)?,
        Operator::Day => date_part(c, DatePart::Day, arg, ctx.dialect)?,
        Operator::ArrayContains => all(array_has(ctx.dialect, c, one_element(arg, storage)?)),
        Operator::Overlaps => any_of(value::list(arg, TypeFamily::Array, storage)?, |v| {
            array_has(ctx.dialect, c, v)
        }),
        Operator::ContainsAll => all_of(value::list(arg, TypeFamily::Array, storage)?, |v| {
            array_has(ctx.dialect, c, v)
        }),
        Operator::HasKey => all(has_key(ctx.dialect, c, value::text(arg)?)),
        Operator::HasAnyKey => any_of(value::text_list(arg)?, |k| has_key(ctx.dialect, c, k)),
        Operator::HasAllKeys => all_of(value::text_list(arg)?, |k| has_key(ctx.dialect, c, k)),
        Operator::DocumentContains => document_contains(ctx.dialect, c, arg)?,
        Operator::Present | Operator::Blank | Operator::Null | Operator::NotNull | Operator::Empty => {
            presence(field, op, ctx.dialect)
        }
    };
    Ok(cond)
}

/// Null / presence checks. String presence ignores whitespace-only values,
/// array presence requires at least one element.
fn presence<C: ColumnTrait>(field: &FieldDeclaration<C>, op: Operator, dialect: Dialect) -> Condition {
    let c = field.column();
    let trimmed = || Expr::expr(dialect.custom("TRIM($1)", [operand(c)]));
    let length = || Expr::expr(array_length(dialect, c));
    match (op, field.family()) {
        (Operator::Null, _) => all(column(c).is_null()),
        (Operator::Present, TypeFamily::String) => Condition::all()
            .add(column(c).is_not_null())
            .add(trimmed().ne("")),
        (Operator::Blank, _) => Condition::any()
            .add(column(c).is_null())
            .add(trimmed().eq("")),
        (Operator::Present, TypeFamily::Array) => all(length().gt(0)),
        (Operator::Empty, _) => Condition::any()
            .add(column(c).is_null())
            .add(length().eq(0)),
        _ => all(column(c).is_not_null()),
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Case-insensitive LIKE. Both sides are folded by the same SQL `LOWER`, so
/// a needle typed in the stored case always matches.
fn like<C: ColumnTrait>(dialect: Dialect, c: C, op: Operator, needle: &str) -> Condition {
    let escaped = escape_like(needle);
    let pattern = match op {
        Operator::StartsWith => format!("{escaped}%"),
        Operator::EndsWith => format!("%{escaped}"),
        _ => format!("%{escaped}%"),
    };
    // Backslash is MySQL's default LIKE escape, and '\' is an unterminated
    // literal there.
    let template = match dialect {
        Dialect::MySql => "LOWER($1) LIKE LOWER($2)",
        Dialect::Postgres | Dialect::Sqlite => "LOWER($1) LIKE LOWER($2) ESCAPE '\\'",
    };
    all(dialect.custom(template, [operand(c), Expr::value(pattern)]))
}

fn in_window<C: ColumnTrait>(field: &FieldDeclaration<C>, (start, end): Window) -> Condition {
    let storage = field.storage();
    Condition::all()
        .add(column(field.column()).gte(value::instant(start, storage)))
        .add(column(field.column()).lt(value::instant(end, storage)))
}

fn window<C: ColumnTrait>(
    field: &FieldDeclaration<C>,
    which: CalendarWindow,
    clock: &Clock,
) -> ArgResult<Condition> {
    let range =
        calendar_window(which, clock.now()).ok_or(Expected("a date inside the calendar range"))?;
    Ok(in_window(field, range))
}

fn within<C: ColumnTrait>(field: &FieldDeclaration<C>, arg: &Json, clock: &Clock) -> ArgResult<Condition> {
    const TOO_LONG: Expected = Expected("a duration inside the calendar range");
    let span = TimeDelta::from_std(value::duration(arg)?).map_err(|_| TOO_LONG)?;
    let now = clock.now();
    let start = now.checked_sub_signed(span).ok_or(TOO_LONG)?;
    let storage = field.storage();
    Ok(all(column(field.column()).between(
        value::instant(start, storage),
        value::instant(now, storage),
    )))
}

fn year<C: ColumnTrait>(field: &FieldDeclaration<C>, arg: &Json) -> ArgResult<Condition> {
    const YEAR: Expected = Expected("a calendar year");
    let y = i32::try_from(value::integer(arg)?).map_err(|_| YEAR)?;
    Ok(in_window(field, year_window(y).ok_or(YEAR)?))
}

#[derive(Clone, Copy)]
enum DatePart {
    Month,
    Day,
}

fn date_part<C: ColumnTrait>(c: C, part: DatePart, arg: &Json, dialect: Dialect) -> ArgResult<Condition> {
    let (range, expected) = match part {
        DatePart::Month => (1..=12, Expected("a month number between 1 and 12")),
        DatePart::Day => (1..=31, Expected("a day of month between 1 and 31")),
    };
    let n = value::integer(arg).map_err(|_| expected)?;
    if !range.contains(&n) {
        return Err(expected);
    }
    let template = match (dialect, part) {
        (Dialect::Postgres, DatePart::Month) => "CAST(EXTRACT(MONTH FROM $1) AS INTEGER)",
        (Dialect::Postgres, DatePart::Day) => "CAST(EXTRACT(DAY FROM $1) AS INTEGER)",
        (Dialect::MySql, DatePart::Month) => "MONTH($1)",
        (Dialect::MySql, DatePart::Day) => "DAYOFMONTH($1)",
        (Dialect::Sqlite, DatePart::Month) => "CAST(strftime('%m', $1) AS INTEGER)",
        (Dialect::Sqlite, DatePart::Day) => "CAST(strftime('%d', $1) AS INTEGER)",
    };
    Ok(all(Expr::expr(dialect.custom(template, [operand(c)])).eq(n)))
}

fn one_element(arg: &Json, storage: &sea_orm::ColumnType) -> ArgResult<Value> {
    value::scalar(arg, TypeFamily::Array, storage)
}

/// `value` is an element of the array column. Arrays are native on Postgres
/// and stored as JSON arrays elsewhere.
fn array_has<C: ColumnTrait>(dialect: Dialect, c: C, v: Value) -> SimpleExpr {
    match dialect {
        Dialect::Postgres => dialect.custom("$1 = ANY($2)", [Expr::value(v), operand(c)]),
        Dialect::MySql => {
            dialect.custom("JSON_CONTAINS($1, JSON_ARRAY($2))", [operand(c), Expr::value(v)])
        }
        Dialect::Sqlite => dialect.custom(
            "EXISTS (SELECT 1 FROM json_each($1) WHERE json_each.value = $2)",
            [operand(c), Expr::value(v)],
        ),
    }
}

fn array_length<C: ColumnTrait>(dialect: Dialect, c: C) -> SimpleExpr {
    let template = match dialect {
        Dialect::Postgres => "cardinality($1)",
        Dialect::MySql => "JSON_LENGTH($1)",
        Dialect::Sqlite => "json_array_length($1)",
    };
    dialect.custom(template, [operand(c)])
}

fn json_member(key: &str) -> String {
    format!(".\"{}\"", key.replace('"', "\\\""))
}

fn json_path(key: &str) -> String {
    format!("${}", json_member(key))
}

fn has_key<C: ColumnTrait>(dialect: Dialect, c: C, key: &str) -> SimpleExpr {
    match dialect {
        Dialect::Postgres => dialect.custom(
            "CAST($1 AS jsonb) ? $2",
            [operand(c), Expr::value(key.to_owned())],
        ),
        Dialect::MySql => dialect.custom(
            "JSON_CONTAINS_PATH($1, 'one', $2)",
            [operand(c), Expr::value(json_path(key))],
        ),
        Dialect::Sqlite => dialect.custom(
            "json_type($1, $2) IS NOT NULL",
            [operand(c), Expr::value(json_path(key))],
        ),
    }
}

/// The document contains `fragment`: object keys match recursively, array
/// fragments need each element somewhere in the stored array, and any other
/// value must be equal.
fn document_contains<C: ColumnTrait>(dialect: Dialect, c: C, fragment: &Json) -> ArgResult<Condition> {
    if fragment.is_null() {
        return Err(Expected("a JSON fragment"));
    }
    let cond = match dialect {
        Dialect::Postgres => dialect.custom(
            "CAST($1 AS jsonb) @> CAST($2 AS jsonb)",
            [operand(c), Expr::value(fragment.to_string())],
        ),
        Dialect::MySql => dialect.custom(
            "JSON_CONTAINS($1, $2)",
            [operand(c), Expr::value(fragment.to_string())],
        ),
        Dialect::Sqlite => sqlite_contains(&operand(c), Expr::value("$".to_owned()), fragment, 0),
    };
    Ok(all(cond))
}

/// `SQLite` has no containment operator, so the fragment is walked down to its
/// leaves. `path` is a JSON path expression into `doc`; array elements are
/// matched through `json_each`, whose `fullkey` column is again a path into
/// `doc`.
fn sqlite_contains(doc: &SimpleExpr, path: SimpleExpr, fragment: &Json, depth: usize) -> SimpleExpr {
    let sqlite = Dialect::Sqlite;
    match fragment {
        Json::Object(entries) => entries.iter().fold(
            sqlite.custom("json_type($1, $2) = 'object'", [doc.clone(), path.clone()]),
            |acc, (key, v)| {
                let child = sqlite.custom("$1 || $2", [path.clone(), Expr::value(json_member(key))]);
                acc.and(sqlite_contains(doc, child, v, depth))
            },
        ),
        Json::Array(items) => {
            let alias = format!("e{depth}");
            let exists = format!("EXISTS (SELECT 1 FROM json_each($1, $2) AS {alias} WHERE $3)");
            items.iter().fold(
                sqlite.custom("json_type($1, $2) = 'array'", [doc.clone(), path.clone()]),
                |acc, item| {
                    let element = Expr::cust(format!("{alias}.fullkey"));
                    let inner = sqlite_contains(doc, element, item, depth + 1);
                    acc.and(sqlite.custom(&exists, [doc.clone(), path.clone(), inner]))
                },
            )
        }
        Json::Null => sqlite.custom("json_type($1, $2) = 'null'", [doc.clone(), path]),
        _ => sqlite.custom(
            "json_extract($1, $2) = json_extract($3, '$')",
            [doc.clone(), path, Expr::value(fragment.to_string())],
        ),
    }
}
