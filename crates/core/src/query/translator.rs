//! Query-to-SQL translation.
//!
//! Compiles a parsed query tree into one boolean SQL expression over
//! the `headings` table (alias `h`) plus a named-parameter list. Every
//! literal is bound through a generated `:pN` parameter; nothing from
//! the query text is ever interpolated into SQL.

use chrono::{Local, NaiveDate};
use rusqlite::types::ToSqlOutput;
use thiserror::Error;

use crate::index::types::normalize_priority;
use crate::org::{day_bounds_utc, parse_date_token};

use super::parser::{QueryNode, canonical};

const GROUP_KEYS: &[&str] = &["todo", "priority", "file", "level", "tag"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{0}' takes {1}")]
    Arity(String, &'static str),

    #[error("operator '{0}' takes plain values, not nested expressions")]
    NestedArgument(String),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is not a date")]
    InvalidDate(String),

    #[error("cannot group by '{0}'")]
    BadGroupKey(String),
}

/// A bound query value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            SqlParam::Text(s) => Ok(ToSqlOutput::from(s.as_str())),
            SqlParam::Int(i) => Ok(ToSqlOutput::from(*i)),
        }
    }
}

/// The compiled form of one query expression.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Boolean expression over `headings h`.
    pub where_clause: String,
    /// `(":pN", value)` bindings, in generation order.
    pub params: Vec<(String, SqlParam)>,
    /// Canonical grouping key when the root was a `group-by`.
    pub group_by: Option<String>,
}

/// Compiles query trees against a configured done-state set. Relative
/// dates resolve from `today`.
pub struct Translator<'a> {
    done_states: &'a [String],
    today: NaiveDate,
}

impl<'a> Translator<'a> {
    pub fn new(done_states: &'a [String]) -> Self {
        Self { done_states, today: Local::now().date_naive() }
    }

    /// Fixed reference date, for deterministic relative-date handling.
    pub fn with_today(done_states: &'a [String], today: NaiveDate) -> Self {
        Self { done_states, today }
    }

    pub fn translate(&self, node: &QueryNode) -> Result<CompiledQuery, TranslateError> {
        let mut params = Vec::new();

        let (group_by, effective) = match node {
            QueryNode::Op { name, args } if name == "group-by" => {
                if args.len() != 2 {
                    return Err(TranslateError::Arity(
                        name.clone(),
                        "a grouping key and one sub-query",
                    ));
                }
                let key = match &args[0] {
                    QueryNode::Leaf(k) => canonical(k),
                    QueryNode::Op { .. } => {
                        return Err(TranslateError::NestedArgument(name.clone()));
                    }
                };
                if !GROUP_KEYS.contains(&key.as_str()) {
                    return Err(TranslateError::BadGroupKey(key));
                }
                (Some(key), &args[1])
            }
            _ => (None, node),
        };

        let where_clause = self.compile(effective, &mut params)?;
        Ok(CompiledQuery { where_clause, params, group_by })
    }

    fn compile(
        &self,
        node: &QueryNode,
        params: &mut Vec<(String, SqlParam)>,
    ) -> Result<String, TranslateError> {
        match node {
            QueryNode::Leaf(text) => Ok(title_predicate("h", text, params)),
            QueryNode::Op { name, args } => match name.as_str() {
                "and" => self.fold(args, " AND ", "1=1", params),
                "or" => self.fold(args, " OR ", "0=1", params),
                "not" => {
                    if args.len() != 1 {
                        return Err(TranslateError::Arity(
                            name.clone(),
                            "exactly one argument",
                        ));
                    }
                    Ok(format!("NOT ({})", self.compile(&args[0], params)?))
                }
                "todo" => compare_or_in("h.todo_state", name, args, Value::Text, params),
                "priority" => {
                    compare_or_in("h.priority", name, args, Value::Priority, params)
                }
                "level" => compare_or_in("h.level", name, args, Value::Number, params),
                "done" => self.done_predicate(name, args, params),
                "file" => in_clause("h.file_uri", name, args, params),
                "tag" => tag_predicate(name, args, params),
                "deadline" => self.date_predicate("h.deadline", name, args, params),
                "scheduled" => self.date_predicate("h.scheduled", name, args, params),
                "closed" => self.date_predicate("h.closed", name, args, params),
                "property" => property_predicate(name, args, params),
                "heading" => {
                    if args.len() != 1 {
                        return Err(TranslateError::Arity(
                            name.clone(),
                            "exactly one text term",
                        ));
                    }
                    let text = leaf_value(name, &args[0])?;
                    Ok(title_predicate("h", text, params))
                }
                "parent" => {
                    if args.len() != 1 {
                        return Err(TranslateError::Arity(
                            name.clone(),
                            "exactly one text term",
                        ));
                    }
                    let text = leaf_value(name, &args[0])?;
                    let inner = title_predicate("p", text, params);
                    Ok(format!(
                        "h.parent_id IN (SELECT COALESCE(p.id, p.file_uri || ':' || p.start_line) \
                         FROM headings p WHERE {inner})"
                    ))
                }
                "group-by" => {
                    Err(TranslateError::Arity(name.clone(), "the outermost position"))
                }
                _ => Err(TranslateError::UnknownOperator(name.clone())),
            },
        }
    }

    fn fold(
        &self,
        args: &[QueryNode],
        joiner: &str,
        identity: &str,
        params: &mut Vec<(String, SqlParam)>,
    ) -> Result<String, TranslateError> {
        if args.is_empty() {
            return Ok(identity.to_string());
        }
        let parts: Vec<String> = args
            .iter()
            .map(|arg| self.compile(arg, params))
            .collect::<Result<_, _>>()?;
        Ok(format!("({})", parts.join(joiner)))
    }

    fn done_predicate(
        &self,
        op: &str,
        args: &[QueryNode],
        params: &mut Vec<(String, SqlParam)>,
    ) -> Result<String, TranslateError> {
        let states: Vec<String> = if args.is_empty() {
            self.done_states.to_vec()
        } else {
            args.iter()
                .map(|arg| leaf_value(op, arg).map(str::to_string))
                .collect::<Result<_, _>>()?
        };
        if states.is_empty() {
            return Ok("0=1".to_string());
        }
        let names: Vec<String> =
            states.into_iter().map(|s| bind(params, SqlParam::Text(s))).collect();
        Ok(format!("h.todo_state IN ({})", names.join(", ")))
    }

    fn date_predicate(
        &self,
        column: &str,
        op: &str,
        args: &[QueryNode],
        params: &mut Vec<(String, SqlParam)>,
    ) -> Result<String, TranslateError> {
        if args.is_empty() {
            return Ok(format!("{column} IS NOT NULL"));
        }

        if args.len() == 1 {
            let token = leaf_value(op, &args[0])?;
            if token.starts_with(':') {
                return Err(TranslateError::Arity(
                    op.to_string(),
                    "a date after the modifier",
                ));
            }
            let (start, end) = self.day_window(token)?;
            let a = bind(params, SqlParam::Int(start));
            let b = bind(params, SqlParam::Int(end));
            return Ok(format!("({column} >= {a} AND {column} < {b})"));
        }

        let mut clauses = Vec::new();
        let mut i = 0;
        while i < args.len() {
            let modifier = leaf_value(op, &args[i])?;
            let Some(value) = args.get(i + 1) else {
                return Err(TranslateError::Arity(
                    op.to_string(),
                    "a date after each modifier",
                ));
            };
            let (start, end) = self.day_window(leaf_value(op, value)?)?;
            match modifier {
                ":on" => {
                    let a = bind(params, SqlParam::Int(start));
                    let b = bind(params, SqlParam::Int(end));
                    clauses.push(format!("{column} >= {a}"));
                    clauses.push(format!("{column} < {b}"));
                }
                ":from" => {
                    let a = bind(params, SqlParam::Int(start));
                    clauses.push(format!("{column} >= {a}"));
                }
                ":to" => {
                    let b = bind(params, SqlParam::Int(end));
                    clauses.push(format!("{column} < {b}"));
                }
                _ => {
                    return Err(TranslateError::Arity(
                        op.to_string(),
                        "`:on`, `:from` or `:to` modifiers",
                    ));
                }
            }
            i += 2;
        }
        Ok(format!("({})", clauses.join(" AND ")))
    }

    /// Half-open day window for a date token, as epoch seconds.
    fn day_window(&self, token: &str) -> Result<(i64, i64), TranslateError> {
        let date = parse_date_token(token, self.today)
            .ok_or_else(|| TranslateError::InvalidDate(token.to_string()))?;
        let (start, end) = day_bounds_utc(date);
        Ok((start.timestamp(), end.timestamp()))
    }
}

enum Value {
    Text,
    Priority,
    Number,
}

fn encode(kind: &Value, raw: &str) -> Result<SqlParam, TranslateError> {
    match kind {
        Value::Text => Ok(SqlParam::Text(raw.to_string())),
        Value::Priority => Ok(SqlParam::Text(normalize_priority(raw))),
        Value::Number => raw
            .parse::<i64>()
            .map(SqlParam::Int)
            .map_err(|_| TranslateError::InvalidNumber(raw.to_string())),
    }
}

fn is_comparison(token: &str) -> bool {
    matches!(token, ">" | "<" | ">=" | "<=" | "=" | "!=")
}

fn leaf_value<'n>(op: &str, node: &'n QueryNode) -> Result<&'n str, TranslateError> {
    match node {
        QueryNode::Leaf(value) => Ok(value),
        QueryNode::Op { .. } => Err(TranslateError::NestedArgument(op.to_string())),
    }
}

fn bind(params: &mut Vec<(String, SqlParam)>, value: SqlParam) -> String {
    let name = format!(":p{}", params.len());
    params.push((name.clone(), value));
    name
}

/// `IN` over bare values, or a binary comparison when the first
/// argument is an operator token.
fn compare_or_in(
    column: &str,
    op: &str,
    args: &[QueryNode],
    kind: Value,
    params: &mut Vec<(String, SqlParam)>,
) -> Result<String, TranslateError> {
    if args.is_empty() {
        return Err(TranslateError::Arity(op.to_string(), "at least one value"));
    }

    let first = leaf_value(op, &args[0])?;
    if is_comparison(first) {
        if args.len() != 2 {
            return Err(TranslateError::Arity(
                op.to_string(),
                "one value after a comparison operator",
            ));
        }
        let name = bind(params, encode(&kind, leaf_value(op, &args[1])?)?);
        return Ok(format!("{column} {first} {name}"));
    }

    let mut names = Vec::with_capacity(args.len());
    for arg in args {
        names.push(bind(params, encode(&kind, leaf_value(op, arg)?)?));
    }
    Ok(format!("{column} IN ({})", names.join(", ")))
}

fn in_clause(
    column: &str,
    op: &str,
    args: &[QueryNode],
    params: &mut Vec<(String, SqlParam)>,
) -> Result<String, TranslateError> {
    if args.is_empty() {
        return Err(TranslateError::Arity(op.to_string(), "at least one value"));
    }
    let mut names = Vec::with_capacity(args.len());
    for arg in args {
        let value = leaf_value(op, arg)?;
        names.push(bind(params, SqlParam::Text(value.to_string())));
    }
    Ok(format!("{column} IN ({})", names.join(", ")))
}

/// Any-of membership within one node; all-of composes through `and`.
fn tag_predicate(
    op: &str,
    args: &[QueryNode],
    params: &mut Vec<(String, SqlParam)>,
) -> Result<String, TranslateError> {
    if args.is_empty() {
        return Err(TranslateError::Arity(op.to_string(), "at least one tag"));
    }
    let mut names = Vec::with_capacity(args.len());
    for arg in args {
        let value = leaf_value(op, arg)?;
        names.push(bind(params, SqlParam::Text(value.to_string())));
    }
    Ok(format!(
        "EXISTS (SELECT 1 FROM heading_tags t \
         WHERE t.file_uri = h.file_uri AND t.heading_line = h.start_line \
         AND t.tag IN ({}))",
        names.join(", ")
    ))
}

fn property_predicate(
    op: &str,
    args: &[QueryNode],
    params: &mut Vec<(String, SqlParam)>,
) -> Result<String, TranslateError> {
    if args.is_empty() || args.len() > 3 {
        return Err(TranslateError::Arity(
            op.to_string(),
            "a key with an optional operator and value",
        ));
    }

    let key = leaf_value(op, &args[0])?;
    let path = bind(params, SqlParam::Text(format!("$.\"{}\"", key.to_uppercase())));

    match args.len() {
        1 => Ok(format!("json_extract(h.properties, {path}) IS NOT NULL")),
        2 => {
            let value =
                bind(params, SqlParam::Text(leaf_value(op, &args[1])?.to_string()));
            Ok(format!("json_extract(h.properties, {path}) = {value}"))
        }
        _ => {
            let cmp = leaf_value(op, &args[1])?;
            if !is_comparison(cmp) {
                return Err(TranslateError::Arity(
                    op.to_string(),
                    "a comparison operator before the value",
                ));
            }
            let value =
                bind(params, SqlParam::Text(leaf_value(op, &args[2])?.to_string()));
            Ok(format!("json_extract(h.properties, {path}) {cmp} {value}"))
        }
    }
}

/// Case-insensitive substring over the title and its phonetic index.
fn title_predicate(
    alias: &str,
    text: &str,
    params: &mut Vec<(String, SqlParam)>,
) -> String {
    let needle = format!("%{}%", text.to_lowercase());
    let a = bind(params, SqlParam::Text(needle.clone()));
    let b = bind(params, SqlParam::Text(needle));
    format!(
        "(LOWER({alias}.title) LIKE {a} \
         OR LOWER(COALESCE({alias}.title_phonetic, '')) LIKE {b})"
    )
}
