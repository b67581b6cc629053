//! System query options.
//!
//! A topic may carry a query string after `?`. [`SystemQueryParser`] splits
//! it into the standard options and reads the simple ones. The `$filter`
//! body is kept as an opaque [`FilterExpression`]; evaluating it is left to
//! a collaborator.

use crate::error::QueryError;

/// Name of the projection option.
pub const SELECT: &str = "$select";
/// Name of the filter option.
pub const FILTER: &str = "$filter";
/// Name of the expansion option.
pub const EXPAND: &str = "$expand";
/// Name of the ordering option.
pub const ORDER_BY: &str = "$orderby";
/// Name of the page size option.
pub const TOP: &str = "$top";
/// Name of the page offset option.
pub const SKIP: &str = "$skip";
/// Name of the count option.
pub const COUNT: &str = "$count";

/// An unparsed `$filter` body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterExpression(String);

impl FilterExpression {
    /// Wrap a filter body.
    pub fn new(expression: impl Into<String>) -> Self {
        Self(expression.into())
    }

    /// The filter body as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One `$orderby` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Property (or expression) to sort on.
    pub expression: String,
    /// Whether the order is descending.
    pub descending: bool,
}

/// Parsed system query options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    /// `$select` property names, in the order given.
    pub select: Vec<String>,
    /// `$filter` body.
    pub filter: Option<FilterExpression>,
    /// `$expand` items, split at top-level commas.
    pub expand: Vec<String>,
    /// `$orderby` terms.
    pub order_by: Vec<OrderBy>,
    /// `$top`.
    pub top: Option<u64>,
    /// `$skip`.
    pub skip: Option<u64>,
    /// `$count`.
    pub count: Option<bool>,
}

impl Query {
    /// Names of the options present other than `$select`.
    pub fn options_besides_select(&self) -> Vec<&'static str> {
        let mut present = Vec::new();
        if self.filter.is_some() {
            present.push(FILTER);
        }
        if !self.expand.is_empty() {
            present.push(EXPAND);
        }
        if !self.order_by.is_empty() {
            present.push(ORDER_BY);
        }
        if self.top.is_some() {
            present.push(TOP);
        }
        if self.skip.is_some() {
            present.push(SKIP);
        }
        if self.count.is_some() {
            present.push(COUNT);
        }
        present
    }

    /// Whether no option at all is set.
    pub fn is_empty(&self) -> bool {
        self.select.is_empty() && self.options_besides_select().is_empty()
    }
}

/// Turns a decoded query string into a [`Query`].
pub trait QueryParser: Send + Sync {
    /// Parse `query` (without the leading `?`).
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] for unknown, repeated, or malformed options.
    fn parse(&self, query: &str) -> Result<Query, QueryError>;
}

/// Parser for the standard system query options.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemQueryParser;

impl QueryParser for SystemQueryParser {
    fn parse(&self, query: &str) -> Result<Query, QueryError> {
        let mut parsed = Query::default();
        let mut seen: Vec<&str> = Vec::new();

        for part in split_options(query) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let Some((name, value)) = part.split_once('=') else {
                return Err(invalid(part, ""));
            };
            let name = name.trim();
            let value = value.trim();
            if seen.contains(&name) {
                return Err(QueryError::DuplicateOption {
                    name: name.to_owned(),
                });
            }
            seen.push(name);

            match name {
                SELECT => parsed.select = parse_select(value)?,
                FILTER => {
                    if value.is_empty() {
                        return Err(invalid(name, value));
                    }
                    parsed.filter = Some(FilterExpression::new(value));
                }
                EXPAND => parsed.expand = parse_expand(value)?,
                ORDER_BY => parsed.order_by = parse_order_by(value)?,
                TOP => parsed.top = Some(parse_u64(name, value)?),
                SKIP => parsed.skip = Some(parse_u64(name, value)?),
                COUNT => {
                    parsed.count = Some(match value {
                        "true" => true,
                        "false" => false,
                        _ => return Err(invalid(name, value)),
                    });
                }
                _ => {
                    return Err(QueryError::UnknownOption {
                        name: name.to_owned(),
                    });
                }
            }
        }
        Ok(parsed)
    }
}

/// Split at `&` that introduce a new `$` option, ignoring any inside
/// single-quoted literals.
fn split_options(query: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quote = false;
    let mut start = 0;
    let mut chars = query.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\'' => in_quote = !in_quote,
            '&' if !in_quote && chars.peek().is_some_and(|&(_, next)| next == '$') => {
                if let Some(part) = query.get(start..i) {
                    parts.push(part);
                }
                start = i.saturating_add(1);
            }
            _ => {}
        }
    }
    if let Some(part) = query.get(start..) {
        parts.push(part);
    }
    parts
}

fn parse_select(value: &str) -> Result<Vec<String>, QueryError> {
    let names: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    if names.is_empty() {
        return Err(invalid(SELECT, value));
    }
    Ok(names)
}

fn parse_expand(value: &str) -> Result<Vec<String>, QueryError> {
    let mut items = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth = depth.saturating_add(1),
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| invalid(EXPAND, value))?;
            }
            ',' if depth == 0 => {
                items.push(value.get(start..i).unwrap_or_default().trim().to_owned());
                start = i.saturating_add(1);
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(invalid(EXPAND, value));
    }
    items.push(value.get(start..).unwrap_or_default().trim().to_owned());
    if items.iter().any(String::is_empty) {
        return Err(invalid(EXPAND, value));
    }
    Ok(items)
}

fn parse_order_by(value: &str) -> Result<Vec<OrderBy>, QueryError> {
    value
        .split(',')
        .map(|term| {
            let mut words = term.split_whitespace();
            let expression = words.next().ok_or_else(|| invalid(ORDER_BY, value))?;
            let descending = match words.next() {
                None | Some("asc") => false,
                Some("desc") => true,
                Some(_) => return Err(invalid(ORDER_BY, value)),
            };
            if words.next().is_some() {
                return Err(invalid(ORDER_BY, value));
            }
            Ok(OrderBy {
                expression: expression.to_owned(),
                descending,
            })
        })
        .collect()
}

fn parse_u64(name: &str, value: &str) -> Result<u64, QueryError> {
    value.parse().map_err(|_parse| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> QueryError {
    QueryError::InvalidValue {
        name: name.to_owned(),
        value: value.to_owned(),
    }
}
