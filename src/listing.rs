//! Query-string driven ordering, search and pagination for list endpoints.
//!
//! Column names never come from the request: callers pass a whitelist that
//! maps public field names to SQL expressions.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::error::{ApiResult, FieldErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: &'static str,
    pub descending: bool,
}

/// Parse `?ordering=title,-created`. Unknown or duplicate fields are skipped;
/// if nothing usable remains the default ordering is returned.
pub fn parse_ordering(
    raw: Option<&str>,
    allowed: &[(&str, &'static str)],
    default: &[OrderTerm],
) -> Vec<OrderTerm> {
    let mut terms: Vec<OrderTerm> = Vec::new();
    for part in raw.unwrap_or_default().split(',') {
        let part = part.trim();
        let (name, descending) = match part.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (part, false),
        };
        let Some(&(_, column)) = allowed.iter().find(|(field, _)| *field == name) else {
            continue;
        };
        if terms.iter().any(|t| t.column == column) {
            continue;
        }
        terms.push(OrderTerm { column, descending });
    }
    if terms.is_empty() {
        default.to_vec()
    } else {
        terms
    }
}

/// Appends ` ORDER BY ...`, with `tiebreak` as the final ascending key so
/// pages are stable.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, terms: &[OrderTerm], tiebreak: &str) {
    qb.push(" ORDER BY ");
    for term in terms {
        qb.push(term.column);
        qb.push(if term.descending { " DESC, " } else { " ASC, " });
    }
    qb.push(tiebreak);
    qb.push(" ASC");
}

/// Whitespace separated search terms, each wrapped for `ILIKE` with the
/// pattern metacharacters escaped.
pub fn search_patterns(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split_whitespace()
        .map(|term| {
            let mut escaped = String::with_capacity(term.len() + 2);
            escaped.push('%');
            for ch in term.chars() {
                if matches!(ch, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(ch);
            }
            escaped.push('%');
            escaped
        })
        .collect()
}

/// Each pattern must match at least one of `columns`.
pub fn push_search(qb: &mut QueryBuilder<'_, Postgres>, patterns: Vec<String>, columns: &[&str]) {
    for pattern in patterns {
        qb.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column);
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

/// `?limit=&offset=` as sent by the client.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub const MAX_LIMIT: i64 = 500;

impl Pagination {
    pub fn from_query(q: &PageQuery) -> ApiResult<Self> {
        let mut errors = FieldErrors::new();
        let limit = parse_count(&mut errors, "limit", q.limit.as_deref());
        let offset = parse_count(&mut errors, "offset", q.offset.as_deref());
        errors.into_result()?;
        Ok(Self { limit, offset })
    }
}

fn parse_count(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty())?;
    match raw.parse::<i64>() {
        Ok(n) if n >= 0 => Some(n),
        _ => {
            errors.add(field, "A valid non-negative integer is required.");
            None
        }
    }
}

pub fn push_pagination(qb: &mut QueryBuilder<'_, Postgres>, page: Pagination) {
    if let Some(limit) = page.limit {
        qb.push(" LIMIT ");
        qb.push_bind(limit.clamp(0, MAX_LIMIT));
    }
    if let Some(offset) = page.offset.filter(|o| *o > 0) {
        qb.push(" OFFSET ");
        qb.push_bind(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &[(&str, &str)] = &[("title", "c.title"), ("created", "c.created")];
    const DEFAULT: &[OrderTerm] = &[OrderTerm {
        column: "c.title",
        descending: false,
    }];

    #[test]
    fn ordering_defaults_when_missing_or_unknown() {
        assert_eq!(parse_ordering(None, FIELDS, DEFAULT), DEFAULT);
        assert_eq!(parse_ordering(Some(""), FIELDS, DEFAULT), DEFAULT);
        assert_eq!(parse_ordering(Some("password,-id"), FIELDS, DEFAULT), DEFAULT);
    }

    #[test]
    fn ordering_keeps_known_fields_in_order() {
        let terms = parse_ordering(Some("-created, bogus ,title,-title"), FIELDS, DEFAULT);
        assert_eq!(
            terms,
            vec![
                OrderTerm { column: "c.created", descending: true },
                OrderTerm { column: "c.title", descending: false },
            ]
        );
    }

    #[test]
    fn order_by_sql() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM goal_categories c WHERE TRUE");
        let terms = parse_ordering(Some("-created,title"), FIELDS, DEFAULT);
        push_order_by(&mut qb, &terms, "c.id");
        assert!(qb
            .sql()
            .ends_with(" ORDER BY c.created DESC, c.title ASC, c.id ASC"));
    }

    #[test]
    fn search_escapes_like_metacharacters() {
        assert_eq!(
            search_patterns(Some("  run 100%  a_b ")),
            vec!["%run%", "%100\\%%", "%a\\_b%"]
        );
        assert_eq!(search_patterns(Some(r"c:\x")), vec![r"%c:\\x%"]);
        assert!(search_patterns(None).is_empty());
        assert!(search_patterns(Some("   ")).is_empty());
    }

    #[test]
    fn search_sql_ands_terms_and_ors_columns() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM goals g WHERE TRUE");
        push_search(
            &mut qb,
            search_patterns(Some("run fast")),
            &["g.title", "g.description"],
        );
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM goals g WHERE TRUE \
             AND (g.title ILIKE $1 OR g.description ILIKE $2) \
             AND (g.title ILIKE $3 OR g.description ILIKE $4)"
        );
    }

    #[test]
    fn pagination_is_optional() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_pagination(&mut qb, Pagination::default());
        assert_eq!(qb.sql(), "SELECT 1");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        push_pagination(&mut qb, Pagination { limit: Some(10), offset: Some(20) });
        assert_eq!(qb.sql(), "SELECT 1 LIMIT $1 OFFSET $2");
    }

    #[test]
    fn pagination_reports_bad_numbers_per_field() {
        let q = PageQuery {
            limit: Some("abc".into()),
            offset: Some("-3".into()),
        };
        match Pagination::from_query(&q) {
            Err(crate::error::ApiError::Validation(errors)) => {
                assert!(errors.get("limit").is_some());
                assert!(errors.get("offset").is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }

        let q = PageQuery {
            limit: Some(" 20 ".into()),
            offset: Some(String::new()),
        };
        assert_eq!(
            Pagination::from_query(&q).unwrap(),
            Pagination { limit: Some(20), offset: None }
        );
    }
}
