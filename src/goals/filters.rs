use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};
use time::Date;
use uuid::Uuid;

use super::repo_types::{GoalPriority, GoalStatus};
use crate::error::{ApiResult, FieldErrors};
use crate::validate;

/// Raw `GET /goals/goal/list` query string.
#[derive(Debug, Default, Deserialize)]
pub struct GoalListQuery {
    pub ordering: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "due_date__gte")]
    pub due_date_gte: Option<String>,
    #[serde(rename = "due_date__lte")]
    pub due_date_lte: Option<String>,
    #[serde(rename = "category__in")]
    pub category_in: Option<String>,
    #[serde(rename = "status__in")]
    pub status_in: Option<String>,
    #[serde(rename = "priority__in")]
    pub priority_in: Option<String>,
}

/// Parsed field filters; empty lists mean "no constraint".
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GoalFilter {
    pub due_date_gte: Option<Date>,
    pub due_date_lte: Option<Date>,
    pub categories: Vec<Uuid>,
    pub statuses: Vec<GoalStatus>,
    pub priorities: Vec<GoalPriority>,
}

fn comma_list<T>(
    errors: &mut FieldErrors,
    field: &str,
    raw: Option<&str>,
    parse: impl Fn(&str) -> Option<T>,
) -> Vec<T> {
    let mut out = Vec::new();
    for item in raw.unwrap_or_default().split(',').map(str::trim) {
        if item.is_empty() {
            continue;
        }
        match parse(item) {
            Some(v) => out.push(v),
            None => errors.add(field, format!("Select a valid choice. {item} is not one of the available choices.")),
        }
    }
    out
}

impl GoalFilter {
    pub fn from_query(q: &GoalListQuery) -> ApiResult<Self> {
        let mut errors = FieldErrors::new();
        let mut date = |field: &str, raw: Option<&str>| {
            raw.filter(|s| !s.trim().is_empty())
                .and_then(|s| validate::parse_date(field, s, &mut errors))
        };
        let due_date_gte = date("due_date__gte", q.due_date_gte.as_deref());
        let due_date_lte = date("due_date__lte", q.due_date_lte.as_deref());

        let filter = GoalFilter {
            due_date_gte,
            due_date_lte,
            categories: comma_list(&mut errors, "category__in", q.category_in.as_deref(), |s| {
                Uuid::parse_str(s).ok()
            }),
            statuses: comma_list(&mut errors, "status__in", q.status_in.as_deref(), GoalStatus::parse),
            priorities: comma_list(
                &mut errors,
                "priority__in",
                q.priority_in.as_deref(),
                GoalPriority::parse,
            ),
        };
        errors.into_result()?;
        Ok(filter)
    }

    /// Appends `AND ...` clauses against the `g` alias.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(d) = self.due_date_gte {
            qb.push(" AND g.due_date >= ");
            qb.push_bind(d);
        }
        if let Some(d) = self.due_date_lte {
            qb.push(" AND g.due_date <= ");
            qb.push_bind(d);
        }
        if !self.categories.is_empty() {
            qb.push(" AND g.category_id IN (");
            let mut list = qb.separated(", ");
            for id in &self.categories {
                list.push_bind(*id);
            }
            list.push_unseparated(")");
        }
        if !self.statuses.is_empty() {
            qb.push(" AND g.status IN (");
            let mut list = qb.separated(", ");
            for s in &self.statuses {
                list.push_bind(*s);
            }
            list.push_unseparated(")");
        }
        if !self.priorities.is_empty() {
            qb.push(" AND g.priority IN (");
            let mut list = qb.separated(", ");
            for p in &self.priorities {
                list.push_bind(*p);
            }
            list.push_unseparated(")");
        }
    }
}
