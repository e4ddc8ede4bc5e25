use uuid::Uuid;

use super::dto::GoalRequest;
use super::repo_types::{GoalFields, GoalPriority, GoalRow, GoalStatus};
use crate::boards::repo_types::BoardRole;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::validate;

pub const ARCHIVE_VIA_DELETE: &str = "Goals are archived by deleting them.";

/// How a request body combines with the stored goal.
#[derive(Debug, Clone, Copy)]
pub enum WriteMode<'a> {
    Create,
    /// PUT: `title` and `category` are required, other absent fields keep
    /// their stored value.
    Replace(&'a GoalRow),
    /// PATCH: every absent field keeps its stored value.
    Patch(&'a GoalRow),
}

impl<'a> WriteMode<'a> {
    fn current(self) -> Option<&'a GoalRow> {
        match self {
            WriteMode::Create => None,
            WriteMode::Replace(row) | WriteMode::Patch(row) => Some(row),
        }
    }
}

/// Validates `body` and merges it over the stored goal, if any.
pub fn resolve_fields(body: GoalRequest, mode: WriteMode<'_>) -> ApiResult<GoalFields> {
    let mut errors = FieldErrors::new();
    let current = mode.current();
    let patch = matches!(mode, WriteMode::Patch(_));

    let raw_title = body.title.as_ref().map(Option::as_deref);
    let title = validate::nullable_title(&mut errors, raw_title, patch)
        .or_else(|| current.map(|row| row.title.clone()))
        .unwrap_or_default();

    let category_id = match (body.category.as_deref(), current) {
        (None, Some(row)) if patch => Some(row.category_id),
        (raw, _) => validate::required_ref(&mut errors, "category", raw),
    };

    let description = match body.description {
        Some(d) => d.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        None => current.and_then(|row| row.description.clone()),
    };

    let status = match body.status.as_deref() {
        Some(raw) => match GoalStatus::parse(raw) {
            Some(GoalStatus::Archived) => {
                errors.add("status", ARCHIVE_VIA_DELETE);
                None
            }
            Some(s) => Some(s),
            None => {
                errors.add("status", format!("\"{raw}\" is not a valid choice."));
                None
            }
        },
        None => Some(current.map(|row| row.status).unwrap_or_default()),
    };

    let priority = match body.priority.as_deref() {
        Some(raw) => {
            let parsed = GoalPriority::parse(raw);
            if parsed.is_none() {
                errors.add("priority", format!("\"{raw}\" is not a valid choice."));
            }
            parsed
        }
        None => Some(current.map(|row| row.priority).unwrap_or_default()),
    };

    let due_date = match body.due_date {
        Some(Some(raw)) => validate::parse_date("due_date", &raw, &mut errors),
        Some(None) => None,
        None => current.and_then(|row| row.due_date),
    };

    errors.into_result()?;
    match (category_id, status, priority) {
        (Some(category_id), Some(status), Some(priority)) => Ok(GoalFields {
            title,
            description,
            status,
            priority,
            due_date,
            category_id,
        }),
        _ => Err(ApiError::Internal(anyhow::anyhow!(
            "goal fields unresolved without a validation error"
        ))),
    }
}

/// Writers and owners of the category's board may put goals in it.
pub fn check_category_access(category_id: Uuid, role: Option<BoardRole>) -> ApiResult<()> {
    match role {
        Some(role) if role.can_write() => Ok(()),
        Some(_) => Err(ApiError::field(
            "category",
            "You must be an owner or writer of this category's board.",
        )),
        None => Err(ApiError::field(
            "category",
            format!("Category \"{category_id}\" does not exist."),
        )),
    }
}

/// Only writers and owners of the goal's board may change or archive it.
/// Readers can see the goal, so refusing them reveals nothing.
pub fn check_goal_write(role: Option<BoardRole>) -> ApiResult<()> {
    match role {
        Some(role) if role.can_write() => Ok(()),
        Some(_) => Err(ApiError::Forbidden(
            "You must be an owner or writer of this goal's board.".into(),
        )),
        None => Err(ApiError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn stored() -> GoalRow {
        GoalRow {
            id: Uuid::new_v4(),
            title: "Run 5k".into(),
            description: Some("before summer".into()),
            status: GoalStatus::InProgress,
            priority: GoalPriority::High,
            due_date: Some(date!(2024 - 06 - 01)),
            category_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            user_email: "b@example.com".into(),
            created: datetime!(2024-01-01 0:00 UTC),
            updated: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn field_errors(res: ApiResult<GoalFields>) -> FieldErrors {
        match res {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_applies_defaults() {
        let category = Uuid::new_v4();
        let body = GoalRequest {
            title: Some(Some(" Run 5k ".into())),
            category: Some(category.to_string()),
            ..Default::default()
        };
        let fields = resolve_fields(body, WriteMode::Create).unwrap();
        assert_eq!(fields.title, "Run 5k");
        assert_eq!(fields.category_id, category);
        assert_eq!(fields.status, GoalStatus::ToDo);
        assert_eq!(fields.priority, GoalPriority::Medium);
        assert_eq!(fields.description, None);
        assert_eq!(fields.due_date, None);
    }

    #[test]
    fn create_requires_title_and_category() {
        let errors = field_errors(resolve_fields(GoalRequest::default(), WriteMode::Create));
        assert!(errors.get("title").is_some());
        assert!(errors.get("category").is_some());
    }

    #[test]
    fn archived_status_is_rejected() {
        let row = stored();
        let body = GoalRequest {
            status: Some("archived".into()),
            ..Default::default()
        };
        let errors = field_errors(resolve_fields(body, WriteMode::Patch(&row)));
        assert_eq!(errors.get("status"), Some(&[ARCHIVE_VIA_DELETE.to_string()][..]));
    }

    #[test]
    fn patch_keeps_stored_values() {
        let row = stored();
        let body = GoalRequest {
            priority: Some("low".into()),
            due_date: Some(None),
            ..Default::default()
        };
        let fields = resolve_fields(body, WriteMode::Patch(&row)).unwrap();
        assert_eq!(fields.title, row.title);
        assert_eq!(fields.category_id, row.category_id);
        assert_eq!(fields.description, row.description);
        assert_eq!(fields.status, GoalStatus::InProgress);
        assert_eq!(fields.priority, GoalPriority::Low);
        assert_eq!(fields.due_date, None);
    }

    #[test]
    fn put_requires_title_and_category_but_keeps_the_rest() {
        let row = stored();
        let errors = field_errors(resolve_fields(GoalRequest::default(), WriteMode::Replace(&row)));
        assert!(errors.get("title").is_some());
        assert!(errors.get("category").is_some());

        let body = GoalRequest {
            title: Some(Some("Run 10k".into())),
            category: Some(row.category_id.to_string()),
            description: Some(None),
            ..Default::default()
        };
        let fields = resolve_fields(body, WriteMode::Replace(&row)).unwrap();
        assert_eq!(fields.title, "Run 10k");
        assert_eq!(fields.description, None);
        assert_eq!(fields.priority, GoalPriority::High);
        assert_eq!(fields.due_date, row.due_date);
    }

    #[test]
    fn bad_choices_and_dates_are_reported_together() {
        let body = GoalRequest {
            title: Some(Some("x".into())),
            category: Some(Uuid::new_v4().to_string()),
            status: Some("paused".into()),
            priority: Some("urgent".into()),
            due_date: Some(Some("tomorrow".into())),
            ..Default::default()
        };
        let errors = field_errors(resolve_fields(body, WriteMode::Create));
        assert!(errors.get("status").is_some());
        assert!(errors.get("priority").is_some());
        assert!(errors.get("due_date").is_some());
    }

    #[test]
    fn patch_rejects_null_title() {
        let row = stored();
        let body = GoalRequest {
            title: Some(None),
            ..Default::default()
        };
        let errors = field_errors(resolve_fields(body, WriteMode::Patch(&row)));
        assert_eq!(errors.get("title"), Some(&[validate::NULL.to_string()][..]));
    }

    #[test]
    fn readers_cannot_change_goals() {
        assert!(check_goal_write(Some(BoardRole::Owner)).is_ok());
        assert!(check_goal_write(Some(BoardRole::Writer)).is_ok());
        assert!(matches!(
            check_goal_write(Some(BoardRole::Reader)),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(check_goal_write(None), Err(ApiError::NotFound)));
    }

    #[test]
    fn category_access() {
        let id = Uuid::new_v4();
        assert!(check_category_access(id, Some(BoardRole::Owner)).is_ok());
        assert!(check_category_access(id, Some(BoardRole::Writer)).is_ok());
        assert!(matches!(
            check_category_access(id, Some(BoardRole::Reader)),
            Err(ApiError::Validation(_))
        ));
        assert!(matches!(
            check_category_access(id, None),
            Err(ApiError::Validation(_))
        ));
    }
}
