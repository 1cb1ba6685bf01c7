//! Response envelopes and the shared list query.

use crate::models::{PageRequest, SortOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use std::borrow::Cow;
use validator::{Validate, ValidationError};

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;
/// Decimal places stored for every money column.
pub const MONEY_SCALE: u32 = 2;

/// `{ success, data, message }` envelope for single results.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(total: i64, page: &PageRequest) -> Self {
        let limit = i64::from(page.limit.max(1));
        Self {
            total,
            page: page.page,
            limit: page.limit,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Envelope for paginated lists.
#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub success: bool,
    pub data: Vec<T>,
    pub meta: PageMeta,
    pub message: String,
}

impl<T> ListResponse<T> {
    pub fn new<R>(rows: Vec<R>, total: i64, page: &PageRequest) -> Self
    where
        T: From<R>,
    {
        let data: Vec<T> = rows.into_iter().map(T::from).collect();
        Self {
            success: true,
            message: format!("Retrieved {} records", data.len()),
            data,
            meta: PageMeta::new(total, page),
        }
    }
}

/// `{page, limit, sortBy, order}` accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[validate(range(min = 1, message = "page must be at least 1"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub order: Option<SortOrder>,
}

/// Allowed `sortBy` values mapped to their columns; the first entry is the default.
pub type SortColumns = &'static [(&'static str, &'static str)];

impl ListQuery {
    pub fn page_request(&self, sortable: SortColumns) -> Result<PageRequest, AppError> {
        self.validate()?;

        let default_column = sortable
            .first()
            .map(|(_, column)| *column)
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("no sortable columns")))?;

        let sort_column = match self.sort_by.as_deref() {
            None => default_column,
            Some(requested) => sortable
                .iter()
                .find(|(name, _)| *name == requested)
                .map(|(_, column)| *column)
                .ok_or_else(|| {
                    let allowed: Vec<&str> = sortable.iter().map(|(name, _)| *name).collect();
                    AppError::BadRequest(anyhow::anyhow!(
                        "sortBy must be one of: {}",
                        allowed.join(", ")
                    ))
                })?,
        };

        Ok(PageRequest {
            page: self.page.unwrap_or(1),
            limit: self.limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
            sort_column,
            order: self.order.unwrap_or_default(),
        })
    }
}

pub(crate) fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(validation_error("non_negative", "must not be negative"));
    }
    Ok(())
}

pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(validation_error("positive", "must be greater than zero"));
    }
    Ok(())
}

/// Money columns hold cents; anything finer would be rounded on write.
fn whole_cents(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(validation_error(
            "money_scale",
            "must not have more than 2 decimal places",
        ));
    }
    Ok(())
}

pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    positive(value)?;
    whole_cents(value)
}

pub fn non_negative_amount(value: &Decimal) -> Result<(), ValidationError> {
    non_negative(value)?;
    whole_cents(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SORTABLE: SortColumns = &[("createdUtc", "created_utc"), ("dueDate", "due_date")];

    #[test]
    fn test_defaults() {
        let page = ListQuery::default().page_request(SORTABLE).unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 10);
        assert_eq!(page.sort_column, "created_utc");
        assert_eq!(page.order, SortOrder::Desc);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_sort_by_is_whitelisted() {
        let query = ListQuery {
            sort_by: Some("dueDate".to_string()),
            order: Some(SortOrder::Asc),
            page: Some(3),
            limit: Some(20),
        };
        let page = query.page_request(SORTABLE).unwrap();
        assert_eq!(page.sort_column, "due_date");
        assert_eq!(page.offset(), 40);

        let injected = ListQuery {
            sort_by: Some("1; DROP TABLE bills".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            injected.page_request(SORTABLE),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_limit_bounds() {
        let query = ListQuery {
            limit: Some(500),
            ..Default::default()
        };
        assert!(matches!(
            query.page_request(SORTABLE),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_amounts_are_whole_cents() {
        assert!(positive_amount(&Decimal::new(99999, 2)).is_ok());
        assert!(positive_amount(&Decimal::new(1000000, 3)).is_ok());
        assert!(positive_amount(&Decimal::new(999995, 3)).is_err());
        assert!(positive_amount(&Decimal::new(4, 3)).is_err());
        assert!(non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(non_negative_amount(&Decimal::new(15, 3)).is_err());
        assert!(non_negative_amount(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_page_meta_rounds_up() {
        let page = ListQuery::default().page_request(SORTABLE).unwrap();
        assert_eq!(PageMeta::new(21, &page).total_pages, 3);
        assert_eq!(PageMeta::new(0, &page).total_pages, 0);
    }
}
