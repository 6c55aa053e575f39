use chrono::{Datelike, NaiveDate, NaiveTime};
use serde_json::Value;
use sqlx::MySqlPool;

use crate::error::AppError;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    U64(u64),
    Time(NaiveTime),
    Null,
}

/// How a patchable column's JSON value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Unsigned id; `null` clears it.
    OptionalId,
    Integer,
    Time,
}

/// A column that may be set through a JSON patch body.
#[derive(Debug, Clone, Copy)]
pub struct Patchable {
    pub column: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
}

impl Patchable {
    pub const fn required(column: &'static str, kind: ColumnKind) -> Self {
        Self {
            column,
            kind,
            nullable: false,
        }
    }

    pub const fn nullable(column: &'static str, kind: ColumnKind) -> Self {
        Self {
            column,
            kind,
            nullable: true,
        }
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
    /// Columns touched, in SET order.
    pub columns: Vec<&'static str>,
}

fn convert(field: &Patchable, value: &Value) -> Result<SqlValue, AppError> {
    let bad = || AppError::BadRequest(format!("Invalid value for '{}'", field.column));

    if value.is_null() {
        return if field.nullable {
            Ok(SqlValue::Null)
        } else {
            Err(AppError::BadRequest(format!("'{}' cannot be null", field.column)))
        };
    }

    let converted = match field.kind {
        ColumnKind::Text => SqlValue::String(value.as_str().ok_or_else(bad)?.trim().to_string()),
        ColumnKind::OptionalId => SqlValue::U64(value.as_u64().ok_or_else(bad)?),
        ColumnKind::Integer => SqlValue::I64(value.as_i64().ok_or_else(bad)?),
        ColumnKind::Time => {
            let raw = value.as_str().ok_or_else(bad)?;
            SqlValue::Time(crate::core::parse_clock_time(raw).map_err(|_| bad())?)
        }
    };

    Ok(converted)
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Only keys present in `allowed` are accepted; anything else is a 400 so
/// a patch body can never name arbitrary columns.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[Patchable],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Payload must be a JSON object".into()))?;

    if obj.is_empty() {
        return Err(AppError::BadRequest("No fields provided for update".into()));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let field = allowed
            .iter()
            .find(|p| p.column == key.as_str())
            .ok_or_else(|| AppError::BadRequest(format!("Field '{key}' cannot be updated")))?;

        columns.push(field.column);
        values.push(convert(field, value)?);
    }

    let set_clause = columns
        .iter()
        .map(|c| format!("{c} = ?"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {table} SET {set_clause} WHERE {id_column} = ?");

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate {
        sql,
        values,
        columns,
    })
}

impl SqlUpdate {
    pub fn value_of(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| *c == column)
            .map(|i| &self.values[i])
    }
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Time(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

/// Rejects client dates outside MySQL's DATE range (1000-01-01 to 9999-12-31).
pub fn sql_date(field: &str, date: NaiveDate) -> Result<NaiveDate, AppError> {
    if (1000..=9999).contains(&date.year()) {
        Ok(date)
    } else {
        Err(AppError::BadRequest(format!(
            "{field} must be between 1000-01-01 and 9999-12-31"
        )))
    }
}

pub fn optional_sql_date(field: &str, date: Option<NaiveDate>) -> Result<Option<NaiveDate>, AppError> {
    date.map(|d| sql_date(field, d)).transpose()
}

/// Page/per_page normalisation shared by list endpoints.
pub fn page_window(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> (u32, u32, u64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(default_per_page).clamp(1, 100);
    let offset = (page as u64 - 1) * per_page as u64;
    (page, per_page, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SHIFT_COLUMNS: &[Patchable] = &[
        Patchable::required("name", ColumnKind::Text),
        Patchable::nullable("start_time", ColumnKind::Time),
        Patchable::required("tolerance_minutes", ColumnKind::Integer),
    ];

    #[test]
    fn test_builds_update_for_allowed_columns() {
        let update = build_update_sql(
            "shifts",
            &json!({ "name": " Pagi ", "start_time": "08:00" }),
            SHIFT_COLUMNS,
            "id",
            4,
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE shifts SET name = ?, start_time = ? WHERE id = ?");
        assert_eq!(update.values[0], SqlValue::String("Pagi".into()));
        assert_eq!(
            update.values[1],
            SqlValue::Time(NaiveTime::from_hms_opt(8, 0, 0).unwrap())
        );
        assert_eq!(update.values[2], SqlValue::U64(4));
    }

    #[test]
    fn test_rejects_unknown_column() {
        let err = build_update_sql("shifts", &json!({ "id; DROP": 1 }), SHIFT_COLUMNS, "id", 1)
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_null_only_for_nullable_columns() {
        assert!(build_update_sql("shifts", &json!({ "start_time": null }), SHIFT_COLUMNS, "id", 1).is_ok());
        assert!(build_update_sql("shifts", &json!({ "name": null }), SHIFT_COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn test_rejects_wrong_types_and_empty_objects() {
        assert!(build_update_sql("shifts", &json!({ "tolerance_minutes": "ten" }), SHIFT_COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("shifts", &json!({}), SHIFT_COLUMNS, "id", 1).is_err());
        assert!(build_update_sql("shifts", &json!([1, 2]), SHIFT_COLUMNS, "id", 1).is_err());
    }

    #[test]
    fn test_value_of_finds_column() {
        let update = build_update_sql(
            "shifts",
            &json!({ "tolerance_minutes": 15 }),
            SHIFT_COLUMNS,
            "id",
            1,
        )
        .unwrap();
        assert_eq!(update.value_of("tolerance_minutes"), Some(&SqlValue::I64(15)));
        assert_eq!(update.value_of("name"), None);
    }

    #[test]
    fn test_page_window_clamps() {
        assert_eq!(page_window(None, None, 20), (1, 20, 0));
        assert_eq!(page_window(Some(0), Some(500), 20), (1, 100, 0));
        assert_eq!(page_window(Some(3), Some(10), 20), (3, 10, 20));
    }

    #[test]
    fn test_sql_date_bounds() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert!(sql_date("date", d(1000, 1, 1)).is_ok());
        assert!(sql_date("date", d(9999, 12, 31)).is_ok());
        assert!(matches!(sql_date("date", d(999, 12, 31)), Err(AppError::BadRequest(_))));
        assert!(matches!(sql_date("date", d(-1, 1, 1)), Err(AppError::BadRequest(_))));
        assert!(sql_date("date", d(10000, 1, 1)).is_err());
        assert_eq!(optional_sql_date("from", None).unwrap(), None);
    }
}
