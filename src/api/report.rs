//! Attendance reports for the HR dashboard.
//!
//! Rows are loaded with plain joins and classified with the same resolvers
//! as check-in and check-out.

use crate::{
    auth::auth::AuthUser,
    core::{AttendanceStatus, CheckoutStatus, CivilClock, ShiftSchedule, resolve_checkout},
    error::{AppError, AppResult},
    model::privilege::Privilege,
    utils::db_utils::{optional_sql_date, page_window, sql_date},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

/// Longest range the attendance report accepts, in days.
pub const MAX_REPORT_DAYS: i64 = 366;

/// One attendance row joined with its employee and shift.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReportRow {
    pub attendance_id: u64,
    pub employee_id: u64,
    pub employee_code: String,
    pub full_name: String,
    pub work_unit_id: Option<u64>,
    pub work_unit_name: Option<String>,
    pub date: NaiveDate,
    pub check_in: Option<NaiveTime>,
    pub check_out: Option<NaiveTime>,
    #[sqlx(try_from = "String")]
    pub status: AttendanceStatus,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub tolerance_minutes: Option<i32>,
}

impl ReportRow {
    /// Without a usable shift there is no scheduled end, so a closed day
    /// counts as complete.
    pub fn checkout(&self) -> Option<CheckoutStatus> {
        match ShiftSchedule::from_config(self.start_time, self.tolerance_minutes, self.end_time) {
            Ok(schedule) => resolve_checkout(self.check_in, self.check_out, &schedule),
            Err(_) => self.check_in.map(|_| match self.check_out {
                Some(_) => CheckoutStatus::Complete,
                None => CheckoutStatus::Incomplete,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DaySummary {
    #[schema(example = "2026-01-05", value_type = String, format = "date")]
    pub date: NaiveDate,
    /// Active employees.
    pub total_employees: u64,
    /// Checked in, on time or late.
    pub present: u64,
    pub on_time: u64,
    pub late: u64,
    /// Recorded absent by closing the day.
    pub absent: u64,
    pub on_leave: u64,
    pub early_leave: u64,
    /// Checked in without checking out.
    pub incomplete: u64,
    /// Active employees with neither a record nor leave.
    pub not_recorded: u64,
}

/// Dashboard counts for one civil date.
pub fn summarize_day(
    date: NaiveDate,
    total_employees: u64,
    on_leave: u64,
    rows: &[ReportRow],
) -> DaySummary {
    let mut summary = DaySummary {
        date,
        total_employees,
        on_leave,
        ..Default::default()
    };

    for row in rows {
        match row.status {
            AttendanceStatus::OnTime => summary.on_time += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::Absent => summary.absent += 1,
        }
        match row.checkout() {
            Some(CheckoutStatus::EarlyLeave) => summary.early_leave += 1,
            Some(CheckoutStatus::Incomplete) => summary.incomplete += 1,
            _ => {}
        }
    }

    summary.present = summary.on_time + summary.late;
    summary.not_recorded = total_employees
        .saturating_sub(summary.present)
        .saturating_sub(summary.absent)
        .saturating_sub(on_leave);
    summary
}

const REPORT_SELECT: &str = r#"
    SELECT
        a.id AS attendance_id,
        a.employee_id,
        e.employee_code,
        e.full_name,
        a.work_unit_id,
        w.name AS work_unit_name,
        a.date,
        a.check_in,
        a.check_out,
        a.status,
        s.start_time,
        s.end_time,
        s.tolerance_minutes
    FROM attendance a
    JOIN employees e ON e.id = a.employee_id
    LEFT JOIN work_units w ON w.id = a.work_unit_id
    LEFT JOIN shifts s ON s.id = e.shift_id
"#;

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SummaryQuery {
    /// Civil date; defaults to today.
    #[schema(example = "2026-01-05", value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
}

#[utoipa::path(
    get,
    path = "/api/reports/summary",
    params(SummaryQuery),
    responses(
        (status = 200, description = "Dashboard counts", body = DaySummary),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn day_summary(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    clock: web::Data<CivilClock>,
    query: web::Query<SummaryQuery>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ViewReports)?;
    let date = optional_sql_date("date", query.date)?.unwrap_or_else(|| clock.today());

    let total_employees =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees WHERE status = 'active'")
            .fetch_one(pool.get_ref())
            .await?;

    let on_leave = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT l.employee_id)
        FROM leave_requests l
        JOIN employees e ON e.id = l.employee_id
        WHERE e.status = 'active'
        AND l.status = 'approved'
        AND ? BETWEEN l.start_date AND l.end_date
        "#,
    )
    .bind(date)
    .fetch_one(pool.get_ref())
    .await?;

    let sql = format!("{REPORT_SELECT} WHERE a.date = ? AND e.status = 'active'");
    let rows = sqlx::query_as::<_, ReportRow>(&sql)
        .bind(date)
        .fetch_all(pool.get_ref())
        .await?;

    let summary = summarize_day(date, total_employees as u64, on_leave as u64, &rows);
    Ok(HttpResponse::Ok().json(summary))
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct AttendanceReportQuery {
    #[schema(example = "2026-01-01", value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2026-01-31", value_type = String, format = "date")]
    pub to: NaiveDate,
    pub employee_id: Option<u64>,
    pub work_unit_id: Option<u64>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl AttendanceReportQuery {
    pub fn validate(&self) -> AppResult<()> {
        sql_date("from", self.from)?;
        sql_date("to", self.to)?;
        if self.from > self.to {
            return Err(AppError::BadRequest("from cannot be after to".into()));
        }
        if (self.to - self.from).num_days() >= MAX_REPORT_DAYS {
            return Err(AppError::BadRequest(format!(
                "Range cannot exceed {MAX_REPORT_DAYS} days"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AttendanceReportItem {
    pub attendance_id: u64,
    pub employee_id: u64,
    #[schema(example = "EMP-001")]
    pub employee_code: String,
    #[schema(example = "Siti Rahayu")]
    pub full_name: String,
    pub work_unit_id: Option<u64>,
    pub work_unit_name: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "time")]
    pub check_in: Option<NaiveTime>,
    #[schema(value_type = Option<String>, format = "time")]
    pub check_out: Option<NaiveTime>,
    pub status: AttendanceStatus,
    #[schema(example = "Terlambat")]
    pub status_label: String,
    pub checkout: Option<CheckoutStatus>,
    #[schema(example = "Lengkap")]
    pub checkout_label: Option<String>,
}

impl From<ReportRow> for AttendanceReportItem {
    fn from(row: ReportRow) -> Self {
        let status = row.status;
        let checkout = row.checkout();
        Self {
            attendance_id: row.attendance_id,
            employee_id: row.employee_id,
            employee_code: row.employee_code,
            full_name: row.full_name,
            work_unit_id: row.work_unit_id,
            work_unit_name: row.work_unit_name,
            date: row.date,
            check_in: row.check_in,
            check_out: row.check_out,
            status,
            status_label: status.display_label().to_string(),
            checkout,
            checkout_label: checkout.map(|c| c.display_label().to_string()),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReportResponse {
    pub data: Vec<AttendanceReportItem>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 50)]
    pub per_page: u32,
    #[schema(example = 120)]
    pub total: i64,
}

#[utoipa::path(
    get,
    path = "/api/reports/attendance",
    params(AttendanceReportQuery),
    responses(
        (status = 200, description = "Classified attendance rows", body = AttendanceReportResponse),
        (status = 400, description = "Invalid range"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn attendance_report(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceReportQuery>,
) -> AppResult<HttpResponse> {
    auth.require_privilege(Privilege::ViewReports)?;
    query.validate()?;

    let (page, per_page, offset) = page_window(query.page, query.per_page, 50);

    let mut where_sql = String::from(" WHERE a.date BETWEEN ? AND ?");
    let mut ids: Vec<u64> = Vec::new();
    if let Some(employee_id) = query.employee_id {
        where_sql.push_str(" AND a.employee_id = ?");
        ids.push(employee_id);
    }
    if let Some(work_unit_id) = query.work_unit_id {
        where_sql.push_str(" AND a.work_unit_id = ?");
        ids.push(work_unit_id);
    }

    let count_sql = format!("SELECT COUNT(*) FROM attendance a{where_sql}");
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql)
        .bind(query.from)
        .bind(query.to);
    for id in &ids {
        count_q = count_q.bind(*id);
    }
    let total = count_q.fetch_one(pool.get_ref()).await?;

    let data_sql = format!(
        "{REPORT_SELECT}{where_sql} ORDER BY a.date DESC, e.full_name LIMIT ? OFFSET ?"
    );
    let mut data_q = sqlx::query_as::<_, ReportRow>(&data_sql)
        .bind(query.from)
        .bind(query.to);
    for id in &ids {
        data_q = data_q.bind(*id);
    }
    let rows = data_q
        .bind(per_page as i64)
        .bind(offset as i64)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(AttendanceReportResponse {
        data: rows.into_iter().map(AttendanceReportItem::from).collect(),
        page,
        per_page,
        total,
    }))
}
