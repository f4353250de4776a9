//! Aggregate counts for organization reports.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use civic_shared::{CategoryId, IssueStatus};

use crate::codec;
use crate::database::Database;
use crate::error::Result;

/// Statuses an issue row can hold.  `pending_self` never reaches the table.
const STORED_STATUSES: [IssueStatus; 4] = [
    IssueStatus::Open,
    IssueStatus::PendingExternal,
    IssueStatus::Resolved,
    IssueStatus::Rejected,
];

/// Issue counts per status, zero-filled.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub by_status: BTreeMap<IssueStatus, i64>,
}

impl StatusCounts {
    fn zeroed() -> Self {
        Self {
            total: 0,
            by_status: STORED_STATUSES.into_iter().map(|s| (s, 0)).collect(),
        }
    }

    fn add(&mut self, status: IssueStatus, count: i64) {
        *self.by_status.entry(status).or_insert(0) += count;
        self.total += count;
    }
}

/// Per-category breakdown.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryReport {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(flatten)]
    pub counts: StatusCounts,
}

/// Issues reported on one UTC day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryCount {
    pub category_id: CategoryId,
    pub name: String,
    pub count: i64,
}

/// Issues reported in one category on one UTC day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryDailyCount {
    pub category_id: CategoryId,
    pub name: String,
    pub date: NaiveDate,
    pub count: i64,
}

impl Database {
    /// How many issues sit in each resolution state.
    pub fn resolution_status_counts(&self) -> Result<StatusCounts> {
        let mut stmt = self
            .conn()
            .prepare("SELECT status, COUNT(*) FROM issues GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            Ok((codec::variant::<IssueStatus>(0, &status)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = StatusCounts::zeroed();
        for row in rows {
            let (status, count) = row?;
            counts.add(status, count);
        }
        Ok(counts)
    }

    /// Status counts for every category, including empty ones, ordered by
    /// category name.
    pub fn category_status_counts(&self) -> Result<Vec<CategoryReport>> {
        let mut reports: Vec<CategoryReport> = self
            .list_categories()?
            .into_iter()
            .map(|c| CategoryReport {
                category_id: c.category_id,
                name: c.name,
                counts: StatusCounts::zeroed(),
            })
            .collect();

        let mut stmt = self.conn().prepare(
            "SELECT category_id, status, COUNT(*) FROM issues GROUP BY category_id, status",
        )?;
        let rows = stmt.query_map(params![], |row| {
            let status: String = row.get(1)?;
            Ok((
                CategoryId(row.get(0)?),
                codec::variant::<IssueStatus>(1, &status)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        for row in rows {
            let (category_id, status, count) = row?;
            if let Some(report) = reports.iter_mut().find(|r| r.category_id == category_id) {
                report.counts.add(status, count);
            }
        }
        Ok(reports)
    }

    /// Issue counts per creation day, oldest day first.  Days without
    /// issues are absent.
    pub fn daily_issue_counts(&self) -> Result<Vec<DailyCount>> {
        let mut stmt = self.conn().prepare(
            "SELECT substr(created_at, 1, 10) AS day, COUNT(*)
             FROM issues GROUP BY day ORDER BY day",
        )?;
        let rows = stmt.query_map([], |row| {
            let day: String = row.get(0)?;
            Ok(DailyCount {
                date: codec::day(0, &day)?,
                count: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Issue totals for every category, including empty ones, ordered by
    /// category name.
    pub fn category_issue_counts(&self) -> Result<Vec<CategoryCount>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.category_id, c.name, COUNT(i.issue_id)
             FROM categories c
             LEFT JOIN issues i ON i.category_id = c.category_id
             GROUP BY c.category_id, c.name
             ORDER BY c.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CategoryCount {
                category_id: CategoryId(row.get(0)?),
                name: row.get(1)?,
                count: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Issue counts per category and creation day, ordered by day and then
    /// category name.
    pub fn category_daily_counts(&self) -> Result<Vec<CategoryDailyCount>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.category_id, c.name, substr(i.created_at, 1, 10) AS day, COUNT(*)
             FROM issues i
             JOIN categories c ON c.category_id = i.category_id
             GROUP BY c.category_id, c.name, day
             ORDER BY day, c.name",
        )?;
        let rows = stmt.query_map([], |row| {
            let day: String = row.get(2)?;
            Ok(CategoryDailyCount {
                category_id: CategoryId(row.get(0)?),
                name: row.get(1)?,
                date: codec::day(2, &day)?,
                count: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }
}
