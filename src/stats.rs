//! Dashboard aggregation over sessions, queries and token usage.

use chrono::{Duration, NaiveDate};

use crate::api::models::{Query, Session, TokenUsage};
use crate::markdown;

pub const ACTIVITY_DAYS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Join,
    Where,
    Aggregate,
}

impl StatementKind {
    pub const ALL: [StatementKind; 4] = [
        StatementKind::Select,
        StatementKind::Join,
        StatementKind::Where,
        StatementKind::Aggregate,
    ];

    pub fn label(self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Join => "JOIN",
            StatementKind::Where => "WHERE",
            StatementKind::Aggregate => "AGGREGATE",
        }
    }

    /// Whether `sql` shows this feature. A statement can show several.
    pub fn matches(self, sql: &str) -> bool {
        let upper = sql.to_uppercase();
        let words: Vec<&str> = upper
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .collect();
        match self {
            StatementKind::Select => words.first().is_some_and(|w| *w == "SELECT" || *w == "WITH"),
            StatementKind::Join => words.contains(&"JOIN"),
            StatementKind::Where => words.contains(&"WHERE"),
            StatementKind::Aggregate => {
                words.windows(2).any(|w| w == ["GROUP", "BY"])
                    || ["COUNT(", "SUM(", "AVG(", "MIN(", "MAX("]
                        .iter()
                        .any(|f| upper.replace(' ', "").contains(f))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UsageTotals {
    pub prompt: i64,
    pub completion: i64,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardStats {
    pub databases: usize,
    pub sessions: usize,
    pub queries: usize,
    pub successful: usize,
    /// Oldest day first.
    pub activity: Vec<(NaiveDate, u64)>,
    pub kinds: Vec<(StatementKind, u64)>,
    /// Ascending by timestamp.
    pub usage: Vec<TokenUsage>,
    pub usage_totals: UsageTotals,
}

impl DashboardStats {
    /// `sessions` must carry their queries.
    pub fn compute(
        databases: usize,
        sessions: &[Session],
        mut usage: Vec<TokenUsage>,
        today: NaiveDate,
    ) -> Self {
        let mut activity: Vec<(NaiveDate, u64)> = (0..ACTIVITY_DAYS)
            .rev()
            .map(|back| (today - Duration::days(back as i64), 0))
            .collect();
        let mut kinds: Vec<(StatementKind, u64)> =
            StatementKind::ALL.iter().map(|k| (*k, 0)).collect();

        let queries: Vec<&Query> = sessions.iter().flat_map(|s| s.queries.iter()).collect();

        for query in &queries {
            if let Some(day) = query.created_at.map(|t| t.date_naive()) {
                if let Some(slot) = activity.iter_mut().find(|(d, _)| *d == day) {
                    slot.1 += 1;
                }
            }

            let sql = statement_of(query);
            if sql.is_empty() {
                continue;
            }
            for (kind, count) in kinds.iter_mut() {
                if kind.matches(&sql) {
                    *count += 1;
                }
            }
        }

        usage.sort_by_key(|u| u.timestamp);
        let usage_totals = usage.iter().fold(UsageTotals::default(), |acc, u| UsageTotals {
            prompt: acc.prompt + u.prompt_tokens,
            completion: acc.completion + u.completion_tokens,
            total: acc.total + u.total_tokens,
        });

        Self {
            databases,
            sessions: sessions.len(),
            queries: queries.len(),
            successful: queries.iter().filter(|q| q.success).count(),
            activity,
            kinds,
            usage,
            usage_totals,
        }
    }

    /// Percentage of successful queries; 0 when there are none.
    pub fn success_rate(&self) -> f64 {
        if self.queries == 0 {
            0.0
        } else {
            self.successful as f64 * 100.0 / self.queries as f64
        }
    }
}

fn statement_of(query: &Query) -> String {
    match &query.generated_sql {
        Some(sql) if !sql.trim().is_empty() => sql.clone(),
        _ => markdown::extract_sql(&query.response),
    }
}
