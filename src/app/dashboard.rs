use tracing::{info, warn};

use crate::app::App;
use crate::error::ApiResult;
use crate::stats::{DashboardStats, ACTIVITY_DAYS};

const USAGE_LIMIT: u32 = 50;

impl App {
    /// Gathers counts and usage for the dashboard. A session whose detail
    /// fails to load is left out; missing token usage shows as empty.
    pub async fn load_dashboard(&mut self) -> ApiResult<()> {
        let databases = self.backend().list_databases().await?.len();
        let listed = self.backend().list_sessions(None).await?;

        let mut sessions = Vec::with_capacity(listed.len());
        for session in listed {
            match self.backend().get_session(session.id).await {
                Ok(detail) => sessions.push(detail),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => warn!("Skipping session {} on dashboard: {}", session.id, e),
            }
        }

        let usage = match self
            .backend()
            .token_usage(Some(ACTIVITY_DAYS as u32), Some(USAGE_LIMIT))
            .await
        {
            Ok(usage) => usage,
            Err(e) if e.is_auth() => return Err(e),
            Err(e) => {
                warn!("Token usage unavailable: {}", e);
                Vec::new()
            }
        };

        let today = chrono::Utc::now().date_naive();
        let stats = DashboardStats::compute(databases, &sessions, usage, today);
        info!(
            "Dashboard: {} databases, {} sessions, {} queries",
            stats.databases, stats.sessions, stats.queries
        );
        self.dashboard = Some(stats);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::app::tests::app_with;
    use crate::app::AppMode;
    use crate::testing::{database, query, session, FailWith, FakeBackend};

    #[tokio::test]
    async fn dashboard_counts_queries_from_session_details() {
        let mut first = session(1, "a", 1);
        first.queries = vec![query(1, "p", ""), query(2, "q", "")];
        first.queries[1].success = false;
        let backend = FakeBackend::default()
            .with_databases(vec![database(1, "shop"), database(2, "crm")])
            .with_sessions(vec![first, session(2, "b", 2)]);
        let (mut app, backend) = app_with(backend);

        app.navigate(AppMode::Dashboard).await;

        let stats = app.dashboard.clone().unwrap();
        assert_eq!(app.mode, AppMode::Dashboard);
        assert_eq!(stats.databases, 2);
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.success_rate(), 50.0);
        assert_eq!(backend.calls("get_session"), 2);
    }

    #[tokio::test]
    async fn usage_failure_leaves_usage_empty() {
        let (mut app, backend) = app_with(FakeBackend::default());
        backend.fail("token_usage", FailWith::Server);

        app.load_dashboard().await.unwrap();

        assert!(app.dashboard.unwrap().usage.is_empty());
    }
}
