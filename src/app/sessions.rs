use tracing::info;

use crate::api::models::{DatabaseRef, Session};
use crate::app::{step, App, AppMode};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_SESSION_TITLE: &str = "New Session";

#[derive(Debug, Clone, Default)]
pub struct SessionList {
    pub items: Vec<Session>,
    pub selected: usize,
    /// Session shown on the query screen.
    pub active: Option<i64>,
}

impl SessionList {
    pub fn up(&mut self) {
        self.selected = step(self.selected, self.items.len(), false);
    }

    pub fn down(&mut self) {
        self.selected = step(self.selected, self.items.len(), true);
    }

    pub fn current(&self) -> Option<&Session> {
        self.items.get(self.selected)
    }

    fn clamp(&mut self) {
        self.selected = self.selected.min(self.items.len().saturating_sub(1));
    }
}

impl App {
    /// Sessions of the working database, or every session when none is chosen.
    pub async fn load_sessions(&mut self) -> ApiResult<()> {
        let database_id = self.selected_database().map(|d| d.id);
        self.sessions.items = self.backend().list_sessions(database_id).await?;
        if let Some(active) = self.sessions.active {
            if let Some(i) = self.sessions.items.iter().position(|s| s.id == active) {
                self.sessions.selected = i;
            }
        }
        self.sessions.clamp();
        Ok(())
    }

    pub async fn open_selected_session(&mut self) -> ApiResult<()> {
        let Some(id) = self.sessions.current().map(|s| s.id) else {
            return Ok(());
        };
        self.open_session(id).await;
        Ok(())
    }

    pub async fn open_session(&mut self, session_id: i64) {
        if self.sessions.active != Some(session_id) {
            self.query = Default::default();
        }
        self.sessions.active = Some(session_id);
        self.navigate(AppMode::Query).await;
    }

    pub async fn create_session(&mut self, title: &str) -> ApiResult<()> {
        let Some(database) = self.selected_database() else {
            return Err(ApiError::Validation(
                "Select a database before creating a session".to_string(),
            ));
        };
        let title = if title.trim().is_empty() {
            DEFAULT_SESSION_TITLE
        } else {
            title.trim()
        };

        let created = self
            .backend()
            .create_session(title, &DatabaseRef::from(&database))
            .await?;
        info!("Created session {} ({})", created.title, created.id);

        let id = created.id;
        self.sessions.items.insert(0, created);
        self.sessions.selected = 0;
        self.open_session(id).await;
        Ok(())
    }

    pub async fn rename_session(&mut self, title: &str) -> ApiResult<()> {
        let Some(id) = self.sessions.current().map(|s| s.id) else {
            return Ok(());
        };
        let renamed = self.backend().rename_session(id, title).await?;

        if let Some(item) = self.sessions.items.iter_mut().find(|s| s.id == id) {
            item.title = renamed.title.clone();
        }
        if let Some(open) = self.query.session.as_mut().filter(|s| s.id == id) {
            open.title = renamed.title;
        }
        Ok(())
    }

    /// Deletes the highlighted session. When it was the active one, the first
    /// remaining session becomes active.
    pub async fn delete_session(&mut self) -> ApiResult<()> {
        let Some(id) = self.sessions.current().map(|s| s.id) else {
            return Ok(());
        };
        self.backend().delete_session(id).await?;
        info!("Deleted session {}", id);

        self.sessions.items.retain(|s| s.id != id);
        self.sessions.clamp();

        if self.sessions.active == Some(id) {
            self.query = Default::default();
            self.sessions.active = self.sessions.items.first().map(|s| s.id);
            if self.sessions.active.is_some() {
                self.sessions.selected = 0;
                self.reload_session().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::store;
    use crate::testing::{database, session, FakeBackend};

    #[tokio::test]
    async fn deleting_active_session_selects_another() {
        let backend = FakeBackend::default()
            .with_databases(vec![database(1, "shop")])
            .with_sessions(vec![session(10, "first", 1), session(11, "second", 1)]);
        let (mut app, _backend) = app_with(backend);
        app.load_sessions().await.unwrap();
        app.open_session(10).await;
        assert_eq!(app.mode, AppMode::Query);
        app.sessions.selected = 0;

        app.delete_session().await.unwrap();

        assert_eq!(app.sessions.active, Some(11));
        assert_eq!(app.query.session.as_ref().map(|s| s.id), Some(11));
        assert_eq!(app.sessions.items.len(), 1);
    }

    #[tokio::test]
    async fn deleting_last_session_clears_active() {
        let (mut app, _backend) = app_with(FakeBackend::default().with_sessions(vec![session(10, "only", 1)]));
        app.load_sessions().await.unwrap();
        app.sessions.active = Some(10);

        app.delete_session().await.unwrap();

        assert_eq!(app.sessions.active, None);
        assert!(app.query.session.is_none());
    }

    #[tokio::test]
    async fn deleting_other_session_keeps_active() {
        let (mut app, _backend) = app_with(
            FakeBackend::default().with_sessions(vec![session(10, "a", 1), session(11, "b", 1)]),
        );
        app.load_sessions().await.unwrap();
        app.sessions.active = Some(10);
        app.sessions.selected = 1;

        app.delete_session().await.unwrap();

        assert_eq!(app.sessions.active, Some(10));
    }

    #[tokio::test]
    async fn create_requires_a_database() {
        let (mut app, backend) = app_with(FakeBackend::default());
        let err = app.create_session("x").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(backend.calls("create_session"), 0);
    }

    #[tokio::test]
    async fn create_uses_default_title_and_opens_it() {
        let (mut app, backend) = app_with(FakeBackend::default().with_databases(vec![database(1, "shop")]));
        store::lock(app.store()).select_database(Some(database(1, "shop"))).unwrap();

        app.create_session("  ").await.unwrap();

        let created = &backend.sessions()[0];
        assert_eq!(created.title, DEFAULT_SESSION_TITLE);
        assert_eq!(app.sessions.active, Some(created.id));
        assert_eq!(app.mode, AppMode::Query);
        assert_eq!(app.query.database.as_ref().map(|d| d.id), Some(1));
    }

    #[tokio::test]
    async fn list_is_scoped_to_selected_database() {
        let (mut app, _backend) = app_with(
            FakeBackend::default().with_sessions(vec![session(1, "a", 1), session(2, "b", 2)]),
        );
        store::lock(app.store()).select_database(Some(database(2, "crm"))).unwrap();
        app.load_sessions().await.unwrap();
        assert_eq!(app.sessions.items.len(), 1);
        assert_eq!(app.sessions.items[0].id, 2);
    }

    #[tokio::test]
    async fn rename_updates_list_and_open_session() {
        let (mut app, _backend) = app_with(FakeBackend::default().with_sessions(vec![session(5, "old", 1)]));
        app.load_sessions().await.unwrap();
        app.open_session(5).await;

        app.rename_session("Revenue").await.unwrap();

        assert_eq!(app.sessions.items[0].title, "Revenue");
        assert_eq!(app.query.session.as_ref().map(|s| s.title.as_str()), Some("Revenue"));
    }
}
