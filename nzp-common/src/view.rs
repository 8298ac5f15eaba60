//! View controller
//!
//! Owns the process-wide catalog snapshot and re-runs the filter engine
//! whenever the visible result may have changed:
//! - search or genre input changed
//! - page navigation
//! - live-query push (full snapshot replace)
//! - a mutation landed and its replacement snapshot arrived
//!
//! There is no debouncing; every trigger is a full re-filter.
//!
//! The snapshot has a single writer (the live-query consumer). Readers clone
//! the `Arc` under a short read lock and never observe a partial update.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info};

use crate::events::{EventBus, SiteEvent};
use crate::filter::{genre_options, select_owned, select_visible, CatalogPage, Page};
use crate::models::ScenepackEntry;
use crate::session::AuthState;
use crate::store::CatalogUpdate;

/// Immutable catalog contents at one revision
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// Bumped on every replacement; 0 until the first push arrives
    pub revision: u64,
    pub entries: Arc<Vec<ScenepackEntry>>,
}

/// Search and genre inputs of one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UIFilterState {
    pub search: String,
    /// `None` or empty string: no genre restriction
    pub genre: Option<String>,
}

/// Result of one filter run
#[derive(Debug, Clone, Serialize)]
pub struct PageRender {
    pub page: Page,
    pub entries: Vec<ScenepackEntry>,
    pub genre_options: Vec<String>,
    /// No entries to show; the UI renders its empty state
    pub empty: bool,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardView {
    Owned(PageRender),
    /// Caller is not an authenticated role holder
    LoginPrompt { login_url: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum View {
    Catalog(PageRender),
    Dashboard(DashboardView),
}

/// Page and per-page inputs of one browser tab
#[derive(Debug, Clone)]
pub struct Viewport {
    page: Page,
    inputs: HashMap<CatalogPage, UIFilterState>,
}

impl Viewport {
    pub fn new(page: Page) -> Self {
        Self {
            page,
            inputs: HashMap::new(),
        }
    }

    /// Open `page` with the given inputs already filled in
    pub fn with_filter(page: Page, filter: UIFilterState) -> Self {
        let mut viewport = Self::new(page);
        if let Page::Catalog(p) = page {
            viewport.inputs.insert(p, filter);
        }
        viewport
    }

    pub fn page(&self) -> Page {
        self.page
    }

    /// Inputs of the current page; the dashboard has none
    pub fn filter(&self) -> UIFilterState {
        match self.page {
            Page::Catalog(p) => self.inputs.get(&p).cloned().unwrap_or_default(),
            Page::Dashboard => UIFilterState::default(),
        }
    }

    /// Switch pages; each page keeps its own inputs
    pub fn navigate(&mut self, page: Page) {
        self.page = page;
    }

    pub fn set_search(&mut self, text: &str) {
        if let Some(state) = self.current_inputs() {
            state.search = text.to_string();
        }
    }

    pub fn set_genre(&mut self, genre: Option<&str>) {
        if let Some(state) = self.current_inputs() {
            state.genre = genre.map(str::to_string);
        }
    }

    fn current_inputs(&mut self) -> Option<&mut UIFilterState> {
        match self.page {
            Page::Catalog(p) => Some(self.inputs.entry(p).or_default()),
            Page::Dashboard => None,
        }
    }
}

pub struct ViewController {
    snapshot: RwLock<Arc<CatalogSnapshot>>,
    events: EventBus,
    login_url: String,
}

impl ViewController {
    pub fn new(events: EventBus, login_url: impl Into<String>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(CatalogSnapshot::default())),
            events,
            login_url: login_url.into(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Current snapshot; cheap to clone and never mutated in place
    pub async fn snapshot(&self) -> Arc<CatalogSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Swap in a new full entry list and announce it
    pub async fn replace_snapshot(&self, entries: Arc<Vec<ScenepackEntry>>) -> u64 {
        let entry_count = entries.len();
        let revision = {
            let mut guard = self.snapshot.write().await;
            let revision = guard.revision + 1;
            *guard = Arc::new(CatalogSnapshot { revision, entries });
            revision
        };

        debug!("Catalog snapshot r{} ({} entries)", revision, entry_count);
        self.events.emit_lossy(SiteEvent::CatalogReplaced {
            revision,
            entry_count,
            timestamp: chrono::Utc::now(),
        });
        revision
    }

    /// Handle one live-query delivery
    pub async fn apply_update(&self, update: CatalogUpdate) {
        match update {
            CatalogUpdate::Pending => {}
            CatalogUpdate::Snapshot(entries) => {
                self.replace_snapshot(entries).await;
            }
            CatalogUpdate::Error(message) => {
                error!("Catalog live query error: {}", message);
                self.events.emit_lossy(SiteEvent::CatalogError {
                    message,
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    /// Consume the store's live query until the store goes away
    pub async fn run_live_query(self: Arc<Self>, mut rx: watch::Receiver<CatalogUpdate>) {
        info!("Catalog live query attached");
        loop {
            let update = rx.borrow_and_update().clone();
            self.apply_update(update).await;
            if rx.changed().await.is_err() {
                info!("Catalog live query closed");
                break;
            }
        }
    }

    /// Entry by id in the current snapshot
    pub async fn find(&self, id: &str) -> Option<ScenepackEntry> {
        self.snapshot()
            .await
            .entries
            .iter()
            .find(|e| e.id == id)
            .cloned()
    }

    /// Filter the current snapshot for a catalog page
    pub async fn render(&self, page: CatalogPage, filter: &UIFilterState) -> PageRender {
        let snapshot = self.snapshot().await;
        let entries = select_visible(
            &snapshot.entries,
            page,
            &filter.search,
            filter.genre.as_deref(),
        );
        debug!(
            "Rendered {} r{}: {} of {} entries",
            page.as_str(),
            snapshot.revision,
            entries.len(),
            snapshot.entries.len()
        );

        PageRender {
            page: Page::Catalog(page),
            empty: entries.is_empty(),
            genre_options: genre_options(&snapshot.entries, page),
            entries,
            revision: snapshot.revision,
        }
    }

    /// Owned entries for a role holder, login prompt for everyone else
    pub async fn dashboard(&self, auth: &AuthState) -> DashboardView {
        let Some(session) = auth.dashboard_session() else {
            return DashboardView::LoginPrompt {
                login_url: self.login_url.clone(),
            };
        };

        let snapshot = self.snapshot().await;
        let entries = select_owned(&snapshot.entries, &session.id);
        DashboardView::Owned(PageRender {
            page: Page::Dashboard,
            empty: entries.is_empty(),
            genre_options: Vec::new(),
            entries,
            revision: snapshot.revision,
        })
    }

    /// Render whatever the viewport currently shows
    pub async fn show(&self, viewport: &Viewport, auth: &AuthState) -> View {
        match viewport.page() {
            Page::Catalog(page) => View::Catalog(self.render(page, &viewport.filter()).await),
            Page::Dashboard => View::Dashboard(self.dashboard(auth).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;
    use crate::session::AuthSession;
    use crate::store::{CatalogStore, MemoryCatalogStore};
    use crate::EntryFields;
    use std::time::Duration;

    fn entry(id: &str, name: &str, genre: &str, creator: &str) -> ScenepackEntry {
        ScenepackEntry {
            id: id.to_string(),
            name: name.to_string(),
            entry_type: EntryType::Movie,
            genre: Some(genre.to_string()),
            url: "https://example.com".to_string(),
            image_url: None,
            creator_id: creator.to_string(),
        }
    }

    fn catalog() -> Arc<Vec<ScenepackEntry>> {
        Arc::new(vec![
            entry("1", "Zeta", "Action", "u1"),
            entry("2", "Alpha", "Drama", "u2"),
        ])
    }

    fn authenticated(id: &str, role_flag: bool) -> AuthState {
        AuthState::Authenticated(AuthSession {
            id: id.to_string(),
            username: id.to_string(),
            pfp: String::new(),
            role_flag,
            anonymous: false,
        })
    }

    fn names(view: &View) -> Vec<String> {
        let render = match view {
            View::Catalog(r) | View::Dashboard(DashboardView::Owned(r)) => r,
            View::Dashboard(DashboardView::LoginPrompt { .. }) => return Vec::new(),
        };
        render.entries.iter().map(|e| e.name.clone()).collect()
    }

    const MOVIES: Page = Page::Catalog(CatalogPage::Typed(EntryType::Movie));

    #[tokio::test]
    async fn test_empty_before_first_push() {
        let view = ViewController::new(EventBus::new(10), "https://login");
        let render = view.render(CatalogPage::Home, &UIFilterState::default()).await;
        assert!(render.empty);
        assert_eq!(render.revision, 0);
    }

    #[tokio::test]
    async fn test_input_changes_rerun_filter() {
        let view = ViewController::new(EventBus::new(10), "https://login");
        view.replace_snapshot(catalog()).await;
        let anon = AuthState::Unauthenticated;

        let mut viewport = Viewport::new(MOVIES);
        assert_eq!(names(&view.show(&viewport, &anon).await), vec!["Alpha", "Zeta"]);

        viewport.set_genre(Some("Action"));
        assert_eq!(names(&view.show(&viewport, &anon).await), vec!["Zeta"]);

        viewport.set_genre(Some(""));
        viewport.set_search("alp");
        assert_eq!(names(&view.show(&viewport, &anon).await), vec!["Alpha"]);

        // Navigation keeps each page's own inputs
        viewport.navigate(Page::Catalog(CatalogPage::Home));
        assert_eq!(names(&view.show(&viewport, &anon).await).len(), 2);
        viewport.navigate(MOVIES);
        assert_eq!(viewport.filter().search, "alp");
    }

    #[tokio::test]
    async fn test_dashboard_shows_only_own_entries() {
        let view = ViewController::new(EventBus::new(10), "https://login");
        view.replace_snapshot(catalog()).await;

        let mut viewport = Viewport::new(Page::Dashboard);
        viewport.set_search("Alpha");
        let shown = view.show(&viewport, &authenticated("u1", true)).await;
        assert_eq!(names(&shown), vec!["Zeta"]);
    }

    #[tokio::test]
    async fn test_dashboard_without_role_prompts_login() {
        let view = ViewController::new(EventBus::new(10), "https://login");
        view.replace_snapshot(catalog()).await;

        for auth in [
            AuthState::Uninitialized,
            AuthState::Unauthenticated,
            authenticated("u1", false),
        ] {
            match view.dashboard(&auth).await {
                DashboardView::LoginPrompt { login_url } => assert_eq!(login_url, "https://login"),
                other => panic!("expected login prompt for {:?}, got {:?}", auth, other),
            }
        }
    }

    #[tokio::test]
    async fn test_replacement_bumps_revision_and_announces() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let view = ViewController::new(bus, "https://login");

        assert_eq!(view.replace_snapshot(catalog()).await, 1);
        assert_eq!(view.replace_snapshot(Arc::new(Vec::new())).await, 2);

        match rx.recv().await.unwrap() {
            SiteEvent::CatalogReplaced { revision, entry_count, .. } => {
                assert_eq!((revision, entry_count), (1, 2));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(view.find("1").await.is_none());
    }

    #[tokio::test]
    async fn test_live_error_keeps_previous_snapshot() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let view = ViewController::new(bus, "https://login");
        view.replace_snapshot(catalog()).await;
        let _ = rx.recv().await;

        view.apply_update(CatalogUpdate::Error("offline".to_string())).await;
        assert!(matches!(rx.recv().await.unwrap(), SiteEvent::CatalogError { .. }));
        assert_eq!(view.snapshot().await.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_mutation_visible_after_push() {
        let store = Arc::new(MemoryCatalogStore::default());
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let view = Arc::new(ViewController::new(bus, "https://login"));
        tokio::spawn(view.clone().run_live_query(store.subscribe()));

        // Initial empty snapshot
        let _ = rx.recv().await.unwrap();

        store
            .add(
                &EntryFields {
                    name: "Heat".to_string(),
                    entry_type: EntryType::Movie,
                    genre: None,
                    url: "https://example.com/heat".to_string(),
                    image_url: None,
                },
                "u1",
            )
            .await
            .unwrap();

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("push delivered")
            .unwrap();
        assert!(matches!(event, SiteEvent::CatalogReplaced { entry_count: 1, .. }));

        let render = view.render(CatalogPage::Home, &UIFilterState::default()).await;
        assert_eq!(render.entries[0].name, "Heat");
    }
}
