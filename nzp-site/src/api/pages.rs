//! Catalog pages and the creator dashboard
//!
//! Each request runs one filter pass over the current snapshot, then probes
//! the card images of the result concurrently.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use nzp_common::filter::{genre_options, Page};
use nzp_common::images::{resolve_cards, Card};
use nzp_common::view::{DashboardView, PageRender, UIFilterState, View, Viewport};
use nzp_common::Error;
use serde::{Deserialize, Serialize};

use super::{ApiError, CurrentSession};
use crate::AppState;

/// Query parameters for a catalog page
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    /// Search text
    #[serde(default)]
    pub q: Option<String>,
    /// Exact genre; empty means all genres
    #[serde(default)]
    pub genre: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageResponse {
    pub page: Page,
    pub revision: u64,
    pub empty: bool,
    pub genre_options: Vec<String>,
    pub cards: Vec<Card>,
}

#[derive(Debug, Serialize)]
pub struct GenresResponse {
    pub page: Page,
    pub genres: Vec<String>,
}

async fn into_response(state: &AppState, render: PageRender) -> PageResponse {
    let cards = resolve_cards(
        state.images.as_ref(),
        render.entries,
        state.settings.image_timeout,
        &state.settings.placeholder_url,
    )
    .await;

    PageResponse {
        page: render.page,
        revision: render.revision,
        empty: render.empty,
        genre_options: render.genre_options,
        cards,
    }
}

async fn show(
    state: &AppState,
    viewport: &Viewport,
    current: &CurrentSession,
) -> Result<PageResponse, ApiError> {
    match state.view.show(viewport, &current.auth()).await {
        View::Catalog(render) | View::Dashboard(DashboardView::Owned(render)) => {
            Ok(into_response(state, render).await)
        }
        View::Dashboard(DashboardView::LoginPrompt { login_url }) => {
            Err(ApiError::LoginRequired { login_url })
        }
    }
}

/// GET /api/pages/:page?q=&genre=
///
/// `page` is one of `home`, `all`, `movies`, `games`, `tvshows`, `anime`
/// or `dashboard`.
pub async fn get_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<PageResponse>, ApiError> {
    let page: Page = page.parse()?;
    let filter = UIFilterState {
        search: query.q.unwrap_or_default(),
        genre: query.genre,
    };

    let viewport = Viewport::with_filter(page, filter);
    Ok(Json(show(&state, &viewport, &current).await?))
}

/// GET /api/pages/:page/genres
pub async fn get_genres(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Json<GenresResponse>, ApiError> {
    let page: Page = page.parse()?;
    let Page::Catalog(catalog_page) = page else {
        return Err(Error::InvalidInput("dashboard has no genre filter".to_string()).into());
    };

    let snapshot = state.view.snapshot().await;
    Ok(Json(GenresResponse {
        page,
        genres: genre_options(&snapshot.entries, catalog_page),
    }))
}

/// GET /api/dashboard
///
/// Entries created by the signed-in creator. Sessions without the role get
/// 401 with the login URL.
pub async fn get_dashboard(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> Result<Json<PageResponse>, ApiError> {
    let viewport = Viewport::new(Page::Dashboard);
    Ok(Json(show(&state, &viewport, &current).await?))
}
