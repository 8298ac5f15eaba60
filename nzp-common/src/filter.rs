//! Page filter engine
//!
//! Computes the visible subset of the catalog for a page and the current
//! search/genre inputs. Pure functions over a borrowed snapshot; nothing here
//! mutates the catalog.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{EntryType, ScenepackEntry};
use crate::normalize::{normalize, normalize_opt};
use crate::{Error, Result};

/// Pages that render a filtered slice of the public catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogPage {
    /// Landing page: name search only
    Home,
    /// Every type, with a genre filter over all genres
    AllTypes,
    /// One category, with a genre filter over that category's genres
    Typed(EntryType),
}

/// Every navigable page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Catalog(CatalogPage),
    /// Creator's own entries; gated on the session role flag
    Dashboard,
}

impl CatalogPage {
    /// Identifier used in URLs
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogPage::Home => "home",
            CatalogPage::AllTypes => "all",
            CatalogPage::Typed(EntryType::Movie) => "movies",
            CatalogPage::Typed(EntryType::Game) => "games",
            CatalogPage::Typed(EntryType::Tvshow) => "tvshows",
            CatalogPage::Typed(EntryType::Anime) => "anime",
        }
    }

    /// Whether the page offers a genre selector
    pub fn has_genre_filter(&self) -> bool {
        !matches!(self, CatalogPage::Home)
    }

    fn admits(&self, entry: &ScenepackEntry) -> bool {
        match self {
            CatalogPage::Home | CatalogPage::AllTypes => true,
            CatalogPage::Typed(t) => entry.entry_type == *t,
        }
    }
}

impl Page {
    pub fn as_str(&self) -> &'static str {
        match self {
            Page::Catalog(page) => page.as_str(),
            Page::Dashboard => "dashboard",
        }
    }
}

impl FromStr for Page {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let page = match s {
            "home" => Page::Catalog(CatalogPage::Home),
            "all" => Page::Catalog(CatalogPage::AllTypes),
            "movies" => Page::Catalog(CatalogPage::Typed(EntryType::Movie)),
            "games" => Page::Catalog(CatalogPage::Typed(EntryType::Game)),
            "tvshows" => Page::Catalog(CatalogPage::Typed(EntryType::Tvshow)),
            "anime" => Page::Catalog(CatalogPage::Typed(EntryType::Anime)),
            "dashboard" => Page::Dashboard,
            other => return Err(Error::InvalidInput(format!("Unknown page: {}", other))),
        };
        Ok(page)
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Page {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Visible entries for a catalog page, sorted by name
///
/// An empty search text matches every name. An empty or missing genre means
/// no genre restriction; Home ignores the genre input entirely.
pub fn select_visible(
    entries: &[ScenepackEntry],
    page: CatalogPage,
    search_text: &str,
    selected_genre: Option<&str>,
) -> Vec<ScenepackEntry> {
    let query = normalize(search_text);
    let genre = selected_genre
        .filter(|_| page.has_genre_filter())
        .map(normalize)
        .filter(|g| !g.is_empty());

    let mut visible: Vec<ScenepackEntry> = entries
        .iter()
        .filter(|e| page.admits(e))
        .filter(|e| query.is_empty() || normalize(&e.name).contains(&query))
        .filter(|e| match &genre {
            Some(g) => normalize_opt(e.genre.as_deref()) == *g,
            None => true,
        })
        .cloned()
        .collect();

    sort_by_name(&mut visible);
    visible
}

/// Entries created by `identity`, sorted by name
pub fn select_owned(entries: &[ScenepackEntry], identity: &str) -> Vec<ScenepackEntry> {
    let mut owned: Vec<ScenepackEntry> = entries
        .iter()
        .filter(|e| e.creator_id == identity)
        .cloned()
        .collect();
    sort_by_name(&mut owned);
    owned
}

/// Genre selector options for a page
///
/// Distinct non-empty genre values, compared case-sensitively, in alphabetical
/// order. AllTypes collects across every entry; a typed page only across its
/// own type. Home has no selector and yields nothing.
pub fn genre_options(entries: &[ScenepackEntry], page: CatalogPage) -> Vec<String> {
    if !page.has_genre_filter() {
        return Vec::new();
    }

    let distinct: BTreeSet<&str> = entries
        .iter()
        .filter(|e| page.admits(e))
        .filter_map(|e| e.genre.as_deref())
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect();

    distinct.into_iter().map(str::to_string).collect()
}

/// Base letters of `name`, lowercased: accents and case do not order
fn collation_key(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Ascending name order on base letters, then accents, then case
pub fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}

fn sort_by_name(entries: &mut [ScenepackEntry]) {
    entries.sort_by(|a, b| compare_names(&a.name, &b.name));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, t: EntryType, genre: Option<&str>, creator: &str) -> ScenepackEntry {
        ScenepackEntry {
            id: id.to_string(),
            name: name.to_string(),
            entry_type: t,
            genre: genre.map(str::to_string),
            url: format!("https://example.com/{}", id),
            image_url: None,
            creator_id: creator.to_string(),
        }
    }

    fn catalog() -> Vec<ScenepackEntry> {
        vec![
            entry("1", "Zeta", EntryType::Movie, Some("Action"), "u1"),
            entry("2", "Alpha", EntryType::Movie, Some("Drama"), "u2"),
        ]
    }

    fn names(entries: &[ScenepackEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    const MOVIES: CatalogPage = CatalogPage::Typed(EntryType::Movie);

    #[test]
    fn test_movies_page_sorted_by_name() {
        let visible = select_visible(&catalog(), MOVIES, "", Some(""));
        assert_eq!(names(&visible), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn test_movies_page_genre_filter() {
        let visible = select_visible(&catalog(), MOVIES, "", Some("Action"));
        assert_eq!(names(&visible), vec!["Zeta"]);

        // Genre equality is normalized
        let visible = select_visible(&catalog(), MOVIES, "", Some("  action "));
        assert_eq!(names(&visible), vec!["Zeta"]);
    }

    #[test]
    fn test_dashboard_selection_ignores_search_state() {
        let owned = select_owned(&catalog(), "u1");
        assert_eq!(names(&owned), vec!["Zeta"]);
        assert!(select_owned(&catalog(), "nobody").is_empty());
    }

    #[test]
    fn test_home_matches_normalized_name_and_ignores_genre() {
        let entries = vec![
            entry("1", "The Matrix: Reloaded", EntryType::Movie, Some("Sci-Fi"), "u1"),
            entry("2", "Naruto", EntryType::Anime, Some("Action"), "u1"),
        ];
        let visible = select_visible(&entries, CatalogPage::Home, "matrix reloaded", None);
        assert_eq!(names(&visible), vec!["The Matrix: Reloaded"]);

        let visible = select_visible(&entries, CatalogPage::Home, "", Some("Action"));
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn test_typed_page_excludes_other_types() {
        let mut entries = catalog();
        entries.push(entry("3", "Beta", EntryType::Game, Some("Action"), "u1"));

        let visible = select_visible(&entries, MOVIES, "", None);
        assert!(visible.iter().all(|e| e.entry_type == EntryType::Movie));

        let visible = select_visible(&entries, CatalogPage::AllTypes, "", Some("Action"));
        assert_eq!(names(&visible), vec!["Beta", "Zeta"]);
    }

    #[test]
    fn test_empty_catalog_yields_empty_result() {
        assert!(select_visible(&[], CatalogPage::AllTypes, "", None).is_empty());
        assert!(genre_options(&[], CatalogPage::AllTypes).is_empty());
    }

    #[test]
    fn test_genre_options_scoped_by_page() {
        let entries = vec![
            entry("1", "A", EntryType::Movie, Some("Drama"), "u1"),
            entry("2", "B", EntryType::Movie, Some("Action"), "u1"),
            entry("3", "C", EntryType::Game, Some("action"), "u1"),
            entry("4", "D", EntryType::Game, Some("  "), "u1"),
            entry("5", "E", EntryType::Anime, None, "u1"),
            entry("6", "F", EntryType::Movie, Some("Drama"), "u1"),
        ];

        assert_eq!(genre_options(&entries, MOVIES), vec!["Action", "Drama"]);
        assert_eq!(
            genre_options(&entries, CatalogPage::Typed(EntryType::Game)),
            vec!["action"]
        );
        assert!(genre_options(&entries, CatalogPage::Typed(EntryType::Anime)).is_empty());
        // Union across types, case-sensitive distinct
        assert_eq!(
            genre_options(&entries, CatalogPage::AllTypes),
            vec!["Action", "Drama", "action"]
        );
        assert!(genre_options(&entries, CatalogPage::Home).is_empty());
    }

    #[test]
    fn test_sort_is_case_folded() {
        let entries = vec![
            entry("1", "beta", EntryType::Movie, None, "u1"),
            entry("2", "Alpha", EntryType::Movie, None, "u1"),
            entry("3", "Gamma", EntryType::Movie, None, "u1"),
        ];
        let visible = select_visible(&entries, CatalogPage::Home, "", None);
        assert_eq!(names(&visible), vec!["Alpha", "beta", "Gamma"]);
    }

    #[test]
    fn test_accented_names_sort_with_base_letter() {
        let entries = vec![
            entry("1", "Zelda", EntryType::Game, None, "u1"),
            entry("2", "Élite", EntryType::Game, None, "u1"),
            entry("3", "Amélie", EntryType::Movie, None, "u1"),
            entry("4", "Amelia", EntryType::Movie, None, "u1"),
        ];
        let visible = select_visible(&entries, CatalogPage::AllTypes, "", None);
        assert_eq!(names(&visible), vec!["Amelia", "Amélie", "Élite", "Zelda"]);
    }

    #[test]
    fn test_unaccented_name_sorts_before_accented_twin() {
        assert_eq!(compare_names("Resume", "Résumé"), Ordering::Less);
        assert_eq!(compare_names("résumé", "Résumé"), Ordering::Greater);
        assert_eq!(compare_names("Élan", "elan"), Ordering::Greater);
    }

    #[test]
    fn test_page_identifiers_round_trip() {
        for id in ["home", "all", "movies", "games", "tvshows", "anime", "dashboard"] {
            let page: Page = id.parse().unwrap();
            assert_eq!(page.as_str(), id);
        }
        assert!("shorts".parse::<Page>().is_err());
    }
}
