use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;

use crate::catalog::source::{SourceConfig, TleSource};
use crate::predict::tle::{parse_tle_text, OrbitalElementSet};
use crate::predict::{CompiledOrbit, OrbitCache, OrbitKey};

/// One satellite in the catalog, tagged with the category of the feed it came from.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogEntry {
    pub elements: OrbitalElementSet,
    pub category: String,
}

/// In-memory satellite catalog. Orbits are compiled once at load time and the whole
/// arena is dropped when a refreshed catalog replaces this one.
#[derive(Debug)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    orbits: OrbitCache,
    loaded_at: DateTime<Utc>,
    failed_sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        let mut orbits = OrbitCache::new();
        for entry in &entries {
            if let Err(e) = orbits.get_or_compile(&entry.elements) {
                log::warn!(
                    "Satellite {} ({}) has unusable elements: {}",
                    entry.elements.name,
                    entry.elements.catalog_number,
                    e
                );
            }
        }

        Self {
            entries,
            orbits,
            loaded_at: Utc::now(),
            failed_sources: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Entries under the display cap. Applied at read time so changing the cap never
    /// needs a refetch.
    pub fn display(&self, max: Option<usize>) -> &[CatalogEntry] {
        match max {
            Some(max) if max < self.entries.len() => &self.entries[..max],
            _ => &self.entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose elements survived SGP4 initialisation.
    pub fn propagatable(&self) -> usize {
        self.orbits.len()
    }

    pub fn find(&self, catalog_number: &str) -> Option<&CatalogEntry> {
        let wanted = catalog_number.trim();
        self.entries.iter().find(|e| {
            e.elements.catalog_number == wanted
                || (e.elements.norad_id().is_some()
                    && e.elements.norad_id() == wanted.parse::<u32>().ok())
        })
    }

    /// Compiled orbit for an entry; `None` when its elements failed SGP4 initialisation.
    pub fn orbit(&self, entry: &CatalogEntry) -> Option<Arc<CompiledOrbit>> {
        self.orbits.get(&OrbitKey::of(&entry.elements))
    }

    pub fn categories(&self) -> Vec<CategoryCount> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.category.as_str()).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn failed_sources(&self) -> &[String] {
        &self.failed_sources
    }
}

/// Fetch every source in turn and merge the results. A failing source is logged and
/// skipped; the others still contribute.
pub async fn load_catalog(sources: &[(SourceConfig, Box<dyn TleSource>)]) -> Catalog {
    let mut entries = Vec::new();
    let mut per_category: HashMap<String, usize> = HashMap::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut failed = Vec::new();

    for (config, source) in sources {
        let text = match source.fetch().await {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "Skipping {} source {}: {}",
                    config.category,
                    source.describe(),
                    e
                );
                failed.push(source.describe());
                continue;
            }
        };

        let sets = parse_tle_text(&text);
        log::debug!(
            "Parsed {} element sets from {}",
            sets.len(),
            source.describe()
        );
        let added = merge_source(&mut entries, &mut per_category, &mut seen, config, sets);
        log::info!(
            "Loaded {} satellites for category {} from {}",
            added,
            config.category,
            source.describe()
        );
    }

    if entries.is_empty() {
        log::warn!("Catalog is empty after loading {} sources", sources.len());
    }

    let mut catalog = Catalog::new(entries);
    catalog.failed_sources = failed;
    catalog
}

fn merge_source(
    entries: &mut Vec<CatalogEntry>,
    per_category: &mut HashMap<String, usize>,
    seen: &mut HashSet<String>,
    config: &SourceConfig,
    sets: Vec<OrbitalElementSet>,
) -> usize {
    let mut added = 0;
    for set in sets {
        let count = per_category.entry(config.category.clone()).or_default();
        if config.max_count.is_some_and(|max| *count >= max) {
            break;
        }
        if !seen.insert(set.catalog_number.clone()) {
            continue;
        }
        *count += 1;
        added += 1;
        entries.push(CatalogEntry {
            elements: set,
            category: config.category.clone(),
        });
    }
    added
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Availability {
    Loading,
    Empty,
    Populated,
}

/// What the rest of the service sees of the catalog: nothing yet, or a loaded
/// (possibly empty) snapshot.
#[derive(Debug, Clone, Default)]
pub enum CatalogState {
    #[default]
    Loading,
    Ready(Arc<Catalog>),
}

impl CatalogState {
    pub fn availability(&self) -> Availability {
        match self {
            CatalogState::Loading => Availability::Loading,
            CatalogState::Ready(catalog) if catalog.is_empty() => Availability::Empty,
            CatalogState::Ready(_) => Availability::Populated,
        }
    }

    pub fn catalog(&self) -> Option<Arc<Catalog>> {
        match self {
            CatalogState::Loading => None,
            CatalogState::Ready(catalog) => Some(catalog.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::{FeedError, SourceLocation};
    use crate::predict::tle::tests::synthetic_record;
    use async_trait::async_trait;

    struct FakeSource {
        body: Result<String, u16>,
    }

    #[async_trait]
    impl TleSource for FakeSource {
        fn describe(&self) -> String {
            "fake".to_string()
        }

        async fn fetch(&self) -> Result<String, FeedError> {
            self.body.clone().map_err(FeedError::Status)
        }
    }

    fn source(
        category: &str,
        max_count: Option<usize>,
        body: Result<String, u16>,
    ) -> (SourceConfig, Box<dyn TleSource>) {
        (
            SourceConfig {
                category: category.to_string(),
                location: SourceLocation::Url(format!("https://example.invalid/{}", category)),
                max_count,
            },
            Box::new(FakeSource { body }),
        )
    }

    fn records(ids: std::ops::Range<u32>) -> String {
        ids.map(|id| synthetic_record(&format!("SAT {}", id), id)).collect()
    }

    #[tokio::test]
    async fn failing_source_does_not_stop_the_others() {
        let sources = vec![
            source("stations", None, Ok(records(1..3))),
            source("weather", None, Err(503)),
            source("science", None, Ok(records(10..13))),
        ];

        let catalog = load_catalog(&sources).await;
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.failed_sources().len(), 1);
        let categories: Vec<_> = catalog.entries().iter().map(|e| e.category.as_str()).collect();
        assert_eq!(
            categories,
            vec!["stations", "stations", "science", "science", "science"]
        );
    }

    #[tokio::test]
    async fn all_sources_failing_yields_empty_catalog() {
        let sources = vec![source("a", None, Err(500)), source("b", None, Err(404))];
        let catalog = load_catalog(&sources).await;
        assert!(catalog.is_empty());
        assert_eq!(
            CatalogState::Ready(Arc::new(catalog)).availability(),
            Availability::Empty
        );
    }

    #[tokio::test]
    async fn per_category_cap_spans_sources() {
        let sources = vec![
            source("amateur", Some(3), Ok(records(1..3))),
            source("amateur", Some(3), Ok(records(3..8))),
            source("gps", Some(1), Ok(records(20..24))),
        ];

        let catalog = load_catalog(&sources).await;
        let counts = catalog.categories();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].category, "amateur");
        assert_eq!(counts[0].count, 3);
        assert_eq!(counts[1].category, "gps");
        assert_eq!(counts[1].count, 1);
    }

    #[tokio::test]
    async fn duplicate_satellites_keep_first_category() {
        let sources = vec![
            source("stations", None, Ok(records(1..3))),
            source("visual", None, Ok(records(2..4))),
        ];
        let catalog = load_catalog(&sources).await;
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.find("00002").unwrap().category, "stations");
        assert_eq!(catalog.find("3").unwrap().category, "visual");
    }

    #[tokio::test]
    async fn display_cap_is_applied_at_read_time() {
        let sources = vec![source("all", None, Ok(records(1..11)))];
        let catalog = load_catalog(&sources).await;
        assert_eq!(catalog.display(Some(4)).len(), 4);
        assert_eq!(catalog.display(Some(40)).len(), 10);
        assert_eq!(catalog.display(None).len(), 10);
    }

    #[tokio::test]
    async fn entries_get_compiled_orbits() {
        let sources = vec![source("all", None, Ok(records(1..3)))];
        let catalog = load_catalog(&sources).await;
        for entry in catalog.entries() {
            assert!(catalog.orbit(entry).is_some());
        }
    }

    #[test]
    fn availability_tri_state() {
        assert_eq!(CatalogState::Loading.availability(), Availability::Loading);
        assert!(CatalogState::Loading.catalog().is_none());
        assert_eq!(Availability::Populated.to_string(), "populated");
    }
}
