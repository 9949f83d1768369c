mod loader;
mod refresher;
mod source;

pub use loader::{Availability, Catalog, CatalogEntry, CatalogState, CategoryCount};
pub use refresher::{refresh_once, CatalogRefresher, RefreshParams};
pub use source::{build_client, SourceConfig, SourceLocation};
