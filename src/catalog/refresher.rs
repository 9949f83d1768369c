use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;

use crate::catalog::loader::{load_catalog, Catalog, CatalogState};
use crate::catalog::source::{open_sources, SourceConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshParams {
    pub sources: Vec<SourceConfig>,
    pub interval: Duration,
}

struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Periodically reloads the catalog into shared state. Sources are re-read on
/// every tick, so file sources pick up edits without a restart.
pub struct CatalogRefresher {
    worker: Option<WorkerHandle>,
}

impl CatalogRefresher {
    pub fn start(
        params: RefreshParams,
        state: Arc<RwLock<CatalogState>>,
        client: reqwest::Client,
    ) -> Self {
        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_refresh_loop(state, client, params, stop_rx));

        Self {
            worker: Some(WorkerHandle { stop_tx, join }),
        }
    }

    pub async fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            let _ = worker.join.await;
        }
    }
}

pub async fn refresh_once(sources: &[SourceConfig], client: &reqwest::Client) -> Catalog {
    let sources = open_sources(sources, client);
    load_catalog(&sources).await
}

async fn run_refresh_loop(
    state: Arc<RwLock<CatalogState>>,
    client: reqwest::Client,
    params: RefreshParams,
    mut stop_rx: oneshot::Receiver<()>,
) {
    loop {
        let catalog = refresh_once(&params.sources, &client).await;
        log::info!(
            "Catalog refreshed: {} satellites, {} failed sources",
            catalog.len(),
            catalog.failed_sources().len()
        );
        *state.write().await = CatalogState::Ready(Arc::new(catalog));

        let should_stop = tokio::select! {
            _ = tokio::time::sleep(params.interval) => false,
            _ = &mut stop_rx => true,
        };
        if should_stop {
            log::debug!("Catalog refresher stopped");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::source::SourceLocation;
    use crate::predict::tle::tests::synthetic_record;
    use std::path::Path;

    fn params(dir: &Path) -> RefreshParams {
        RefreshParams {
            sources: vec![SourceConfig {
                category: "local".to_string(),
                location: SourceLocation::Path(dir.to_path_buf()),
                max_count: None,
            }],
            interval: Duration::from_millis(20),
        }
    }

    async fn wait_for_len(state: &Arc<RwLock<CatalogState>>, len: usize) -> bool {
        for _ in 0..300 {
            if let Some(catalog) = state.read().await.catalog() {
                if catalog.len() == len {
                    return true;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn refresher_picks_up_source_changes() {
        let dir = tempfile::tempdir().unwrap();
        let two: String = (1..3).map(|i| synthetic_record("A", i)).collect();
        let three: String = (5..8).map(|i| synthetic_record("B", i)).collect();
        std::fs::write(dir.path().join("a.tle"), two).unwrap();

        let state = Arc::new(RwLock::new(CatalogState::Loading));
        let mut refresher =
            CatalogRefresher::start(params(dir.path()), state.clone(), reqwest::Client::new());

        assert!(wait_for_len(&state, 2).await);
        std::fs::write(dir.path().join("b.tle"), three).unwrap();
        assert!(wait_for_len(&state, 5).await);

        refresher.stop().await;
        assert!(refresher.worker.is_none());
    }
}
