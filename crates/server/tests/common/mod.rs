//! Server test utilities.

use axum::Router;
use granary_core::config::{AppConfig, MetadataConfig};
use granary_server::{AppState, build_state, create_router};
use tempfile::TempDir;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server on in-memory part stores and a temporary
    /// SQLite metadata database.
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp directory");

        let mut config = AppConfig::for_testing();
        config.metadata = MetadataConfig::Sqlite {
            path: temp_dir.path().join("metadata.db"),
        };

        let state = build_state(config).await.expect("failed to build state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }
}
