// ABOUTME: Test support utilities.
// ABOUTME: In-memory doubles for the engine, fetcher and GitHub, plus a registry harness over a temp dir.

use async_trait::async_trait;
use omk::config::{Paths, Settings};
use omk::engine::{ContainerEngine, EngineError, RemoveRequest, Workload};
use omk::registry::Registry;
use omk::source::{HookRegistration, SourceError, SourceFetcher, SourceHost, UserIdentity};
use omk::store::{
    AppStore, ApplicationRecord, BuildType, ContainerStatus, JsonFileStore, StoreError,
};
use omk::types::{AppName, Branch, GitHubRepo, SourceUrl};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("omk=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Settings with a short deploy wait so failing deploys finish quickly.
pub const FAST_SETTINGS: &str = "deploy_timeout: 500ms\npoll_interval: 10ms\n";

/// Container engine double keeping container state in memory.
#[derive(Default)]
pub struct FakeEngine {
    containers: Mutex<HashMap<AppName, ContainerStatus>>,
    builds: AtomicUsize,
    removals: Mutex<Vec<RemoveRequest>>,
    fail_build: AtomicBool,
    fail_remove: AtomicBool,
    fail_status: AtomicBool,
    /// Status containers report after `run_container`; `Running` unless overridden.
    started_status: Mutex<Option<ContainerStatus>>,
}

#[allow(dead_code)]
impl FakeEngine {
    pub fn fail_build(&self, fail: bool) {
        self.fail_build.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn fail_status(&self, fail: bool) {
        self.fail_status.store(fail, Ordering::SeqCst);
    }

    /// Make started containers report `status` instead of running.
    pub fn start_as(&self, status: ContainerStatus) {
        *self.started_status.lock().unwrap() = Some(status);
    }

    /// Change the observed status of an already running application.
    pub fn set_status(&self, app: &AppName, status: ContainerStatus) {
        self.containers.lock().unwrap().insert(app.clone(), status);
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn removals(&self) -> Vec<RemoveRequest> {
        self.removals.lock().unwrap().clone()
    }

    pub fn has_container(&self, app: &AppName) -> bool {
        self.containers.lock().unwrap().contains_key(app)
    }
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ping(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn build_image(&self, workload: &Workload) -> Result<(), EngineError> {
        if self.fail_build.load(Ordering::SeqCst) {
            return Err(EngineError::CommandFailed {
                operation: format!("build {}", workload.app),
                message: "exit status 1".to_string(),
            });
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn run_container(&self, workload: &Workload) -> Result<(), EngineError> {
        let status = self
            .started_status
            .lock()
            .unwrap()
            .unwrap_or(ContainerStatus::Running);
        self.containers
            .lock()
            .unwrap()
            .insert(workload.app.clone(), status);
        Ok(())
    }

    async fn container_status(
        &self,
        app: &AppName,
        _build_type: BuildType,
    ) -> Result<ContainerStatus, EngineError> {
        if self.fail_status.load(Ordering::SeqCst) {
            return Err(EngineError::Api("connection reset".to_string()));
        }
        Ok(self
            .containers
            .lock()
            .unwrap()
            .get(app)
            .copied()
            .unwrap_or(ContainerStatus::Unknown))
    }

    async fn remove(&self, request: &RemoveRequest) -> Result<(), EngineError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(EngineError::Api("device or resource busy".to_string()));
        }
        self.containers.lock().unwrap().remove(&request.app);
        self.removals.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// What the fake fetcher writes into a checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Layout {
    Dockerfile,
    Compose,
    Empty,
}

/// Source fetcher double that writes a manifest instead of cloning.
pub struct FakeFetcher {
    layout: Mutex<Layout>,
    fetches: AtomicUsize,
    fail: AtomicBool,
}

impl Default for FakeFetcher {
    fn default() -> Self {
        Self {
            layout: Mutex::new(Layout::Dockerfile),
            fetches: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }
}

#[allow(dead_code)]
impl FakeFetcher {
    pub fn set_layout(&self, layout: Layout) {
        *self.layout.lock().unwrap() = layout;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn fetch(
        &self,
        url: &SourceUrl,
        branch: &Branch,
        dest: &Path,
    ) -> Result<String, SourceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SourceError::Git {
                operation: "clone".to_string(),
                message: format!("repository '{}' not found", url),
            });
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);

        std::fs::create_dir_all(dest).unwrap();
        for stale in ["Dockerfile", "compose.yaml"] {
            let _ = std::fs::remove_file(dest.join(stale));
        }
        let layout = *self.layout.lock().unwrap();
        match layout {
            Layout::Dockerfile => {
                std::fs::write(dest.join("Dockerfile"), "FROM scratch\n").unwrap()
            }
            Layout::Compose => std::fs::write(
                dest.join("compose.yaml"),
                "services:\n  web:\n    build: .\n",
            )
            .unwrap(),
            Layout::Empty => {}
        }
        std::fs::write(dest.join("BRANCH"), branch.as_str()).unwrap();
        Ok("0123456789abcdef".to_string())
    }
}

/// GitHub double accepting a single token and remembering registered hooks.
pub struct FakeHost {
    valid_token: String,
    hooks: Mutex<Vec<(GitHubRepo, String, Option<String>)>>,
    fail_register: AtomicBool,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            valid_token: "ghp_valid".to_string(),
            hooks: Mutex::new(Vec::new()),
            fail_register: AtomicBool::new(false),
        }
    }
}

#[allow(dead_code)]
impl FakeHost {
    pub fn fail_register(&self, fail: bool) {
        self.fail_register.store(fail, Ordering::SeqCst);
    }

    pub fn hooks(&self) -> Vec<(GitHubRepo, String, Option<String>)> {
        self.hooks.lock().unwrap().clone()
    }
}

#[async_trait]
impl SourceHost for FakeHost {
    async fn authenticate(&self, token: &str) -> Result<UserIdentity, SourceError> {
        if token != self.valid_token {
            return Err(SourceError::InvalidToken { status: 401 });
        }
        Ok(UserIdentity {
            login: "octocat".to_string(),
            name: None,
        })
    }

    async fn register_webhook(
        &self,
        repo: &GitHubRepo,
        callback_url: &str,
        token: &str,
        secret: Option<&str>,
    ) -> Result<HookRegistration, SourceError> {
        if token != self.valid_token {
            return Err(SourceError::InvalidToken { status: 401 });
        }
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(SourceError::Api {
                status: 422,
                message: "Validation Failed".to_string(),
            });
        }
        let mut hooks = self.hooks.lock().unwrap();
        if hooks
            .iter()
            .any(|(r, url, _)| r == repo && url == callback_url)
        {
            return Ok(HookRegistration::Existing);
        }
        hooks.push((
            repo.clone(),
            callback_url.to_string(),
            secret.map(str::to_string),
        ));
        Ok(HookRegistration::Created)
    }
}

/// JSON store whose writes can be made to fail.
pub struct FlakyStore {
    inner: JsonFileStore,
    fail_saves: AtomicBool,
}

#[allow(dead_code)]
impl FlakyStore {
    pub fn new(inner: JsonFileStore) -> Self {
        Self {
            inner,
            fail_saves: AtomicBool::new(false),
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

impl AppStore for FlakyStore {
    fn load(&self) -> Result<BTreeMap<AppName, ApplicationRecord>, StoreError> {
        self.inner.load()
    }

    fn save(&self, apps: &BTreeMap<AppName, ApplicationRecord>) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: self.inner.path().to_path_buf(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(apps)
    }
}

/// A registry wired to test doubles over a temporary state directory.
pub struct Harness {
    // Held so the directory outlives the registry.
    _dir: TempDir,
    pub paths: Paths,
    pub store: Arc<FlakyStore>,
    pub engine: Arc<FakeEngine>,
    pub fetcher: Arc<FakeFetcher>,
    pub host: Arc<FakeHost>,
    pub registry: Registry,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_settings(FAST_SETTINGS)
    }

    pub fn with_settings(yaml: &str) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::new(dir.path().join("omk"));
        paths.ensure().unwrap();
        let settings = Settings::from_yaml(yaml).unwrap();

        let store = Arc::new(FlakyStore::new(JsonFileStore::new(paths.store_file())));
        let engine = Arc::new(FakeEngine::default());
        let fetcher = Arc::new(FakeFetcher::default());
        let host = Arc::new(FakeHost::default());

        let registry = Registry::new(
            &paths,
            &settings,
            store.clone(),
            engine.clone(),
            fetcher.clone(),
            host.clone(),
        )
        .unwrap();

        Self {
            _dir: dir,
            paths,
            store,
            engine,
            fetcher,
            host,
            registry,
        }
    }

    /// Store a token as `omk login` would.
    pub fn login(&self) {
        omk::source::CredentialStore::new(self.paths.credentials_file())
            .save("ghp_valid")
            .unwrap();
    }

    pub fn record(&self, name: &str) -> ApplicationRecord {
        self.store.get(&AppName::new(name).unwrap()).unwrap()
    }
}
