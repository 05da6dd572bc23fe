// ABOUTME: Command module aggregator for the omk CLI.
// ABOUTME: Wires the registry from settings and re-exports one handler per subcommand.

mod delete;
mod list;
mod login;
mod run;
mod serve;
mod status;

pub use delete::delete;
pub use list::list;
pub use login::login;
pub use run::run;
pub use serve::serve;
pub use status::status;

use omk::config::{Paths, Settings};
use omk::engine::check_prerequisites;
use omk::error::Result;
use omk::registry::Registry;
use omk::source::{GitFetcher, GitHubClient};
use omk::store::JsonFileStore;
use std::sync::Arc;

/// Check the container engine and build a registry over the on-disk store.
///
/// Nothing under the state directory is read before the engine answers.
pub async fn connect_registry(paths: &Paths, settings: &Settings) -> Result<Registry> {
    let engine = check_prerequisites(&settings.runtime_config()).await?;
    tracing::debug!(
        runtime = %engine.runtime_type(),
        socket = engine.socket_path(),
        "container engine ready"
    );

    let store = Arc::new(JsonFileStore::new(paths.store_file()));
    let host = Arc::new(GitHubClient::new(settings.github.api_url.clone())?);
    Registry::new(
        paths,
        settings,
        store,
        Arc::new(engine),
        Arc::new(GitFetcher::new()),
        host,
    )
}
