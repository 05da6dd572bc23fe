// ABOUTME: GitHub webhook receiver.
// ABOUTME: Push deliveries for a tracked repository and branch trigger a redeploy.

mod event;
pub mod signature;
mod server;

pub use event::{PushEvent, Repository};
pub use server::WebhookServer;
