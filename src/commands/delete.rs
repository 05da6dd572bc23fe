// ABOUTME: Delete command implementation.
// ABOUTME: Tears down an application's containers and forgets it.

use omk::error::Result;
use omk::output::Output;
use omk::registry::Registry;
use omk::types::AppName;

pub async fn delete(registry: &Registry, name: &str, output: &mut Output) -> Result<()> {
    let name = AppName::new(name)?;
    output.start_timer();
    output.progress(&format!("Removing {}...", name));

    let diag = registry.delete(&name).await?;
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    output.success(&format!("Deleted {}", name));
    Ok(())
}
