// ABOUTME: Status command implementation.
// ABOUTME: Shows the full record after refreshing the container status.

use omk::error::Result;
use omk::output::Output;
use omk::registry::Registry;
use omk::types::AppName;

pub async fn status(registry: &Registry, name: &str, output: &Output) -> Result<()> {
    let name = AppName::new(name)?;
    let report = registry.status(&name).await?;

    for warning in report.diagnostics.warnings() {
        output.warning(&warning.message);
    }
    output.record(&report.record);
    Ok(())
}
