// ABOUTME: List command implementation.
// ABOUTME: Prints one summary line per stored application.

use omk::error::Result;
use omk::output::Output;
use omk::registry::Registry;

pub fn list(registry: &Registry, output: &Output) -> Result<()> {
    let apps: Vec<_> = registry.list()?.collect();
    output.apps(&apps);
    Ok(())
}
