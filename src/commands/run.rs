// ABOUTME: Run command implementation.
// ABOUTME: Deploys or resumes an application and reports the executed steps.

use omk::error::{Error, Result};
use omk::output::Output;
use omk::pipeline::RunOutcome;
use omk::registry::{Registry, RunOptions};
use omk::store::WebhookStatus;

pub async fn run(
    registry: &Registry,
    url: &str,
    options: RunOptions,
    output: &mut Output,
) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Deploying {}", url));

    let report = registry.run(url, options).await?;
    let record = &report.record;

    for step in &report.executed {
        let failed = matches!(report.outcome, RunOutcome::Failed { step: s, .. } if s == *step);
        let mark = if failed { "✗" } else { "✓" };
        output.progress(&format!("  {} {}", mark, step));
    }

    match report.outcome {
        RunOutcome::Completed => {
            if record.webhook_status == WebhookStatus::Unconfigured {
                output.warning("push webhook not configured; redeploys must be started manually");
            }
            let build_type = record
                .build_type
                .map(|b| b.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            output.success(&format!(
                "Deployed {} ({}, container {})",
                record.name, build_type, record.last_container_status
            ));
            Ok(())
        }
        RunOutcome::Failed { step, reason } => Err(Error::StepFailed {
            name: record.name.clone(),
            step,
            reason,
        }),
    }
}
