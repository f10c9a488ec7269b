use engine_logging::{engine_debug, engine_info};
use harvester_engine::{EngineEvent, ProgressSink, SinkKind, TargetProgress};

/// Reports engine progress through the process logger.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn emit(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(TargetProgress {
                table,
                stage,
                records: Some(records),
            }) => engine_debug!("{table}: {stage}, {records} records"),
            EngineEvent::Progress(TargetProgress { table, stage, .. }) => {
                engine_debug!("{table}: {stage}")
            }
            EngineEvent::TargetCompleted {
                table,
                result: Ok(outcome),
            } => {
                let sinks: Vec<String> = outcome
                    .receipts
                    .iter()
                    .map(|receipt| match (receipt.sink, &receipt.path) {
                        (SinkKind::File, Some(path)) => format!("file {}", path.display()),
                        (sink, _) => format!("{sink} ({} calls)", receipt.calls),
                    })
                    .collect();
                engine_info!(
                    "{table}: {} records from {} pages delivered to [{}]",
                    outcome.records,
                    outcome.pages,
                    sinks.join(", ")
                );
            }
            // Failures are logged by the harvester.
            EngineEvent::TargetCompleted { result: Err(_), .. } => {}
        }
    }
}
