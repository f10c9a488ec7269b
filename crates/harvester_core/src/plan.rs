use std::collections::BTreeSet;

use crate::{HarvestTarget, RunWindow, TableName};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("the timeline requires a machine id")]
    MissingMachineId,
    #[error("machine id {0:?} contains characters outside [A-Za-z0-9-]")]
    InvalidMachineId(String),
}

/// What the operator asked for, before precedence rules are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub schema: bool,
    pub timeline: bool,
    pub machine_id: Option<String>,
    pub tables: BTreeSet<TableName>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Schema reference only; written to file, never shipped.
    Schema,
    /// Timeline for one machine only.
    Timeline,
    /// Every selected table in catalog order.
    Standard,
}

impl RunMode {
    pub fn file_only(self) -> bool {
        matches!(self, RunMode::Schema)
    }

    /// The file sink is on regardless of the sink flags.
    pub fn always_writes_file(self) -> bool {
        matches!(self, RunMode::Schema | RunMode::Timeline)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub mode: RunMode,
    pub targets: Vec<HarvestTarget>,
}

/// Applies precedence (schema, then timeline, then the table list) and builds
/// the ordered target list for the run.
pub fn plan(selection: &Selection, window: &RunWindow) -> Result<RunPlan, PlanError> {
    if selection.schema {
        return Ok(RunPlan {
            mode: RunMode::Schema,
            targets: vec![HarvestTarget::for_table(
                TableName::SchemaReference,
                window,
                None,
            )?],
        });
    }

    if selection.timeline {
        return Ok(RunPlan {
            mode: RunMode::Timeline,
            targets: vec![HarvestTarget::for_table(
                TableName::Timeline,
                window,
                selection.machine_id.as_deref(),
            )?],
        });
    }

    // BTreeSet iterates in declaration order, which is catalog order.
    let targets = selection
        .tables
        .iter()
        .filter(|table| !matches!(table, TableName::SchemaReference | TableName::Timeline))
        .map(|&table| HarvestTarget::for_table(table, window, None))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RunPlan {
        mode: RunMode::Standard,
        targets,
    })
}
