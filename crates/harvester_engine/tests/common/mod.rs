#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use harvester_engine::{EngineEvent, ProgressSink, Stage, TargetProgress};

#[derive(Default, Clone)]
pub struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.take()
            .into_iter()
            .filter_map(|event| match event {
                EngineEvent::Progress(TargetProgress { stage, .. }) => Some(stage),
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub const SHARED_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
