//! In-process interpretation source with a fixed script
//!
//! Each fetch consumes the next step; the last step repeats forever. Call
//! instants are recorded with `tokio::time::Instant` so paused-clock tests can
//! check spacing exactly.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use webtarot_client::{ClientError, InterpretationSource, Result};
use webtarot_common::InterpretationResult;

#[derive(Debug, Clone)]
pub enum Step {
    /// Not done; carries the placeholder text the backend echoes
    Pending,
    Done(&'static str),
    Failed(&'static str),
    NotFound,
    Transport(&'static str),
}

impl Step {
    fn outcome(&self) -> Result<InterpretationResult> {
        match self {
            Step::Pending => Ok(InterpretationResult {
                done: false,
                interpretation: "Will I get the job?".to_string(),
                ..Default::default()
            }),
            Step::Done(text) => Ok(InterpretationResult {
                done: true,
                interpretation: text.to_string(),
                ..Default::default()
            }),
            Step::Failed(error) => Ok(InterpretationResult {
                done: true,
                error: error.to_string(),
                ..Default::default()
            }),
            Step::NotFound => Ok(InterpretationResult::not_found()),
            Step::Transport(message) => Err(ClientError::Transport(message.to_string())),
        }
    }
}

pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(String, Instant)>>,
    delay: Duration,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Self::with_delay(steps, Duration::ZERO)
    }

    /// Every fetch takes `delay` before answering
    pub fn with_delay(steps: Vec<Step>, delay: Duration) -> Arc<Self> {
        assert!(!steps.is_empty(), "script needs at least one step");
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }

    pub fn call_ids(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(id, _)| id.clone()).collect()
    }

    fn next_step(&self) -> Step {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front().unwrap()
        } else {
            steps.front().cloned().unwrap()
        }
    }
}

#[async_trait]
impl InterpretationSource for ScriptedSource {
    async fn fetch(&self, id: &str) -> Result<InterpretationResult> {
        self.calls.lock().unwrap().push((id.to_string(), Instant::now()));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.next_step().outcome()
    }
}
