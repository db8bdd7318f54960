//! Shared test support: a scripted decision provider with shared counters.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use haul::job::{CollisionPrompt, CollisionVerdict, DecisionProvider, RetryChoice};

#[derive(Default)]
struct CountsInner {
    collisions: usize,
    renames: usize,
    retries: usize,
}

/// Cloneable view on how often each prompt was shown, usable after the
/// provider has been moved into a job.
#[derive(Clone, Default)]
pub struct Counters {
    inner: Arc<Mutex<CountsInner>>,
}

impl Counters {
    pub fn collisions(&self) -> usize {
        self.inner.lock().unwrap().collisions
    }

    pub fn renames(&self) -> usize {
        self.inner.lock().unwrap().renames
    }

    pub fn retries(&self) -> usize {
        self.inner.lock().unwrap().retries
    }
}

/// Provider answering from pre-scripted queues; panics when a prompt arrives
/// that the test did not script.
#[derive(Default)]
pub struct ScriptedDecider {
    collision_answers: VecDeque<CollisionVerdict>,
    rename_answers: VecDeque<Option<String>>,
    retry_answers: VecDeque<RetryChoice>,
    counters: Counters,
}

impl ScriptedDecider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_collision(mut self, verdict: CollisionVerdict) -> Self {
        self.collision_answers.push_back(verdict);
        self
    }

    pub fn answer_rename(mut self, name: Option<&str>) -> Self {
        self.rename_answers.push_back(name.map(str::to_owned));
        self
    }

    pub fn answer_retry(mut self, choice: RetryChoice) -> Self {
        self.retry_answers.push_back(choice);
        self
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }
}

impl DecisionProvider for ScriptedDecider {
    fn ask_collision(&mut self, prompt: &CollisionPrompt) -> CollisionVerdict {
        self.counters.inner.lock().unwrap().collisions += 1;
        self.collision_answers
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted collision prompt: {:?}", prompt))
    }

    fn ask_rename_target(&mut self, current_name: &str) -> Option<String> {
        self.counters.inner.lock().unwrap().renames += 1;
        self.rename_answers
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted rename prompt for {current_name}"))
    }

    fn ask_retry_on_error(&mut self, title: &str, message: &str) -> RetryChoice {
        self.counters.inner.lock().unwrap().retries += 1;
        self.retry_answers
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted retry prompt: {title}: {message}"))
    }
}
