//! Test doubles for the line reader and the signal source.

use crate::config::Config;
use crate::console::Console;
use crate::history::HistorySource;
use crate::interrupt::{Interrupt, Signal};
use crate::reader::{LineReader, ReadError};
use crate::signals::{SignalSink, SignalSource, Subscription};
use anyhow::anyhow;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

/// A console reading from an empty script, with hand-raised signals.
pub(crate) fn console() -> Console {
    let console = Console::with_reader(Config::default(), Box::new(ScriptedReader::new(Vec::new())));
    console.set_signal_source(ManualSignals::new());
    console
}

/// One scripted reader outcome.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Line(String),
    Interrupt(Interrupt),
}

#[derive(Default)]
struct Script {
    steps: VecDeque<Step>,
    prompts: Vec<String>,
    bindings: Vec<Vec<String>>,
}

/// A line reader replaying a script. Fails for good once the script is exhausted.
#[derive(Clone, Default)]
pub(crate) struct ScriptedReader {
    script: Arc<Mutex<Script>>,
}

impl ScriptedReader {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                steps: steps.into(),
                ..Script::default()
            })),
        }
    }

    /// Every prompt shown so far.
    pub(crate) fn prompts(&self) -> Vec<String> {
        self.script.lock().unwrap().prompts.clone()
    }

    /// The history names of every binding so far.
    pub(crate) fn bindings(&self) -> Vec<Vec<String>> {
        self.script.lock().unwrap().bindings.clone()
    }
}

impl LineReader for ScriptedReader {
    fn read_line(&mut self, prompt: &str) -> Result<String, ReadError> {
        let mut script = self.script.lock().unwrap();
        script.prompts.push(prompt.to_string());
        match script.steps.pop_front() {
            Some(Step::Line(line)) => Ok(line),
            Some(Step::Interrupt(interrupt)) => Err(ReadError::Interrupted(interrupt)),
            None => Err(ReadError::Fatal(anyhow!("script exhausted"))),
        }
    }

    fn bind_histories(&mut self, histories: &[(String, Arc<dyn HistorySource>)]) {
        let names = histories.iter().map(|(name, _)| name.clone()).collect();
        self.script.lock().unwrap().bindings.push(names);
    }
}

/// A signal source raised by hand.
#[derive(Clone, Default)]
pub(crate) struct ManualSignals {
    sink: Arc<Mutex<Option<SignalSink>>>,
}

impl ManualSignals {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Delivers `signal` to the current subscriber, if any.
    pub(crate) fn raise(&self, signal: Signal) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            sink(signal);
        }
    }

    pub(crate) fn is_subscribed(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

impl SignalSource for ManualSignals {
    fn subscribe(&self, sink: SignalSink) -> io::Result<Subscription> {
        *self.sink.lock().unwrap() = Some(sink);
        let slot = self.sink.clone();
        Ok(Subscription::new(move || {
            slot.lock().unwrap().take();
        }))
    }
}
