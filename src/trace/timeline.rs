//! Trace-event-format timeline parsing.
//!
//! Accepts either `{"traceEvents": [...]}` or a bare event array. Events are
//! sorted by timestamp on load; begin/end pairing relies on that order.

#![allow(missing_docs)]

use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::{PerfError, Result};

/// Event phase (`ph` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Begin,
    End,
    Complete,
    Other,
}

impl Phase {
    fn parse(ph: &str) -> Self {
        match ph {
            "B" => Self::Begin,
            "E" => Self::End,
            "X" => Self::Complete,
            _ => Self::Other,
        }
    }
}

/// A single timeline event.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEvent {
    pub name: String,
    pub phase: Phase,
    pub ts_micros: f64,
    /// Only set on complete (`X`) events.
    pub dur_micros: Option<f64>,
    pub args: Value,
}

impl TimelineEvent {
    /// Numeric argument, accepting JSON numbers and numeric strings.
    #[must_use]
    pub fn numeric_arg(&self, key: &str) -> Option<f64> {
        match self.args.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    ph: String,
    #[serde(default)]
    ts: f64,
    #[serde(default)]
    dur: Option<f64>,
    #[serde(default)]
    args: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimeline {
    Wrapped {
        #[serde(rename = "traceEvents")]
        trace_events: Vec<RawEvent>,
    },
    Bare(Vec<RawEvent>),
}

/// Timestamp-ordered sequence of timeline events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
}

impl Timeline {
    /// Parse a JSON timeline document.
    pub fn from_json(raw: &str) -> Result<Self> {
        let parsed: RawTimeline =
            serde_json::from_str(raw).map_err(|error| PerfError::TraceParse {
                details: error.to_string(),
            })?;
        let raw_events = match parsed {
            RawTimeline::Wrapped { trace_events } => trace_events,
            RawTimeline::Bare(events) => events,
        };
        let events = raw_events
            .into_iter()
            .map(|raw| {
                let phase = Phase::parse(&raw.ph);
                TimelineEvent {
                    name: raw.name,
                    phase,
                    ts_micros: raw.ts,
                    dur_micros: if phase == Phase::Complete { raw.dur } else { None },
                    args: raw.args,
                }
            })
            .collect();
        Ok(Self::from_events(events))
    }

    /// Build from already-typed events.
    #[must_use]
    pub fn from_events(mut events: Vec<TimelineEvent>) -> Self {
        events.sort_by(|a, b| a.ts_micros.total_cmp(&b.ts_micros));
        Self { events }
    }

    #[must_use]
    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Events with the given name, in timestamp order.
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TimelineEvent> + 'a {
        self.events.iter().filter(move |event| event.name == name)
    }

    /// Durations in milliseconds of every `name` span.
    ///
    /// A begin is paired with the next end of the same name; a second begin
    /// before that end replaces the first, and unmatched begins are dropped.
    /// Complete events contribute their `dur` directly.
    #[must_use]
    pub fn durations_millis(&self, name: &str) -> Vec<f64> {
        let mut durations = Vec::new();
        let mut open: Option<f64> = None;
        for event in self.named(name) {
            match event.phase {
                Phase::Begin => open = Some(event.ts_micros),
                Phase::End => {
                    if let Some(begin) = open.take() {
                        durations.push((event.ts_micros - begin) / 1_000.0);
                    }
                }
                Phase::Complete => {
                    if let Some(dur) = event.dur_micros {
                        durations.push(dur / 1_000.0);
                    }
                }
                Phase::Other => {}
            }
        }
        durations
    }
}
