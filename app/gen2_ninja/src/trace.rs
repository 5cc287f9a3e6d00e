/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 *
 * This source code is licensed under both the MIT license found in the
 * LICENSE-MIT file in the root directory of this source tree and the Apache
 * License, Version 2.0 found in the LICENSE-APACHE file in the root directory
 * of this source tree.
 */

//! A small timing collector. Events are appended under a lock from any
//! worker; the collector is a plain context value owned by the driver, not
//! process-wide state.

use std::time::Duration;
use std::time::Instant;

use parking_lot::Mutex;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TraceKind {
    Resolve,
    TargetWrite,
    FileWrite,
}

impl TraceKind {
    fn as_str(self) -> &'static str {
        match self {
            TraceKind::Resolve => "resolve",
            TraceKind::TargetWrite => "target write",
            TraceKind::FileWrite => "file write",
        }
    }
}

#[derive(Debug)]
pub struct TraceEvent {
    pub kind: TraceKind,
    pub name: String,
    pub duration: Duration,
}

#[derive(Debug, Default)]
pub struct TraceCollector {
    events: Mutex<Vec<TraceEvent>>,
}

impl TraceCollector {
    pub fn new() -> TraceCollector {
        TraceCollector::default()
    }

    pub fn record(&self, event: TraceEvent) {
        self.events.lock().push(event);
    }

    pub fn scoped(&self, kind: TraceKind, name: impl Into<String>) -> ScopedTrace<'_> {
        ScopedTrace {
            collector: self,
            kind,
            name: name.into(),
            start: Instant::now(),
        }
    }

    /// Totals per kind, for the verbose log at the end of a run.
    pub fn summarize(&self) -> String {
        let events = self.events.lock();
        let mut out = String::new();
        for kind in [TraceKind::Resolve, TraceKind::TargetWrite, TraceKind::FileWrite] {
            let matching = events.iter().filter(|e| e.kind == kind);
            let (count, total) = matching.fold((0usize, Duration::ZERO), |(c, t), e| {
                (c + 1, t + e.duration)
            });
            if count > 0 {
                out.push_str(&format!(
                    "{}: {} events, {:.1}ms\n",
                    kind.as_str(),
                    count,
                    total.as_secs_f64() * 1000.0
                ));
            }
        }
        out
    }
}

/// Records one event for the time it is alive.
pub struct ScopedTrace<'a> {
    collector: &'a TraceCollector,
    kind: TraceKind,
    name: String,
    start: Instant,
}

impl Drop for ScopedTrace<'_> {
    fn drop(&mut self) {
        self.collector.record(TraceEvent {
            kind: self.kind,
            name: std::mem::take(&mut self.name),
            duration: self.start.elapsed(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_traces_append() {
        let collector = TraceCollector::new();
        {
            let _t = collector.scoped(TraceKind::TargetWrite, "//foo:bar");
        }
        {
            let _t = collector.scoped(TraceKind::TargetWrite, "//foo:baz");
        }
        let summary = collector.summarize();
        assert!(summary.contains("target write: 2 events"));
    }
}
