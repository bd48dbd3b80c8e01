//! Metrics sink boundary.
//!
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.
//! This module is the only bridge between loading/linking logic and the
//! thread-local counter state.

use crate::obs::metrics::{self, EventState};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// RelationKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RelationKind {
    BelongsTo,
    HasMany,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    LoadStart {
        kind: RelationKind,
        entity_path: &'static str,
    },
    LoadFinish {
        kind: RelationKind,
        entity_path: &'static str,
        keys: u64,
        rows: u64,
    },
    FetchFailed {
        kind: RelationKind,
        entity_path: &'static str,
    },
    Link {
        kind: RelationKind,
        entity_path: &'static str,
        linked: u64,
    },
    LinkGap {
        kind: RelationKind,
        entity_path: &'static str,
        unmatched: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local counter state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::LoadStart { kind, entity_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        RelationKind::BelongsTo => {
                            m.ops.belongs_to_loads = m.ops.belongs_to_loads.saturating_add(1);
                        }
                        RelationKind::HasMany => {
                            m.ops.has_many_loads = m.ops.has_many_loads.saturating_add(1);
                        }
                    }

                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.loads = entry.loads.saturating_add(1);
                });
            }

            MetricsEvent::LoadFinish {
                entity_path,
                keys,
                rows,
                ..
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.fetches = m.ops.fetches.saturating_add(1);
                    m.ops.keys_requested = m.ops.keys_requested.saturating_add(keys);
                    m.ops.rows_fetched = m.ops.rows_fetched.saturating_add(rows);

                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.rows_fetched = entry.rows_fetched.saturating_add(rows);
                });
            }

            MetricsEvent::FetchFailed { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.fetch_failures = m.ops.fetch_failures.saturating_add(1);
                });
            }

            MetricsEvent::Link {
                entity_path,
                linked,
                ..
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.links = m.ops.links.saturating_add(linked);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.links = entry.links.saturating_add(linked);
                });
            }

            MetricsEvent::LinkGap {
                entity_path,
                unmatched,
                ..
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.link_gaps = m.ops.link_gaps.saturating_add(unmatched);
                    let entry = m.entities.entry(entity_path.to_string()).or_default();
                    entry.link_gaps = entry.link_gaps.saturating_add(unmatched);
                });
            }
        }
    }
}

/// Route one event to the scoped override, or the global sink if none.
pub fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GlobalMetricsSink.record(event),
    }
}

/// Snapshot the current counter state.
#[must_use]
pub fn metrics_report() -> EventState {
    metrics::with_state(Clone::clone)
}

/// Reset all counter state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one loader call.
/// Finish accounting happens even on unwind.

pub struct Span {
    kind: RelationKind,
    entity_path: &'static str,
    keys: u64,
    rows: u64,
}

impl Span {
    /// Start a span for a loader of `kind` fetching `entity_path` rows.
    #[must_use]
    pub fn new(kind: RelationKind, entity_path: &'static str) -> Self {
        record(MetricsEvent::LoadStart { kind, entity_path });

        Self {
            kind,
            entity_path,
            keys: 0,
            rows: 0,
        }
    }

    pub fn set_keys(&mut self, keys: usize) {
        self.keys = u64::try_from(keys).unwrap_or(u64::MAX);
    }

    pub fn set_rows(&mut self, rows: usize) {
        self.rows = u64::try_from(rows).unwrap_or(u64::MAX);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::LoadFinish {
            kind: self.kind,
            entity_path: self.entity_path,
            keys: self.keys,
            rows: self.rows,
        });
    }
}
