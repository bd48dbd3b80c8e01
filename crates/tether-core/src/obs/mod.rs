//! Observability: in-process relation-loading counters and the sink boundary.
//!
//! Engine code never touches the counter state directly; every
//! instrumentation point builds a [`MetricsEvent`] and hands it to
//! [`record`], which routes it to the installed [`MetricsSink`].

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EventOps, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, RelationKind, Span, metrics_report, metrics_reset_all, record,
    with_metrics_sink,
};
