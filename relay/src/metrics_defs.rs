//! Metrics definitions for the relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const FETCH_DURATION: MetricDef = MetricDef {
    name: "relay.fetch_deployments.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch, aggregate and notify for one project, in seconds",
};

pub const SITE_FETCH_FAILURES: MetricDef = MetricDef {
    name: "relay.site_fetch.failures",
    metric_type: MetricType::Counter,
    description: "Sites whose deployment listing failed and were skipped",
};

pub const NOTIFICATIONS_SENT: MetricDef = MetricDef {
    name: "relay.notifications.sent",
    metric_type: MetricType::Counter,
    description: "Failure notifications dispatched through the messaging tool",
};

pub const NOTIFICATIONS_FAILED: MetricDef = MetricDef {
    name: "relay.notifications.failed",
    metric_type: MetricType::Counter,
    description: "Failure notifications the messaging tool did not accept",
};

pub const ALL_METRICS: &[MetricDef] = &[
    FETCH_DURATION,
    SITE_FETCH_FAILURES,
    NOTIFICATIONS_SENT,
    NOTIFICATIONS_FAILED,
];
