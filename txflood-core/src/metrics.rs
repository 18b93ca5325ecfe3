/// Names of the series the load generator records through the `metrics` facade.
#[derive(Copy, Clone, Debug)]
pub struct MetricLabels {
    pub submitted: &'static str,
    pub accepted: &'static str,
    pub rejected: &'static str,
    pub backlog: &'static str,
    pub latency: &'static str,
}

pub const METRIC_LABELS: MetricLabels = MetricLabels {
    submitted: "txflood_submitted",
    accepted: "txflood_accepted",
    rejected: "txflood_rejected",
    backlog: "txflood_backlog",
    latency: "txflood_submit_latency",
};
