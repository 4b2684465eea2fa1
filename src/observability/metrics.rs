use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub operations_total: IntCounterVec,
    pub operation_latency_seconds: HistogramVec,
    pub revocations_total: IntCounterVec,
    pub orders_assigned_total: IntCounter,
    pub open_batches: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "dispatch_operations_total",
                "Engine operations by operation and outcome",
            ),
            &["operation", "outcome"],
        )
        .expect("valid dispatch_operations_total metric");

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "dispatch_operation_latency_seconds",
                "Latency of engine operations in seconds",
            ),
            &["operation"],
        )
        .expect("valid dispatch_operation_latency_seconds metric");

        let revocations_total = IntCounterVec::new(
            Opts::new(
                "dispatch_revocations_total",
                "Assignments revoked after courier changes, by reason",
            ),
            &["reason"],
        )
        .expect("valid dispatch_revocations_total metric");

        let orders_assigned_total = IntCounter::new(
            "dispatch_orders_assigned_total",
            "Orders placed into a new batch",
        )
        .expect("valid dispatch_orders_assigned_total metric");

        let open_batches = IntGauge::new("dispatch_open_batches", "Batches currently open")
            .expect("valid dispatch_open_batches metric");

        registry
            .register(Box::new(operations_total.clone()))
            .expect("register dispatch_operations_total");
        registry
            .register(Box::new(operation_latency_seconds.clone()))
            .expect("register dispatch_operation_latency_seconds");
        registry
            .register(Box::new(revocations_total.clone()))
            .expect("register dispatch_revocations_total");
        registry
            .register(Box::new(orders_assigned_total.clone()))
            .expect("register dispatch_orders_assigned_total");
        registry
            .register(Box::new(open_batches.clone()))
            .expect("register dispatch_open_batches");

        Self {
            registry,
            operations_total,
            operation_latency_seconds,
            revocations_total,
            orders_assigned_total,
            open_batches,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
