use prometheus::{
    Counter, Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub claims_total: IntCounterVec,
    pub claim_latency_seconds: HistogramVec,
    pub status_transitions_total: IntCounterVec,
    pub payouts_disbursed_total: Counter,
    pub active_orders: IntGauge,
    pub open_issues: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders placed at checkout")
                .expect("valid orders_created_total metric");

        let claims_total = IntCounterVec::new(
            Opts::new("claims_total", "Driver claim attempts by outcome"),
            &["outcome"],
        )
        .expect("valid claims_total metric");

        let claim_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "claim_latency_seconds",
                "Latency of claim processing in seconds",
            ),
            &["outcome"],
        )
        .expect("valid claim_latency_seconds metric");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "status_transitions_total",
                "Order status transitions by target status",
            ),
            &["to"],
        )
        .expect("valid status_transitions_total metric");

        let payouts_disbursed_total = Counter::new(
            "payouts_disbursed_total",
            "Sum of driver payouts credited on delivery",
        )
        .expect("valid payouts_disbursed_total metric");

        let active_orders = IntGauge::new("active_orders", "Orders not yet delivered or cancelled")
            .expect("valid active_orders metric");

        let open_issues = IntGauge::new("open_issues", "Item issues awaiting a customer decision")
            .expect("valid open_issues metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(claims_total.clone()))
            .expect("register claims_total");
        registry
            .register(Box::new(claim_latency_seconds.clone()))
            .expect("register claim_latency_seconds");
        registry
            .register(Box::new(status_transitions_total.clone()))
            .expect("register status_transitions_total");
        registry
            .register(Box::new(payouts_disbursed_total.clone()))
            .expect("register payouts_disbursed_total");
        registry
            .register(Box::new(active_orders.clone()))
            .expect("register active_orders");
        registry
            .register(Box::new(open_issues.clone()))
            .expect("register open_issues");

        Self {
            registry,
            orders_created_total,
            claims_total,
            claim_latency_seconds,
            status_transitions_total,
            payouts_disbursed_total,
            active_orders,
            open_issues,
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
