use prometheus::{
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub orders_created_total: IntCounter,
    pub offers_created_total: IntCounterVec,
    pub accepts_total: IntCounterVec,
    pub dispatch_queue_depth: IntGauge,
    pub accept_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let orders_created_total =
            IntCounter::new("orders_created_total", "Total orders created")
                .expect("valid orders_created_total metric");

        let offers_created_total = IntCounterVec::new(
            Opts::new("offers_created_total", "Total courier offers by kind"),
            &["kind"],
        )
        .expect("valid offers_created_total metric");

        let accepts_total = IntCounterVec::new(
            Opts::new("accepts_total", "Acceptance attempts by outcome"),
            &["outcome"],
        )
        .expect("valid accepts_total metric");

        let dispatch_queue_depth = IntGauge::new(
            "dispatch_queue_depth",
            "Fan-out jobs currently queued for the dispatch engine",
        )
        .expect("valid dispatch_queue_depth metric");

        let accept_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "accept_latency_seconds",
                "Latency of acceptance resolution in seconds",
            ),
            &["outcome"],
        )
        .expect("valid accept_latency_seconds metric");

        registry
            .register(Box::new(orders_created_total.clone()))
            .expect("register orders_created_total");
        registry
            .register(Box::new(offers_created_total.clone()))
            .expect("register offers_created_total");
        registry
            .register(Box::new(accepts_total.clone()))
            .expect("register accepts_total");
        registry
            .register(Box::new(dispatch_queue_depth.clone()))
            .expect("register dispatch_queue_depth");
        registry
            .register(Box::new(accept_latency_seconds.clone()))
            .expect("register accept_latency_seconds");

        Self {
            registry,
            orders_created_total,
            offers_created_total,
            accepts_total,
            dispatch_queue_depth,
            accept_latency_seconds,
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
