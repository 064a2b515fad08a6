use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub requests_created_total: IntCounter,
    pub acceptances_total: IntCounterVec,
    pub radius_escalations_total: IntCounter,
    pub request_outcomes_total: IntCounterVec,
    pub match_latency_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let requests_created_total = IntCounter::new(
            "requests_created_total",
            "Total service requests created",
        )
        .expect("valid requests_created_total metric");

        let acceptances_total = IntCounterVec::new(
            Opts::new("acceptances_total", "Accept attempts by outcome"),
            &["outcome"],
        )
        .expect("valid acceptances_total metric");

        let radius_escalations_total = IntCounter::new(
            "radius_escalations_total",
            "Total search radius expansions",
        )
        .expect("valid radius_escalations_total metric");

        let request_outcomes_total = IntCounterVec::new(
            Opts::new(
                "request_outcomes_total",
                "Terminal request outcomes (completed/cancelled/timeout)",
            ),
            &["outcome"],
        )
        .expect("valid request_outcomes_total metric");

        let match_latency_seconds = Histogram::with_opts(HistogramOpts::new(
            "match_latency_seconds",
            "Latency of provider match queries in seconds",
        ))
        .expect("valid match_latency_seconds metric");

        registry
            .register(Box::new(requests_created_total.clone()))
            .expect("register requests_created_total");
        registry
            .register(Box::new(acceptances_total.clone()))
            .expect("register acceptances_total");
        registry
            .register(Box::new(radius_escalations_total.clone()))
            .expect("register radius_escalations_total");
        registry
            .register(Box::new(request_outcomes_total.clone()))
            .expect("register request_outcomes_total");
        registry
            .register(Box::new(match_latency_seconds.clone()))
            .expect("register match_latency_seconds");

        Self {
            registry,
            requests_created_total,
            acceptances_total,
            radius_escalations_total,
            request_outcomes_total,
            match_latency_seconds,
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
