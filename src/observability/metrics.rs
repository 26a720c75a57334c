use prometheus::{
    Encoder, GaugeVec, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub ride_events_total: IntCounterVec,
    pub driver_seat_utilization: GaugeVec,
    pub upstream_request_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let ride_events_total = IntCounterVec::new(
            Opts::new("ride_events_total", "Ride lifecycle events by kind"),
            &["event"],
        )
        .expect("valid ride_events_total metric");

        let driver_seat_utilization = GaugeVec::new(
            Opts::new(
                "driver_seat_utilization",
                "Fraction of a driver's seats currently booked [0..1]",
            ),
            &["driver_id"],
        )
        .expect("valid driver_seat_utilization metric");

        let upstream_request_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "upstream_request_seconds",
                "Latency of geocoding/civic-data requests in seconds",
            ),
            &["service", "outcome"],
        )
        .expect("valid upstream_request_seconds metric");

        registry
            .register(Box::new(ride_events_total.clone()))
            .expect("register ride_events_total");
        registry
            .register(Box::new(driver_seat_utilization.clone()))
            .expect("register driver_seat_utilization");
        registry
            .register(Box::new(upstream_request_seconds.clone()))
            .expect("register upstream_request_seconds");

        Self {
            registry,
            ride_events_total,
            driver_seat_utilization,
            upstream_request_seconds,
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
