use crate::builder::EpochBuilder;
use crate::permuter::{CrashStatePermuter, PermutationPolicy};
use std::collections::HashMap;

/// Statistics exported by the epoch builder and the crash-state permuter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    /// Completed epoch builds (counter).
    BuilderBuilds,
    /// Epochs in the builder's current list.
    BuilderEpochs,
    /// Ops across the builder's current list.
    BuilderEpochOps,
    /// Epochs whose writes overlap on disk.
    BuilderOverlapEpochs,
    /// Crash states accepted as new.
    PermuterStatesAccepted,
    /// Candidate states rejected as duplicates.
    PermuterDuplicatesRejected,
    /// Distinct fingerprints in the dedup set.
    PermuterKnownFingerprints,
    /// Epochs held by the permuter.
    PermuterEpochs,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::BuilderBuilds => "builder.builds",
            Metric::BuilderEpochs => "builder.epochs",
            Metric::BuilderEpochOps => "builder.epoch_ops",
            Metric::BuilderOverlapEpochs => "builder.overlap_epochs",
            Metric::PermuterStatesAccepted => "permuter.states_accepted",
            Metric::PermuterDuplicatesRejected => "permuter.duplicates_rejected",
            Metric::PermuterKnownFingerprints => "permuter.known_fingerprints",
            Metric::PermuterEpochs => "permuter.epochs",
        }
    }
}

/// In-memory registry of this crate's metrics. Keys are typed; names are
/// qualified with the namespace only when a snapshot is taken.
#[derive(Debug)]
pub struct MetricsRegistry {
    namespace: String,
    counters: HashMap<Metric, u64>,
    gauges: HashMap<Metric, u64>,
}

impl MetricsRegistry {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            counters: HashMap::new(),
            gauges: HashMap::new(),
        }
    }

    pub fn inc_counter(&mut self, metric: Metric, delta: u64) -> u64 {
        let counter = self.counters.entry(metric).or_insert(0);
        *counter = counter.saturating_add(delta);
        *counter
    }

    pub fn set_gauge(&mut self, metric: Metric, value: u64) {
        self.gauges.insert(metric, value);
    }

    pub fn counter(&self, metric: Metric) -> u64 {
        self.counters.get(&metric).copied().unwrap_or(0)
    }

    pub fn gauge(&self, metric: Metric) -> Option<u64> {
        self.gauges.get(&metric).copied()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(metric, value)| (self.qualify(*metric), *value))
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|(metric, value)| (self.qualify(*metric), *value))
                .collect(),
        }
    }

    fn qualify(&self, metric: Metric) -> String {
        format!("{}.{}", self.namespace.trim_end_matches('.'), metric.name())
    }
}

/// Point-in-time export with fully qualified metric names.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub counters: HashMap<String, u64>,
    pub gauges: HashMap<String, u64>,
}

/// Exports the outcome of an epoch build into a registry.
#[derive(Debug, Default)]
pub struct BuilderMetricsPublisher;

impl BuilderMetricsPublisher {
    pub fn new() -> Self {
        Self
    }

    pub fn publish(&mut self, registry: &mut MetricsRegistry, builder: &EpochBuilder) {
        let epochs = builder.epochs();
        registry.inc_counter(Metric::BuilderBuilds, 1);
        registry.set_gauge(Metric::BuilderEpochs, epochs.len() as u64);
        registry.set_gauge(
            Metric::BuilderEpochOps,
            epochs.iter().map(|epoch| epoch.ops.len() as u64).sum(),
        );
        registry.set_gauge(
            Metric::BuilderOverlapEpochs,
            epochs.iter().filter(|epoch| epoch.overlaps).count() as u64,
        );
    }
}

/// Exports a permuter's generation statistics into a registry.
#[derive(Debug, Default)]
pub struct PermuterMetricsPublisher;

impl PermuterMetricsPublisher {
    pub fn new() -> Self {
        Self
    }

    pub fn publish<P: PermutationPolicy>(
        &mut self,
        registry: &mut MetricsRegistry,
        permuter: &CrashStatePermuter<P>,
    ) {
        registry.set_gauge(Metric::PermuterStatesAccepted, permuter.states_accepted());
        registry.set_gauge(
            Metric::PermuterDuplicatesRejected,
            permuter.duplicates_rejected(),
        );
        registry.set_gauge(
            Metric::PermuterKnownFingerprints,
            permuter.known_states() as u64,
        );
        registry.set_gauge(Metric::PermuterEpochs, permuter.epochs().len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;
    use crate::record::{WriteFlags, WriteRecord};

    #[test]
    fn counters_accumulate_per_metric() {
        let mut registry = MetricsRegistry::new("blockshear");
        assert_eq!(registry.inc_counter(Metric::BuilderBuilds, 1), 1);
        assert_eq!(registry.inc_counter(Metric::BuilderBuilds, 2), 3);
        assert_eq!(registry.counter(Metric::BuilderBuilds), 3);
        assert_eq!(registry.counter(Metric::PermuterStatesAccepted), 0);
    }

    #[test]
    fn snapshot_qualifies_names_once() {
        let mut registry = MetricsRegistry::new("blockshear.");
        registry.set_gauge(Metric::PermuterEpochs, 4);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.gauges["blockshear.permuter.epochs"], 4);
        assert_eq!(snapshot.gauges.len(), 1);
    }

    #[test]
    fn builder_publisher_exports_epoch_shape() {
        let write = |sector: u64, flags: WriteFlags| {
            WriteRecord::new(sector, 8192, flags, 0, vec![0u8; 8192])
        };
        let records = vec![
            write(0, WriteFlags::WRITE),
            write(8, WriteFlags::WRITE),
            write(64, WriteFlags::WRITE | WriteFlags::FUA),
            write(128, WriteFlags::WRITE),
        ];
        let mut builder = EpochBuilder::new(BuilderConfig::strict(4096)).unwrap();
        builder.build_strict(&records).unwrap();

        let mut registry = MetricsRegistry::new("blockshear");
        let mut publisher = BuilderMetricsPublisher::new();
        publisher.publish(&mut registry, &builder);

        assert_eq!(registry.counter(Metric::BuilderBuilds), 1);
        assert_eq!(registry.gauge(Metric::BuilderEpochs), Some(2));
        assert_eq!(registry.gauge(Metric::BuilderEpochOps), Some(4));
        assert_eq!(registry.gauge(Metric::BuilderOverlapEpochs), Some(1));
    }
}
