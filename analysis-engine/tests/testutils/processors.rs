//! Value distribution processor used by the integration tests
//!
//! Behaviour is driven by configuration properties:
//! - `fail_at_row`: return a processing error on the n-th physical row
//! - `panic_at_row`: panic on the n-th physical row
//! - `delay_ms`: sleep this long for every row
//! - `panic_on_result`: panic when the result is taken
//! - `factory_error`: make the factory refuse the configuration

use analysis_engine::{
    Column, ComponentFactory, EngineError, ExecutionConfiguration, JobConfiguration,
    ProcessingError, Row, RowProcessor, Value,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Weighted value counts of a processor's first column
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Distribution {
    pub descriptor: String,
    pub columns: Vec<Column>,
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

#[derive(Default)]
struct Overlap {
    active: HashMap<usize, usize>,
    total_active: usize,
    instance_peak: usize,
    total_peak: usize,
}

/// Tracks how many `process` calls run at once, per processor instance and
/// across all instances
#[derive(Default)]
pub struct OverlapTracker {
    overlap: Mutex<Overlap>,
}

impl OverlapTracker {
    fn enter(&self, instance: usize) {
        let mut overlap = self.overlap.lock();
        let active = overlap.active.entry(instance).or_insert(0);
        *active += 1;
        let active = *active;
        overlap.total_active += 1;
        overlap.instance_peak = overlap.instance_peak.max(active);
        overlap.total_peak = overlap.total_peak.max(overlap.total_active);
    }

    fn exit(&self, instance: usize) {
        let mut overlap = self.overlap.lock();
        if let Some(active) = overlap.active.get_mut(&instance) {
            *active -= 1;
        }
        overlap.total_active -= 1;
    }

    /// Most concurrent calls ever seen on a single instance
    pub fn instance_peak(&self) -> usize {
        self.overlap.lock().instance_peak
    }

    /// Most concurrent calls ever seen across all instances
    pub fn total_peak(&self) -> usize {
        self.overlap.lock().total_peak
    }
}

pub struct ValueDistribution {
    result: Distribution,
    instance: usize,
    tracker: Arc<OverlapTracker>,
    rows_seen: u64,
    fail_at_row: Option<u64>,
    panic_at_row: Option<u64>,
    panic_on_result: bool,
    delay: Option<Duration>,
}

impl ValueDistribution {
    pub fn new(
        configuration: &JobConfiguration,
        columns: &[Column],
        instance: usize,
        tracker: Arc<OverlapTracker>,
    ) -> Self {
        let number = |key: &str| configuration.property(key).and_then(|value| value.as_u64());
        Self {
            result: Distribution {
                descriptor: configuration.descriptor().to_string(),
                columns: columns.to_vec(),
                total: 0,
                counts: BTreeMap::new(),
            },
            instance,
            tracker,
            rows_seen: 0,
            fail_at_row: number("fail_at_row"),
            panic_at_row: number("panic_at_row"),
            panic_on_result: configuration
                .property("panic_on_result")
                .and_then(|value| value.as_bool())
                == Some(true),
            delay: number("delay_ms").map(Duration::from_millis),
        }
    }
}

impl RowProcessor<Distribution> for ValueDistribution {
    fn process(&mut self, row: &Row, weight: u64) -> Result<(), ProcessingError> {
        self.tracker.enter(self.instance);
        let outcome = self.count(row, weight);
        self.tracker.exit(self.instance);
        outcome
    }

    fn into_result(self: Box<Self>) -> Distribution {
        if self.panic_on_result {
            panic!("{} panicked while building its result", self.result.descriptor);
        }
        self.result
    }
}

impl ValueDistribution {
    fn count(&mut self, row: &Row, weight: u64) -> Result<(), ProcessingError> {
        self.rows_seen += 1;
        if self.panic_at_row == Some(self.rows_seen) {
            panic!("{} panicked on row {}", self.result.descriptor, self.rows_seen);
        }
        if self.fail_at_row == Some(self.rows_seen) {
            return Err(ProcessingError::new(format!("cannot process row {}", self.rows_seen)));
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }

        self.result.total += weight;
        if let Some(value) = self.result.columns.first().and_then(|column| row.value(column)) {
            let key = match value {
                Value::Text(text) => text.clone(),
                other => other.to_string(),
            };
            *self.result.counts.entry(key).or_insert(0) += weight;
        }
        Ok(())
    }
}

/// Factory for `ValueDistribution`, recording every creation
#[derive(Clone, Default)]
pub struct DistributionFactory {
    created: Arc<Mutex<Vec<(String, Vec<Column>)>>>,
    instances: Arc<AtomicUsize>,
    tracker: Arc<OverlapTracker>,
}

impl DistributionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// (descriptor, columns) of every processor created so far
    pub fn created(&self) -> Vec<(String, Vec<Column>)> {
        self.created.lock().clone()
    }

    /// Overlap of `process` calls across every processor this factory made
    pub fn tracker(&self) -> Arc<OverlapTracker> {
        Arc::clone(&self.tracker)
    }
}

impl ComponentFactory<Distribution> for DistributionFactory {
    fn create(
        &self,
        configuration: &JobConfiguration,
        columns: &[Column],
        _execution: &ExecutionConfiguration,
    ) -> Result<Box<dyn RowProcessor<Distribution>>, EngineError> {
        if configuration.property("factory_error").and_then(|v| v.as_bool()) == Some(true) {
            return Err(EngineError::InvalidConfiguration(format!(
                "unsupported configuration '{}'",
                configuration.descriptor()
            )));
        }
        self.created
            .lock()
            .push((configuration.descriptor().to_string(), columns.to_vec()));
        let instance = self.instances.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ValueDistribution::new(
            configuration,
            columns,
            instance,
            self.tracker(),
        )))
    }
}
