//! Observers recording job lifecycle events

use super::processors::Distribution;
use analysis_engine::{AnalysisRunner, EngineError, ProgressObserver, Table};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Init(Vec<Table>),
    Begin(Table, Option<u64>),
    Progress(Table, u64),
    Success(Table, u64),
    Failure(Table, EngineError, u64),
}

impl Event {
    pub fn table(&self) -> Option<&Table> {
        match self {
            Event::Init(_) => None,
            Event::Begin(table, _)
            | Event::Progress(table, _)
            | Event::Success(table, _)
            | Event::Failure(table, _, _) => Some(table),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::Success(..) | Event::Failure(..))
    }
}

/// Records every event in arrival order
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Event>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn events_for(&self, table: &Table) -> Vec<Event> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.table() == Some(table))
            .cloned()
            .collect()
    }

    pub fn progress_deltas(&self, table: &Table) -> Vec<u64> {
        self.events_for(table)
            .into_iter()
            .filter_map(|event| match event {
                Event::Progress(_, delta) => Some(delta),
                _ => None,
            })
            .collect()
    }

    /// Row count of the table's `success`, if it succeeded
    pub fn success(&self, table: &Table) -> Option<u64> {
        self.events_for(table).into_iter().find_map(|event| match event {
            Event::Success(_, rows) => Some(rows),
            _ => None,
        })
    }

    /// Cause and row count of the table's `failure`, if it failed
    pub fn failure(&self, table: &Table) -> Option<(EngineError, u64)> {
        self.events_for(table).into_iter().find_map(|event| match event {
            Event::Failure(_, cause, rows) => Some((cause, rows)),
            _ => None,
        })
    }

    pub fn terminal_count(&self, table: &Table) -> usize {
        self.events_for(table).iter().filter(|event| event.is_terminal()).count()
    }
}

impl ProgressObserver for RecordingObserver {
    fn init(&self, tables: &[Table]) {
        self.events.lock().push(Event::Init(tables.to_vec()));
    }

    fn begin(&self, table: &Table, estimated_rows: Option<u64>) {
        self.events.lock().push(Event::Begin(table.clone(), estimated_rows));
    }

    fn progress(&self, table: &Table, row_delta: u64) {
        self.events.lock().push(Event::Progress(table.clone(), row_delta));
    }

    fn success(&self, table: &Table, row_count: u64) {
        self.events.lock().push(Event::Success(table.clone(), row_count));
    }

    fn failure(&self, table: &Table, cause: &EngineError, rows_processed: u64) {
        self.events
            .lock()
            .push(Event::Failure(table.clone(), cause.clone(), rows_processed));
    }
}

/// Checks on every notification whether the table's results are visible
#[derive(Default)]
pub struct ResultVisibilityObserver {
    runner: Mutex<Weak<AnalysisRunner<Distribution>>>,
    /// (table, results visible, notification was `success`)
    observations: Mutex<Vec<(Table, bool, bool)>>,
}

impl ResultVisibilityObserver {
    pub fn attach(runner: &Arc<AnalysisRunner<Distribution>>) -> Arc<Self> {
        let observer = Arc::new(Self::default());
        *observer.runner.lock() = Arc::downgrade(runner);
        runner.add_observer(observer.clone());
        observer
    }

    pub fn observations(&self) -> Vec<(Table, bool, bool)> {
        self.observations.lock().clone()
    }

    fn observe(&self, table: &Table, is_success: bool) {
        let visible = self
            .runner
            .lock()
            .upgrade()
            .map_or(false, |runner| runner.results_for_table(table).is_some());
        self.observations.lock().push((table.clone(), visible, is_success));
    }
}

impl ProgressObserver for ResultVisibilityObserver {
    fn init(&self, _tables: &[Table]) {}

    fn begin(&self, table: &Table, _estimated_rows: Option<u64>) {
        self.observe(table, false);
    }

    fn progress(&self, table: &Table, _row_delta: u64) {
        self.observe(table, false);
    }

    fn success(&self, table: &Table, _row_count: u64) {
        self.observe(table, true);
    }

    fn failure(&self, table: &Table, _cause: &EngineError, _rows_processed: u64) {
        self.observe(table, false);
    }
}

/// Reads the status of every table of the job from inside each notification
#[derive(Default)]
pub struct StatusQueryObserver {
    runner: Mutex<Weak<AnalysisRunner<Distribution>>>,
    tables: Vec<Table>,
    queries: Mutex<usize>,
}

impl StatusQueryObserver {
    pub fn attach(runner: &Arc<AnalysisRunner<Distribution>>, tables: &[Table]) -> Arc<Self> {
        let observer = Arc::new(Self {
            runner: Mutex::new(Arc::downgrade(runner)),
            tables: tables.to_vec(),
            queries: Mutex::new(0),
        });
        runner.add_observer(observer.clone());
        observer
    }

    /// Number of status reads that saw the job's run state
    pub fn queries(&self) -> usize {
        *self.queries.lock()
    }

    fn query_all(&self) {
        let runner = self.runner.lock().upgrade();
        if let Some(runner) = runner {
            let answered = self
                .tables
                .iter()
                .filter(|table| runner.table_status(table).is_some())
                .count();
            *self.queries.lock() += answered;
        }
    }
}

impl ProgressObserver for StatusQueryObserver {
    fn init(&self, _tables: &[Table]) {}

    fn begin(&self, _table: &Table, _estimated_rows: Option<u64>) {}

    fn progress(&self, _table: &Table, _row_delta: u64) {
        self.query_all();
    }

    fn success(&self, _table: &Table, _row_count: u64) {
        self.query_all();
    }

    fn failure(&self, _table: &Table, _cause: &EngineError, _rows_processed: u64) {
        self.query_all();
    }
}
