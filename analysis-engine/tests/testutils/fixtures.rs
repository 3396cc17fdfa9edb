//! Data fixtures for integration tests

use analysis_engine::datasource::{ErrorRowStream, RowStream};
use analysis_engine::{
    Column, DataConnection, EngineError, ExecutionConfiguration, JobConfiguration,
    MemoryDataContext, Query, QueryOptimizer, QueryPlan, Row, Table, Value,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const COUNTRIES: &[&str] = &["DK", "SE", "NO", "DE", "NL"];
const CITIES: &[&str] = &["Copenhagen", "Aarhus", "Stockholm", "Oslo", "Berlin", "Amsterdam"];

/// In-memory data source with generated tables
pub struct DataFixture {
    pub context: MemoryDataContext,
    rng: fastrand::Rng,
}

impl DataFixture {
    pub fn new() -> Self {
        Self {
            context: MemoryDataContext::new(),
            rng: fastrand::Rng::with_seed(fastrand::u64(..)),
        }
    }

    /// Add a table of `rows` customers with columns `ID`, `COUNTRY`, `CITY`
    ///
    /// Returns the columns and the number of customers per country.
    pub fn add_customers(
        &mut self,
        table: &Table,
        rows: usize,
    ) -> (Vec<Column>, BTreeMap<String, u64>) {
        let mut per_country = BTreeMap::new();
        let data = (0..rows)
            .map(|id| {
                let country = COUNTRIES[self.rng.usize(..COUNTRIES.len())];
                let city = CITIES[self.rng.usize(..CITIES.len())];
                *per_country.entry(country.to_string()).or_insert(0) += 1;
                vec![Value::Integer(id as i64), Value::from(country), Value::from(city)]
            })
            .collect();

        let columns = self.context.add_table(table, &["ID", "COUNTRY", "CITY"], data);
        (columns, per_country)
    }

    /// Add a single-column table of sequential integers
    pub fn add_numbers(&self, table: &Table, rows: usize) -> Column {
        let data = (0..rows).map(|n| vec![Value::Integer(n as i64)]).collect();
        self.context.add_table(table, &["N"], data).remove(0)
    }

    pub fn connection(&self) -> Arc<dyn DataConnection> {
        Arc::new(self.context.clone())
    }
}

pub fn configuration(descriptor: &str, columns: &[Column]) -> JobConfiguration {
    JobConfiguration::new(descriptor).with_columns(columns.iter().cloned())
}

/// Connection wrapper tracking how many row streams are open at once
///
/// Duplicates share the counters, so the peak covers every slot of a job.
#[derive(Clone)]
pub struct ProbeConnection {
    inner: MemoryDataContext,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    opened: Arc<AtomicUsize>,
}

impl ProbeConnection {
    pub fn new(inner: MemoryDataContext) -> Self {
        Self {
            inner,
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl DataConnection for ProbeConnection {
    fn execute_query(&self, query: &Query) -> Result<Box<dyn RowStream>, EngineError> {
        let stream = self.inner.execute_query(query)?;
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(active, Ordering::SeqCst);
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ProbeStream {
            inner: stream,
            active: Arc::clone(&self.active),
            closed: false,
        }))
    }

    fn duplicate(&self) -> Result<Arc<dyn DataConnection>, EngineError> {
        self.inner.duplicate()?;
        Ok(Arc::new(self.clone()))
    }

    fn row_count(&self, table: &Table) -> Option<u64> {
        self.inner.row_count(table)
    }
}

struct ProbeStream {
    inner: Box<dyn RowStream>,
    active: Arc<AtomicUsize>,
    closed: bool,
}

impl Iterator for ProbeStream {
    type Item = Result<Row, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl RowStream for ProbeStream {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.active.fetch_sub(1, Ordering::SeqCst);
        }
        self.inner.close();
    }
}

/// Connection whose reads of one table break after a number of rows
pub struct BrokenTableConnection {
    inner: MemoryDataContext,
    broken: Table,
    rows_before_error: usize,
}

impl BrokenTableConnection {
    pub fn new(inner: MemoryDataContext, broken: Table, rows_before_error: usize) -> Self {
        Self {
            inner,
            broken,
            rows_before_error,
        }
    }
}

impl DataConnection for BrokenTableConnection {
    fn execute_query(&self, query: &Query) -> Result<Box<dyn RowStream>, EngineError> {
        let stream = self.inner.execute_query(query)?;
        if query.table() != &self.broken {
            return Ok(stream);
        }

        let rows = stream
            .take(self.rows_before_error)
            .collect::<Result<Vec<Row>, EngineError>>()?;
        Ok(Box::new(ErrorRowStream::after_rows(
            rows,
            EngineError::Query(format!("connection lost while reading {}", self.broken)),
        )))
    }

    fn duplicate(&self) -> Result<Arc<dyn DataConnection>, EngineError> {
        Ok(Arc::new(Self::new(
            self.inner.clone(),
            self.broken.clone(),
            self.rows_before_error,
        )))
    }

    fn row_count(&self, table: &Table) -> Option<u64> {
        self.inner.row_count(table)
    }
}

/// Optimizer planning every table with zero sub-queries
pub struct NoQueriesOptimizer;

impl QueryOptimizer for NoQueriesOptimizer {
    fn optimize(
        &self,
        _table: &Table,
        _columns: &[Column],
        _execution: &ExecutionConfiguration,
        _connection: &dyn DataConnection,
    ) -> Result<QueryPlan, EngineError> {
        Ok(QueryPlan::new(Some(0), Vec::new()))
    }
}
