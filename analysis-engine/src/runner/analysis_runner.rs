// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Analysis Runner - orchestration of one analysis job
//!
//! The runner is the entry point for embedding the engine. It collects the
//! job's configurations, plans the job, wires processors, delegates and
//! workers together and drives the scheduler, either on the caller's thread
//! or on a background admission thread.

use crate::config::{ExecutionConfiguration, JobConfiguration};
use crate::datasource::DataConnection;
use crate::exec::delegate::{TableDelegate, TableStatus};
use crate::exec::error::EngineError;
use crate::exec::processor::{ComponentFactory, ProcessorResult, RowProcessor};
use crate::exec::progress::{ObserverHub, ProgressObserver};
use crate::exec::results::ResultStore;
use crate::exec::scheduler::QueryScheduler;
use crate::exec::worker::{panic_message, QueryWorker, RowSink};
use crate::model::{Column, Table};
use crate::plan::{DefaultQueryOptimizer, JobPlan, JobPlanner, QueryOptimizer};
use parking_lot::{Mutex, RwLock};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

/// Runtime state of a started job
struct RunState<R> {
    scheduler: Arc<QueryScheduler>,
    delegates: Vec<Arc<TableDelegate<R>>>,
    admission: Option<JoinHandle<()>>,
}

/// Processors of one table, ready to be handed to its delegate
type TableProcessors<R> = Vec<(Arc<JobConfiguration>, Vec<Column>, Box<dyn RowProcessor<R>>)>;

/// Analysis Runner - executes a set of configurations against a data source
///
/// A runner executes exactly once. Results become visible per table as soon
/// as the table has succeeded, so they may be read while the job is running.
pub struct AnalysisRunner<R> {
    job_id: Uuid,
    factory: Arc<dyn ComponentFactory<R>>,
    planner: JobPlanner,
    configurations: Mutex<Vec<Arc<JobConfiguration>>>,
    execution: RwLock<ExecutionConfiguration>,
    hub: Arc<ObserverHub>,
    results: Arc<ResultStore<R>>,
    started: AtomicBool,
    run: Mutex<Option<RunState<R>>>,
}

impl<R: Clone + Send + Sync + 'static> AnalysisRunner<R> {
    pub fn new(factory: impl ComponentFactory<R> + 'static) -> Self {
        Self::with_optimizer(factory, Arc::new(DefaultQueryOptimizer::new()))
    }

    pub fn with_optimizer(
        factory: impl ComponentFactory<R> + 'static,
        optimizer: Arc<dyn QueryOptimizer>,
    ) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            factory: Arc::new(factory),
            planner: JobPlanner::new(optimizer),
            configurations: Mutex::new(Vec::new()),
            execution: RwLock::new(ExecutionConfiguration::default()),
            hub: Arc::new(ObserverHub::new()),
            results: Arc::new(ResultStore::new()),
            started: AtomicBool::new(false),
            run: Mutex::new(None),
        }
    }

    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Register a configuration; ignored once the job has started
    pub fn add_configuration(&self, configuration: JobConfiguration) {
        if self.started.load(Ordering::SeqCst) {
            log::warn!(
                "Job {}: ignoring configuration '{}' added after execution started",
                self.job_id,
                configuration.descriptor()
            );
            return;
        }
        self.configurations.lock().push(Arc::new(configuration));
    }

    pub fn configurations(&self) -> Vec<Arc<JobConfiguration>> {
        self.configurations.lock().clone()
    }

    pub fn set_execution_configuration(&self, execution: ExecutionConfiguration) {
        if self.started.load(Ordering::SeqCst) {
            log::warn!(
                "Job {}: ignoring execution configuration set after execution started",
                self.job_id
            );
            return;
        }
        *self.execution.write() = execution;
    }

    pub fn execution_configuration(&self) -> ExecutionConfiguration {
        self.execution.read().clone()
    }

    pub fn add_observer(&self, observer: Arc<dyn ProgressObserver>) {
        self.hub.add(observer);
    }

    pub fn remove_observer(&self, observer: &Arc<dyn ProgressObserver>) -> bool {
        self.hub.remove(observer)
    }

    /// Run the job against `connection`
    ///
    /// Planning, processor creation and connection duplication errors are
    /// returned before any worker starts. With `synchronous`, blocks until
    /// every table reached a terminal state and returns the job's fatal
    /// error, if any. Otherwise returns as soon as admission is running in
    /// the background; use `wait` to join it.
    pub fn execute(
        &self,
        connection: Arc<dyn DataConnection>,
        synchronous: bool,
    ) -> Result<(), EngineError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(EngineError::InvalidState(format!(
                "job {} has already been executed",
                self.job_id
            )));
        }

        let configurations = self.configurations();
        let execution = self.execution_configuration();
        log::info!(
            "Job {}: executing {} configurations ({} connections, {} queries per connection)",
            self.job_id,
            configurations.len(),
            execution.max_connections(),
            execution.max_queries_per_connection()
        );

        let plan = self.planner.plan(&configurations, &execution, connection.as_ref())?;
        let (delegates, workers) = self.create_delegates(&plan, &execution)?;
        let scheduler = Arc::new(QueryScheduler::new(connection, workers, &execution)?);

        self.hub.init(&plan.tables());
        for (table_plan, delegate) in plan.tables.iter().zip(&delegates) {
            self.hub.begin(table_plan.table(), table_plan.query_plan.estimated_row_count);
            self.complete_if_idle(delegate, &scheduler);
        }

        if synchronous {
            *self.run.lock() = Some(RunState {
                scheduler: Arc::clone(&scheduler),
                delegates,
                admission: None,
            });
            scheduler.run_admission();
            scheduler.wait_for_completion();
            return self.finish(&scheduler);
        }

        let background = Arc::clone(&scheduler);
        let spawned = thread::Builder::new()
            .name(format!("analysis-admission-{}", self.job_id))
            .spawn(move || background.run_admission());

        match spawned {
            Ok(handle) => {
                *self.run.lock() = Some(RunState {
                    scheduler,
                    delegates,
                    admission: Some(handle),
                });
                Ok(())
            }
            Err(error) => {
                let fatal =
                    EngineError::Fatal(format!("Failed to spawn admission thread: {}", error));
                log::error!("Job {}: {}", self.job_id, fatal);
                scheduler.stop_all();
                scheduler.run_admission();
                *self.run.lock() = Some(RunState {
                    scheduler,
                    delegates,
                    admission: None,
                });
                Err(fatal)
            }
        }
    }

    /// A panic while publishing an idle table's results is fatal for the job
    fn complete_if_idle(&self, delegate: &TableDelegate<R>, scheduler: &QueryScheduler) {
        let completed = panic::catch_unwind(AssertUnwindSafe(|| delegate.complete_if_idle()));
        if let Err(payload) = completed {
            let fatal = EngineError::Fatal(format!(
                "completing table '{}' panicked: {}",
                delegate.table(),
                panic_message(&*payload)
            ));
            log::error!("Job {}: {}", self.job_id, fatal);
            delegate.fail(fatal.clone());
            scheduler.record_fatal(fatal);
        }
    }

    fn create_delegates(
        &self,
        plan: &JobPlan,
        execution: &ExecutionConfiguration,
    ) -> Result<(Vec<Arc<TableDelegate<R>>>, Vec<Arc<QueryWorker>>), EngineError> {
        let mut delegates: Vec<Arc<TableDelegate<R>>> = Vec::with_capacity(plan.tables.len());
        let mut all_workers: Vec<Arc<QueryWorker>> = Vec::with_capacity(plan.query_count());

        for table_plan in &plan.tables {
            let mut processors: TableProcessors<R> = Vec::new();
            for assignment in &table_plan.assignment.configurations {
                let processor = self
                    .factory
                    .create(&assignment.configuration, &assignment.columns, execution)
                    .map_err(|error| match error {
                        EngineError::Planning(_) => error,
                        other => EngineError::Planning(format!(
                            "failed to create processor '{}': {}",
                            assignment.configuration.descriptor(),
                            other
                        )),
                    })?;
                processors.push((
                    Arc::clone(&assignment.configuration),
                    assignment.columns.clone(),
                    processor,
                ));
            }

            let delegate = Arc::new(TableDelegate::new(
                table_plan.table().clone(),
                processors,
                Arc::clone(&self.hub),
                Arc::clone(&self.results),
            ));
            let sink: Arc<dyn RowSink> = delegate.clone();
            let first_id = all_workers.len();
            let workers: Vec<Arc<QueryWorker>> = table_plan
                .query_plan
                .queries
                .iter()
                .enumerate()
                .map(|(offset, query)| {
                    Arc::new(QueryWorker::new(first_id + offset, query.clone(), Arc::clone(&sink)))
                })
                .collect();

            delegate.register_workers(workers.clone());
            all_workers.extend(workers);
            delegates.push(delegate);
        }

        Ok((delegates, all_workers))
    }

    fn finish(&self, scheduler: &QueryScheduler) -> Result<(), EngineError> {
        match scheduler.fatal_error() {
            Some(fatal) => {
                log::error!("Job {}: finished with fatal error: {}", self.job_id, fatal);
                Err(fatal)
            }
            None => {
                log::info!(
                    "Job {}: finished, {} of {} tables succeeded",
                    self.job_id,
                    self.results.len(),
                    self.run
                        .lock()
                        .as_ref()
                        .map_or(0, |run| run.delegates.len())
                );
                Ok(())
            }
        }
    }

    /// Block until the job has finished
    ///
    /// Returns the job's fatal error, if any. Returns `InvalidState` when the
    /// job has not been executed.
    pub fn wait(&self) -> Result<(), EngineError> {
        let (scheduler, admission) = {
            let mut run = self.run.lock();
            match run.as_mut() {
                Some(state) => (Arc::clone(&state.scheduler), state.admission.take()),
                None => {
                    return Err(EngineError::InvalidState(format!(
                        "job {} has not been executed",
                        self.job_id
                    )))
                }
            }
        };

        if let Some(handle) = admission {
            if handle.join().is_err() {
                let fatal = EngineError::Fatal("admission thread panicked".to_string());
                log::error!("Job {}: {}", self.job_id, fatal);
                scheduler.stop_all();
                scheduler.run_admission();
                scheduler.wait_for_completion();
                return Err(fatal);
            }
        }
        scheduler.wait_for_completion();
        self.finish(&scheduler)
    }

    /// Request a cooperative stop of every worker
    ///
    /// Tables that have not finished yet fail with `EngineError::Cancelled`.
    /// Does not block; use `wait` to wait for the workers to exit.
    pub fn cancel(&self) {
        let scheduler = self.run.lock().as_ref().map(|run| Arc::clone(&run.scheduler));
        match scheduler {
            Some(scheduler) => {
                log::info!("Job {}: cancelled by caller", self.job_id);
                scheduler.stop_all();
            }
            None => log::warn!("Job {}: cancel requested before execution", self.job_id),
        }
    }

    /// True once every table is terminal and every worker has exited
    pub fn is_finished(&self) -> bool {
        self.run.lock().as_ref().map_or(false, |run| {
            run.scheduler.is_complete()
                && run
                    .delegates
                    .iter()
                    .all(|delegate| delegate.status().is_terminal())
        })
    }

    pub fn table_status(&self, table: &Table) -> Option<TableStatus> {
        self.find_delegate(table).map(|delegate| delegate.status())
    }

    /// The error a failed table ended with
    pub fn table_failure(&self, table: &Table) -> Option<EngineError> {
        self.find_delegate(table).and_then(|delegate| delegate.failure())
    }

    fn find_delegate(&self, table: &Table) -> Option<Arc<TableDelegate<R>>> {
        self.run
            .lock()
            .as_ref()
            .and_then(|run| {
                run.delegates
                    .iter()
                    .find(|delegate| delegate.table() == table)
                    .cloned()
            })
    }

    /// Results of every succeeded table, grouped by table in completion order
    pub fn results(&self) -> Vec<ProcessorResult<R>> {
        self.results.all()
    }

    pub fn results_for_table(&self, table: &Table) -> Option<Vec<ProcessorResult<R>>> {
        self.results.for_table(table)
    }

    /// Tables with published results, in completion order
    pub fn result_tables(&self) -> Vec<Table> {
        self.results.tables()
    }
}
