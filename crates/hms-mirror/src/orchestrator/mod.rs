//! Conversion orchestrator - main workflow coordinator.
//!
//! Builds the database mirrors from discovered metadata, applies the
//! validation gate, generates database statements, then runs one pipeline
//! task per table under a concurrency limit. The orchestrator is the only
//! writer of the database and table maps; workers own their table until
//! they hand it back through the join handle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{validate_flags, Config};
use crate::core::{ConversionResult, DBMirror, Environment, PhaseState, TableMirror};
use crate::error::{Result, TableError};
use crate::inventory::MetadataSource;
use crate::pipeline::{ProgressTracker, TableJob};
use crate::strategy::database::build_database_sql;
use crate::strategy::{pipeline_for, resolve, DatabaseContext, DecisionInput, TableFilter};

/// Progress update emitted once per finished table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub database: String,
    pub table: String,
    pub phase_state: PhaseState,
    pub current_phase: usize,
    pub total_phase_count: usize,
    pub tables_completed: u64,
    pub tables_total: u64,
    pub tables_failed: u64,
}

/// Conversion orchestrator.
pub struct Orchestrator {
    config: Arc<Config>,
    progress: bool,
    progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
}

struct PendingTable {
    database: String,
    /// Copy of the table as handed to the worker, recorded as failed if the
    /// worker panics.
    fallback: TableMirror,
    handle: JoinHandle<TableJob>,
}

impl Orchestrator {
    /// Create a new orchestrator.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            progress: false,
            progress_tx: None,
        }
    }

    /// Print progress updates as JSON lines to stderr.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.progress = enabled;
        self
    }

    /// Set progress channel for updates.
    pub fn with_progress_channel(mut self, tx: mpsc::Sender<ProgressUpdate>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the conversion job.
    pub async fn run(&self, source: &dyn MetadataSource, cancel: CancellationToken) -> Result<ConversionResult> {
        let config = &self.config;
        let mut result = ConversionResult::new(config);
        info!(
            "Starting conversion job {} ({} strategy)",
            result.key, config.data_strategy
        );

        // Phase 1: Build database mirrors from discovered metadata
        let mut databases = self.collect(source).await?;
        let table_total: usize = databases.values().map(|db| db.tables.len()).sum();
        info!(
            "Phase 1: {} databases, {} tables selected",
            databases.len(),
            table_total
        );

        // Phase 2: Validation gate
        if let Err(failure) = validate_flags(config) {
            warn!("{}", failure);
            result.validation = Some(failure);
            result.databases = databases;
            result.completed_at = Some(chrono::Utc::now());
            return Ok(result);
        }

        // Phase 3: Database statements
        info!("Phase 3: Building database statements");
        let mut contexts = BTreeMap::new();
        for db in databases.values_mut() {
            let left_location = db
                .locations
                .get(&Environment::Left)
                .and_then(|l| l.location.clone());
            let ctx = DatabaseContext::new(config.clone(), &db.name, left_location.as_deref());
            build_database_sql(db, &ctx);
            contexts.insert(db.name.clone(), ctx);
        }

        // Phase 4: Table pipelines
        info!("Phase 4: Building table SQL ({} workers)", config.get_concurrency());
        let tracker = Arc::new(ProgressTracker::new(table_total as u64));
        let pending = self
            .spawn_tables(&mut databases, &contexts, &tracker, &cancel)
            .await;
        self.collect_tables(pending, &mut databases, &tracker).await;

        result.databases = databases;
        result.cancelled = cancel.is_cancelled();
        result.completed_at = Some(chrono::Utc::now());

        let summary = result.phase_summary();
        info!(
            "Conversion job {} finished in {:.2}s: {} tables, {} failed{}",
            result.key,
            tracker.elapsed().as_secs_f64(),
            result.table_count(),
            summary.get(&PhaseState::Error).copied().unwrap_or(0),
            if result.cancelled { " (cancelled)" } else { "" }
        );
        Ok(result)
    }

    /// Read the selected databases and tables from the metadata source.
    async fn collect(&self, source: &dyn MetadataSource) -> Result<BTreeMap<String, DBMirror>> {
        let config = &self.config;
        let filter = TableFilter::from_config(config)?;

        let available = source.databases().await?;
        for wanted in &config.databases {
            if !available.contains(wanted) {
                warn!("Database {} is not in the inventory", wanted);
            }
        }

        let mut databases = BTreeMap::new();
        for name in available {
            if !config.databases.is_empty() && !config.databases.contains(&name) {
                continue;
            }
            if !filter.admits_database(&name) {
                debug!("{}: excluded by database filter", name);
                continue;
            }

            let snapshot = source.database(&name).await?;
            let mut db = DBMirror::new(&name, config.target_db_name(&name));
            db.locations.insert(Environment::Left, snapshot.left);
            db.locations.insert(Environment::Right, snapshot.right);

            for table in snapshot.tables {
                let acid = if table.left.exists {
                    table.left.is_acid()
                } else {
                    table.right.is_acid()
                };
                if !filter.admits_table(&table.name, acid) {
                    debug!("{}.{}: excluded by table filter", name, table.name);
                    continue;
                }
                let mirror = TableMirror::new(&table.name, table.left, table.right);
                db.tables.insert(table.name, mirror);
            }
            databases.insert(name, db);
        }
        Ok(databases)
    }

    async fn spawn_tables(
        &self,
        databases: &mut BTreeMap<String, DBMirror>,
        contexts: &BTreeMap<String, DatabaseContext>,
        tracker: &Arc<ProgressTracker>,
        cancel: &CancellationToken,
    ) -> Vec<PendingTable> {
        let semaphore = Arc::new(Semaphore::new(self.config.get_concurrency()));
        let mut pending = Vec::new();

        'databases: for (name, db) in databases.iter_mut() {
            let Some(ctx) = contexts.get(name) else {
                continue;
            };
            let tables: Vec<String> = db.tables.keys().cloned().collect();
            for table_name in tables {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        info!("Cancellation requested, no further tables will start");
                        break 'databases;
                    }
                    permit = semaphore.clone().acquire_owned() => permit,
                };
                let Ok(permit) = permit else {
                    warn!("Worker pool closed, no further tables will start");
                    break 'databases;
                };
                let Some(table) = db.tables.remove(&table_name) else {
                    continue;
                };

                let decision = resolve(&DecisionInput::new(&self.config, &table));
                let fallback = table.clone();
                let mut job = TableJob::new(name.clone(), table, decision);
                let ctx = ctx.clone();
                let cancel = cancel.clone();
                let tracker = tracker.clone();

                let handle = tokio::spawn(async move {
                    tracker.worker_started();
                    let pipeline = pipeline_for(&job.decision);
                    pipeline.run(&mut job, &ctx, &cancel).await;
                    tracker.worker_finished();
                    drop(permit);
                    job
                });
                pending.push(PendingTable {
                    database: name.clone(),
                    fallback,
                    handle,
                });
            }
        }
        pending
    }

    async fn collect_tables(
        &self,
        pending: Vec<PendingTable>,
        databases: &mut BTreeMap<String, DBMirror>,
        tracker: &ProgressTracker,
    ) {
        for PendingTable {
            database,
            fallback,
            handle,
        } in pending
        {
            let job_name = format!("{}.{}", database, fallback.name);
            let table = match handle.await {
                Ok(job) => {
                    let result = job.into_result();
                    if result.failed() {
                        warn!("{}: {}", job_name, result.phase_state);
                    } else {
                        debug!(
                            "{}: {} ({}/{} phases, {:?})",
                            job_name,
                            result.phase_state,
                            result.current_phase,
                            result.total_phase_count,
                            result.duration
                        );
                    }
                    result.table
                }
                Err(e) => {
                    error!("{}: task panicked - {}", job_name, e);
                    let mut table = fallback;
                    let message = format!("Task panicked: {}", e);
                    table.fail(TableError::new(&table.name, Environment::Right, message));
                    table
                }
            };

            let completed = tracker.table_finished(table.phase_state == PhaseState::Error);
            let update = ProgressUpdate {
                database: database.clone(),
                table: table.name.clone(),
                phase_state: table.phase_state,
                current_phase: table.current_phase,
                total_phase_count: table.total_phase_count,
                tables_completed: completed,
                tables_total: tracker.get_total(),
                tables_failed: tracker.get_failed(),
            };
            self.report_progress(update).await;

            if let Some(db) = databases.get_mut(&database) {
                db.tables.insert(table.name.clone(), table);
            }
        }
    }

    async fn report_progress(&self, update: ProgressUpdate) {
        if self.progress {
            match serde_json::to_string(&update) {
                Ok(line) => eprintln!("{}", line),
                Err(e) => warn!("Failed to serialize progress update: {}", e),
            }
        }
        if let Some(tx) = &self.progress_tx {
            let _ = tx.send(update).await;
        }
    }
}
