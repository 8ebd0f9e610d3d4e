//! Collection Store: the last successfully loaded snapshot of a screen's
//! collections plus its load status.
//!
//! A load fans out every fetcher concurrently and joins them before the
//! status changes. Only a batch in which every fetcher succeeded replaces
//! the snapshot; otherwise the previous snapshot stays visible and the
//! status turns `Failed`.

use futures::future::{self, AbortHandle, Abortable, Aborted, BoxFuture};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::model::{Department, Employee, JobRole, LeaveRequest, Payroll, Record};

/// One fetched collection, tagged by domain type.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection {
    Employees(Vec<Employee>),
    Departments(Vec<Department>),
    JobRoles(Vec<JobRole>),
    LeaveRequests(Vec<LeaveRequest>),
    Payrolls(Vec<Payroll>),
}

/// Records that live in a [`Dataset`].
pub trait Collected: Record {
    fn slot(dataset: &Dataset) -> &Vec<Self>;

    fn slot_mut(dataset: &mut Dataset) -> &mut Vec<Self>;

    fn wrap(records: Vec<Self>) -> Collection;

    /// Consistency check applied to every retrieved record.
    fn verify(&self) -> Result<(), String> {
        Ok(())
    }
}

macro_rules! collected {
    ($record:ty, $field:ident, $variant:ident) => {
        impl Collected for $record {
            fn slot(dataset: &Dataset) -> &Vec<Self> {
                &dataset.$field
            }

            fn slot_mut(dataset: &mut Dataset) -> &mut Vec<Self> {
                &mut dataset.$field
            }

            fn wrap(records: Vec<Self>) -> Collection {
                Collection::$variant(records)
            }
        }
    };
}

collected!(Employee, employees, Employees);
collected!(Department, departments, Departments);
collected!(JobRole, job_roles, JobRoles);
collected!(LeaveRequest, leave_requests, LeaveRequests);

impl Collected for Payroll {
    fn slot(dataset: &Dataset) -> &Vec<Self> {
        &dataset.payrolls
    }

    fn slot_mut(dataset: &mut Dataset) -> &mut Vec<Self> {
        &mut dataset.payrolls
    }

    fn wrap(records: Vec<Self>) -> Collection {
        Collection::Payrolls(records)
    }

    fn verify(&self) -> Result<(), String> {
        if self.net_salary_holds() {
            Ok(())
        } else {
            Err(format!(
                "payroll #{} has net salary {} but base + allowances - deductions is {}",
                self.id,
                self.net_salary,
                self.expected_net_salary()
            ))
        }
    }
}

/// The collections one screen composes, all from the same load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub employees: Vec<Employee>,
    pub departments: Vec<Department>,
    pub job_roles: Vec<JobRole>,
    pub leave_requests: Vec<LeaveRequest>,
    pub payrolls: Vec<Payroll>,
}

impl Dataset {
    pub fn records<R: Collected>(&self) -> &[R] {
        R::slot(self)
    }

    pub fn find<R: Collected>(&self, id: u64) -> Option<&R> {
        R::slot(self).iter().find(|r| r.id() == id)
    }

    /// Appends a fetched collection; two fetchers of the same type accumulate.
    fn absorb(&mut self, collection: Collection) -> Result<(), String> {
        match collection {
            Collection::Employees(v) => extend_verified(&mut self.employees, v),
            Collection::Departments(v) => extend_verified(&mut self.departments, v),
            Collection::JobRoles(v) => extend_verified(&mut self.job_roles, v),
            Collection::LeaveRequests(v) => extend_verified(&mut self.leave_requests, v),
            Collection::Payrolls(v) => extend_verified(&mut self.payrolls, v),
        }
    }

    /// Swaps one domain's collection wholesale.
    pub(crate) fn replace(&mut self, collection: Collection) -> Result<(), String> {
        match collection {
            Collection::Employees(v) => replace_verified(&mut self.employees, v),
            Collection::Departments(v) => replace_verified(&mut self.departments, v),
            Collection::JobRoles(v) => replace_verified(&mut self.job_roles, v),
            Collection::LeaveRequests(v) => replace_verified(&mut self.leave_requests, v),
            Collection::Payrolls(v) => replace_verified(&mut self.payrolls, v),
        }
    }

    pub(crate) fn remove<R: Collected>(&mut self, id: u64) -> bool {
        let slot = R::slot_mut(self);
        let before = slot.len();
        slot.retain(|r| r.id() != id);
        slot.len() != before
    }

    /// Replaces the record with the same id; returns false if it is absent.
    pub(crate) fn upsert<R: Collected>(&mut self, record: R) -> Result<bool, String> {
        record.verify()?;
        match R::slot_mut(self).iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn extend_verified<R: Collected>(slot: &mut Vec<R>, records: Vec<R>) -> Result<(), String> {
    records.iter().try_for_each(R::verify)?;
    slot.extend(records);
    Ok(())
}

fn replace_verified<R: Collected>(slot: &mut Vec<R>, records: Vec<R>) -> Result<(), String> {
    records.iter().try_for_each(R::verify)?;
    *slot = records;
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    NotLoaded,
    Loading,
    Ready,
    Failed(String),
}

/// A zero-argument asynchronous producer of one collection.
pub type Fetcher = Box<dyn FnOnce() -> BoxFuture<'static, Result<Collection, GatewayError>> + Send>;

pub fn fetcher<F, Fut>(f: F) -> Fetcher
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<Collection, GatewayError>> + Send + 'static,
{
    Box::new(move || Box::pin(f()))
}

pub type BatchResult = Vec<Result<Collection, GatewayError>>;

/// An in-flight load. Await [`PendingLoad::run`] and hand the outcome back
/// to [`CollectionStore::finish_load`].
pub struct PendingLoad {
    generation: u64,
    batch: Abortable<BoxFuture<'static, BatchResult>>,
}

impl PendingLoad {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub async fn run(self) -> LoadOutcome {
        LoadOutcome {
            generation: self.generation,
            results: self.batch.await,
        }
    }
}

pub struct LoadOutcome {
    generation: u64,
    results: Result<BatchResult, Aborted>,
}

/// What a finished load did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// The snapshot was replaced.
    Replaced,
    /// The batch failed; the previous snapshot is still shown.
    Failed(GatewayError),
    /// A newer load started, or the load was cancelled; nothing changed.
    Discarded,
}

pub struct CollectionStore {
    snapshot: Option<Dataset>,
    status: LoadStatus,
    /// Status to restore when an in-flight load is cancelled.
    settled: LoadStatus,
    generation: u64,
    in_flight: Option<AbortHandle>,
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionStore {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            status: LoadStatus::NotLoaded,
            settled: LoadStatus::NotLoaded,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Last Ready snapshot; stays visible while a reload is running or after it failed.
    pub fn snapshot(&self) -> Option<&Dataset> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    /// Starts a load of every fetcher at once. A load already in flight is
    /// aborted and its result will be discarded.
    pub fn begin_load(&mut self, fetchers: Vec<Fetcher>) -> PendingLoad {
        if let Some(previous) = self.in_flight.take() {
            debug!(generation = self.generation, "Superseding in-flight load");
            previous.abort();
        }

        if self.status != LoadStatus::Loading {
            self.settled = self.status.clone();
        }
        self.generation += 1;
        self.status = LoadStatus::Loading;
        info!(generation = self.generation, fetchers = fetchers.len(), "Load started");

        let batch: BoxFuture<'static, BatchResult> =
            Box::pin(future::join_all(fetchers.into_iter().map(|f| f())));
        let (handle, registration) = AbortHandle::new_pair();
        self.in_flight = Some(handle);

        PendingLoad {
            generation: self.generation,
            batch: Abortable::new(batch, registration),
        }
    }

    pub fn finish_load(&mut self, outcome: LoadOutcome) -> Applied {
        if outcome.generation != self.generation {
            debug!(
                generation = outcome.generation,
                current = self.generation,
                "Discarding stale load"
            );
            return Applied::Discarded;
        }

        let results = match outcome.results {
            Ok(results) => results,
            Err(Aborted) => {
                debug!(generation = outcome.generation, "Discarding cancelled load");
                return Applied::Discarded;
            }
        };
        self.in_flight = None;

        let mut dataset = Dataset::default();
        let mut failure: Option<GatewayError> = None;
        for result in results {
            match result {
                Ok(collection) => {
                    if let Err(reason) = dataset.absorb(collection) {
                        failure.get_or_insert(GatewayError::Transport(reason));
                    }
                }
                Err(e) => {
                    failure.get_or_insert(e);
                }
            }
        }

        match failure {
            None => {
                info!(generation = self.generation, "Load succeeded");
                self.snapshot = Some(dataset);
                self.status = LoadStatus::Ready;
                Applied::Replaced
            }
            Some(err) => {
                warn!(generation = self.generation, error = %err, "Load failed; keeping previous snapshot");
                self.status = LoadStatus::Failed(err.to_string());
                Applied::Failed(err)
            }
        }
    }

    pub async fn load(&mut self, fetchers: Vec<Fetcher>) -> Applied {
        let pending = self.begin_load(fetchers);
        let outcome = pending.run().await;
        self.finish_load(outcome)
    }

    /// Aborts the in-flight load, if any, and restores the status it replaced.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            // Bumping the generation also discards a result that already finished.
            self.generation += 1;
            self.status = self.settled.clone();
            info!(generation = self.generation, "Load cancelled");
        }
    }

    /// Drops an in-flight load whose reads may predate a local change to the
    /// snapshot. The snapshot keeps the change.
    pub(crate) fn supersede_in_flight(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
            self.generation += 1;
            self.status = self.settled.clone();
            debug!(generation = self.generation, "In-flight load superseded by a local change");
        }
    }

    pub(crate) fn snapshot_mut(&mut self) -> Option<&mut Dataset> {
        self.snapshot.as_mut()
    }
}

impl Drop for CollectionStore {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
