//! Reconciliation loop.
//!
//! Drives the apply engine over a manifest set in rounds. Each round sweeps the
//! retry set once in source order; manifests that succeed leave the set, the
//! rest are retried after a fixed pause. Kinds that discovery does not know yet
//! (typically custom resources whose definition was created earlier in the same
//! run) flag a type mapping reload before the next round. The loop ends when
//! the retry set is empty or the caller's deadline passes.

use crate::apply::{ApplyEngine, ApplyOutcome};
use crate::error::{ApplyError, ReconcileError, RunFailure};
use crate::manifest::{self, Manifest};
use crate::options::ApplyOptions;
use crate::resolver::TypeResolver;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use store_client::{DiscoverySource, StoreClientTrait};
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{debug, info, warn};

/// Result of one sweep over the retry set
#[derive(Debug, Default)]
pub struct SweepReport {
    pub created: usize,
    pub patched: usize,
    pub unchanged: usize,
    pub failed: usize,
    /// A kind could not be resolved; the type mapping must be reloaded
    pub needs_reload: bool,
    /// The sweep stopped early because the deadline passed
    pub interrupted: bool,
    /// Last failure seen during the sweep
    pub last_error: Option<ApplyError>,
}

impl SweepReport {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Created => self.created += 1,
            ApplyOutcome::Patched => self.patched += 1,
            ApplyOutcome::Unchanged => self.unchanged += 1,
        }
    }
}

/// Totals of a successful run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub rounds: usize,
    /// Type mapping refreshes performed, including the initial load
    pub reloads: usize,
    pub created: usize,
    pub patched: usize,
    pub unchanged: usize,
}

impl RunSummary {
    fn absorb(&mut self, report: &SweepReport) {
        self.created += report.created;
        self.patched += report.patched;
        self.unchanged += report.unchanged;
    }

    /// Manifests that reached a successful outcome
    pub fn applied(&self) -> usize {
        self.created + self.patched + self.unchanged
    }
}

/// Applies a manifest set until every manifest succeeds or the deadline passes
pub struct Reconciler {
    engine: ApplyEngine,
    resolver: Arc<TypeResolver>,
    options: ApplyOptions,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("engine", &self.engine)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(store: Arc<dyn StoreClientTrait>, resolver: Arc<TypeResolver>, options: ApplyOptions) -> Self {
        Self {
            engine: ApplyEngine::new(store, options.update),
            resolver,
            options,
        }
    }

    async fn apply_one(&self, manifest: &Manifest, deadline: Instant) -> Result<ApplyOutcome, ApplyError> {
        let endpoint = self
            .resolver
            .resolve(&manifest.gvk)
            .await
            .map_err(|source| ApplyError::TypeNotResolved {
                path: manifest.path.clone(),
                source,
            })?;

        let outcome = timeout_at(deadline, self.engine.apply(manifest, &endpoint))
            .await
            .map_err(|_| ApplyError::DeadlineExceeded {
                path: manifest.path.clone(),
            })??;

        match outcome {
            ApplyOutcome::Created => self.options.report(format_args!(
                "Created {:?} {}",
                manifest.path,
                manifest.resource_string(&endpoint)
            )),
            ApplyOutcome::Patched => self.options.report(format_args!(
                "Patched {:?} {}",
                manifest.path,
                manifest.resource_string(&endpoint)
            )),
            ApplyOutcome::Unchanged => self.options.report(format_args!(
                "Skipped {:?} {} as it already exists",
                manifest.path,
                manifest.resource_string(&endpoint)
            )),
        }
        Ok(outcome)
    }

    /// Attempt every manifest in `retry_set` once, in order.
    ///
    /// Successful manifests are removed from `retry_set`; failures stay, in their
    /// original order. A failure never stops the sweep, the deadline does.
    pub async fn sweep(&self, retry_set: &mut Vec<Manifest>, deadline: Instant) -> SweepReport {
        let mut report = SweepReport::default();
        let mut still_failing = Vec::with_capacity(retry_set.len());
        let mut pending = std::mem::take(retry_set).into_iter();

        while let Some(manifest) = pending.next() {
            if Instant::now() >= deadline {
                report.interrupted = true;
                still_failing.push(manifest);
                still_failing.extend(pending.by_ref());
                break;
            }

            match self.apply_one(&manifest, deadline).await {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    if err.is_type_not_resolved() {
                        report.needs_reload = true;
                    }
                    let deadline_hit = matches!(err, ApplyError::DeadlineExceeded { .. });
                    debug!("Failed to apply {}: {}", manifest.path, err);
                    self.options.report(format_args!("{err}"));
                    report.failed += 1;
                    report.last_error = Some(err);
                    still_failing.push(manifest);
                    if deadline_hit {
                        report.interrupted = true;
                        still_failing.extend(pending.by_ref());
                        break;
                    }
                }
            }
        }

        *retry_set = still_failing;
        report
    }

    /// Run rounds until every manifest is applied or `deadline` passes.
    ///
    /// The type mapping is loaded before the first round if it has never been
    /// loaded, and reloaded once before any round that follows a round with
    /// unresolved kinds. Dropping the returned future cancels the run.
    pub async fn run(&self, manifests: Vec<Manifest>, deadline: Instant) -> Result<RunSummary, RunFailure> {
        let mut retry_set = manifests;
        let mut summary = RunSummary::default();
        if retry_set.is_empty() {
            return Ok(summary);
        }

        let mut needs_reload = !self.resolver.is_loaded().await;
        let mut last_error: Option<String> = None;

        loop {
            summary.rounds += 1;
            debug!("Round {}: {} manifest(s) pending", summary.rounds, retry_set.len());

            let mut mapping_ready = true;
            if needs_reload {
                match timeout_at(deadline, self.resolver.refresh()).await {
                    Ok(Ok(_)) => {
                        summary.reloads += 1;
                        needs_reload = false;
                    }
                    Ok(Err(e)) => {
                        warn!("Failed to refresh type mapping: {}", e);
                        self.options.report(format_args!("unable to refresh discovery information: {e}"));
                        last_error = Some(e.to_string());
                        mapping_ready = false;
                    }
                    Err(_) => break,
                }
            }

            if mapping_ready {
                let report = self.sweep(&mut retry_set, deadline).await;
                summary.absorb(&report);
                if retry_set.is_empty() {
                    info!(
                        "Applied all manifests in {} round(s): {} created, {} patched, {} unchanged",
                        summary.rounds, summary.created, summary.patched, summary.unchanged
                    );
                    return Ok(summary);
                }
                needs_reload = report.needs_reload;
                if let Some(err) = report.last_error {
                    last_error = Some(err.to_string());
                }
                if report.interrupted {
                    break;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            sleep_until((now + self.options.retry_interval).min(deadline)).await;
            if Instant::now() >= deadline {
                break;
            }
        }

        warn!("Deadline reached with {} manifest(s) not applied", retry_set.len());
        Err(RunFailure {
            error: ReconcileError::DeadlineExceeded {
                remaining: retry_set.len(),
                last: last_error.unwrap_or_else(|| "deadline passed before any attempt completed".to_string()),
            },
            remaining: retry_set,
            needs_reload,
        })
    }
}

/// Load manifests from `dir` and apply them until all succeed or `timeout` elapses
pub async fn ensure_manifests_created(
    dir: &Path,
    store: Arc<dyn StoreClientTrait>,
    discovery: Arc<dyn DiscoverySource>,
    options: ApplyOptions,
    timeout: Duration,
) -> Result<RunSummary, ReconcileError> {
    let deadline = Instant::now() + timeout;
    let manifests = manifest::load(dir, &options.filters)?;
    options.report(format_args!("Loaded {} manifest(s) from {}", manifests.len(), dir.display()));

    let resolver = Arc::new(TypeResolver::new(discovery));
    let reconciler = Reconciler::new(store, resolver, options);
    reconciler.run(manifests, deadline).await.map_err(|failure| failure.error)
}
