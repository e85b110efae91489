//! Background release of reservations that outlived their TTL.
//!
//! One sweep enumerates the reservation table and releases every expired
//! hold through [`ReservationManager::release`]. Losing a race to a cancel
//! or checkout is the expected outcome and is skipped silently, which makes
//! sweeps idempotent. Store failures degrade health but never stop the loop.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::CoordinatorConfig;
use crate::error::{StoreError, SweeperError};
use crate::reservation::{ReleaseOutcome, ReservationManager};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SweeperHealth {
    Healthy,
    Degraded { reason: String },
}

/// Snapshot of the sweeper's configuration and progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStatus {
    pub interval_secs: u64,
    pub ttl_secs: u64,
    pub running: bool,
    pub health: SweeperHealth,
    /// Clock time of the last completed sweep
    pub last_sweep_at: Option<u64>,
    pub last_released: usize,
    pub total_released: u64,
    pub sweeps: u64,
}

#[derive(Debug)]
struct SweepStats {
    health: SweeperHealth,
    last_sweep_at: Option<u64>,
    last_released: usize,
    total_released: u64,
    sweeps: u64,
}

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct ExpirySweeper {
    manager: Arc<ReservationManager>,
    config: CoordinatorConfig,
    stats: Mutex<SweepStats>,
    task: Mutex<Option<RunningLoop>>,
}

impl ExpirySweeper {
    pub fn new(manager: Arc<ReservationManager>, config: CoordinatorConfig) -> Self {
        Self {
            manager,
            config,
            stats: Mutex::new(SweepStats {
                health: SweeperHealth::Healthy,
                last_sweep_at: None,
                last_released: 0,
                total_released: 0,
                sweeps: 0,
            }),
            task: Mutex::new(None),
        }
    }

    /// Run one sweep synchronously and return how many reservations it released.
    ///
    /// Fails only when the reservation table cannot be enumerated. Failures on
    /// individual rows mark the sweeper degraded and the scan moves on.
    pub fn sweep_once(&self) -> Result<usize, StoreError> {
        let now = self.manager.clock().now_ms();
        let ttl_ms = self.config.ttl_ms();

        let reservations = match self.manager.reservations().list_all() {
            Ok(all) => all,
            Err(e) => {
                self.mark_degraded(format!("listing reservations failed: {}", e));
                return Err(e);
            }
        };

        let mut released = 0;
        let mut last_error = None;
        for reservation in reservations.iter().filter(|r| r.is_expired(now, ttl_ms)) {
            match self.manager.release(reservation) {
                Ok(ReleaseOutcome::Released) => {
                    released += 1;
                    tracing::debug!(
                        reservation_id = %reservation.id,
                        vehicle_id = reservation.vehicle_id,
                        client_id = %reservation.client_id,
                        "Expired reservation released"
                    );
                }
                Ok(ReleaseOutcome::AlreadyResolved) => {}
                Err(e) => {
                    tracing::warn!(
                        reservation_id = %reservation.id,
                        error = %e,
                        "Failed to release expired reservation"
                    );
                    last_error = Some(e.to_string());
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.sweeps += 1;
        stats.last_sweep_at = Some(now);
        stats.last_released = released;
        stats.total_released += released as u64;
        match last_error {
            Some(reason) => {
                tracing::warn!(%reason, "Sweeper degraded");
                stats.health = SweeperHealth::Degraded { reason };
            }
            None => stats.health = SweeperHealth::Healthy,
        }
        drop(stats);

        if released > 0 {
            tracing::info!(
                released,
                scanned = reservations.len(),
                "Expired reservations released"
            );
        } else {
            tracing::debug!(scanned = reservations.len(), "Sweep found nothing to release");
        }
        Ok(released)
    }

    pub fn status(&self) -> SweepStatus {
        let stats = self.stats.lock();
        SweepStatus {
            interval_secs: self.config.sweep_interval.as_secs(),
            ttl_secs: self.config.ttl.as_secs(),
            running: self.is_running(),
            health: stats.health.clone(),
            last_sweep_at: stats.last_sweep_at,
            last_released: stats.last_released,
            total_released: stats.total_released,
            sweeps: stats.sweeps,
        }
    }

    pub fn health(&self) -> SweeperHealth {
        self.stats.lock().health.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Spawn the periodic loop on the current tokio runtime. A second call
    /// while the loop runs does nothing.
    pub fn start(self: &Arc<Self>) -> Result<(), SweeperError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SweeperError::NoRuntime)?;

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Ok(());
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let sweeper = Arc::clone(self);
        let interval = self.config.sweep_interval;
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        // Store calls may block on disk; keep them off the runtime workers.
                        // A failed enumeration is already reflected in health.
                        let sweeper = Arc::clone(&sweeper);
                        if let Err(e) = tokio::task::spawn_blocking(move || sweeper.sweep_once()).await {
                            tracing::error!(error = %e, "Sweep task panicked");
                        }
                    }
                }
            }
            tracing::info!("Expiry sweeper stopped");
        });

        tracing::info!(
            interval_secs = interval.as_secs_f64(),
            ttl_secs = self.config.ttl.as_secs_f64(),
            "Expiry sweeper started"
        );
        *task = Some(RunningLoop { shutdown, handle });
        Ok(())
    }

    /// Signal the loop and wait for it to exit. An in-flight sweep finishes first.
    pub async fn stop(&self) {
        let running = self.task.lock().take();
        if let Some(running) = running {
            let _ = running.shutdown.send(true);
            if let Err(e) = running.handle.await {
                tracing::error!(error = %e, "Expiry sweeper task ended abnormally");
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.config.sweep_interval
    }

    fn mark_degraded(&self, reason: String) {
        tracing::warn!(%reason, "Sweeper degraded");
        self.stats.lock().health = SweeperHealth::Degraded { reason };
    }
}
