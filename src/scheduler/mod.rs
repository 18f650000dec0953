//! Deterministic discrete-event scheduler (spec.md §4.7), re-architected
//! per the redesign flag in spec.md §9: the Python original's two
//! module-level `threading.Event`s become one `tokio::sync::watch`
//! channel of `RunState`, owned by this struct rather than as process
//! globals — grounded in the same "background task + explicit state"
//! shape as the teacher's
//! `OrderFlowOrchestrator::start_persistence_worker`.

pub mod market_maker;
pub mod timeline;

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::SchedulerError;
use crate::world::World;
use timeline::{Action, Timeline};

/// Replaces the original's `_stop_event`/`_pause_event` pair: one
/// channel, mutually exclusive states, checked at every ≤100ms tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SchedulerSnapshot {
    pub sim_clock: u64,
    pub is_running: bool,
    pub is_paused: bool,
}

const TICK: Duration = Duration::from_millis(100);
const RESET_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Scheduler {
    world: Arc<RwLock<Arc<World>>>,
    config: AppConfig,
    state_tx: Mutex<watch::Sender<RunState>>,
    clock: Arc<AtomicU64>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(world: Arc<RwLock<Arc<World>>>, config: AppConfig) -> Self {
        let (tx, _rx) = watch::channel(RunState::Idle);
        Self { world, config, state_tx: Mutex::new(tx), clock: Arc::new(AtomicU64::new(0)), worker: Mutex::new(None) }
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        let state = *self.state_tx.lock().borrow();
        SchedulerSnapshot {
            sim_clock: self.clock.load(Ordering::Relaxed),
            is_running: matches!(state, RunState::Running | RunState::Paused),
            is_paused: matches!(state, RunState::Paused),
        }
    }

    /// idle→running or paused→running (spec.md §6 `/play`): a `/play`
    /// while paused is just `/resume` under another name, per the control
    /// table's "Transition idle→running or paused→running".
    pub fn start(&self) -> Result<(), SchedulerError> {
        {
            let tx = self.state_tx.lock();
            if matches!(*tx.borrow(), RunState::Paused) {
                drop(tx);
                return self.resume();
            }
            if !matches!(*tx.borrow(), RunState::Idle) {
                return Err(SchedulerError::AlreadyRunning);
            }
        }

        let tx = self.state_tx.lock();
        tx.send(RunState::Running).ok();

        let world = self.world.read().clone();
        let clock = self.clock.clone();
        let rx = tx.subscribe();
        let handle = tokio::spawn(run_timeline(world, Timeline::reference_scenario(), clock, rx));
        *self.worker.lock() = Some(handle);
        Ok(())
    }

    /// running,¬paused → paused (spec.md §6 `/pause`).
    pub fn pause(&self) -> Result<(), SchedulerError> {
        let tx = self.state_tx.lock();
        if !matches!(*tx.borrow(), RunState::Running) {
            return Err(SchedulerError::NotRunning);
        }
        tx.send(RunState::Paused).ok();
        Ok(())
    }

    /// running,paused → running (spec.md §6 `/resume`).
    pub fn resume(&self) -> Result<(), SchedulerError> {
        let tx = self.state_tx.lock();
        if !matches!(*tx.borrow(), RunState::Paused) {
            return Err(SchedulerError::NotPaused);
        }
        tx.send(RunState::Running).ok();
        Ok(())
    }

    /// Any → idle; wipes all mutable state (spec.md §6 `/reset`).
    pub async fn reset(&self) -> Result<(), SchedulerError> {
        let handle = {
            let tx = self.state_tx.lock();
            tx.send(RunState::Stopped).ok();
            self.worker.lock().take()
        };

        let mut timed_out = false;
        if let Some(handle) = handle {
            if tokio::time::timeout(RESET_JOIN_TIMEOUT, handle).await.is_err() {
                timed_out = true;
                warn!("scheduler worker did not join within the bounded reset wait");
            }
        }

        let fresh = World::fresh(&self.config);
        *self.world.write() = fresh;
        self.clock.store(0, Ordering::Relaxed);

        let (tx, _rx) = watch::channel(RunState::Idle);
        *self.state_tx.lock() = tx;

        if timed_out {
            return Err(SchedulerError::ResetTimedOut);
        }
        info!("scheduler reset complete, ready for a fresh start");
        Ok(())
    }
}

async fn run_timeline(world: Arc<World>, timeline: Timeline, clock: Arc<AtomicU64>, mut rx: watch::Receiver<RunState>) {
    info!("scheduler worker started");
    let mut next_action = 0usize;
    let mut elapsed_ms: u64 = 0;

    loop {
        match *rx.borrow() {
            RunState::Stopped | RunState::Idle => {
                info!("scheduler worker stopping");
                return;
            }
            RunState::Paused => {
                if rx.changed().await.is_err() {
                    return;
                }
                continue;
            }
            RunState::Running => {}
        }

        tokio::time::sleep(TICK).await;
        elapsed_ms += TICK.as_millis() as u64;
        let elapsed_s = elapsed_ms / 1000;
        clock.store(elapsed_s, Ordering::Relaxed);
        crate::metrics::record_sim_clock(elapsed_s);

        while next_action < timeline.entries.len() && timeline.entries[next_action].0 <= elapsed_s {
            let (_, action) = &timeline.entries[next_action];
            if let Err(err) = execute_action(&world, action) {
                error!(%err, "scripted action failed; terminating scheduler worker");
                return;
            }
            next_action += 1;
        }

        if next_action >= timeline.entries.len() {
            info!(sim_clock = elapsed_s, "scenario timeline exhausted");
            return;
        }
    }
}

fn execute_action(world: &World, action: &Action) -> Result<(), String> {
    match action {
        Action::FundAccount { trader, amount } => {
            world.ledger.credit(trader, *amount, crate::models::account::Field::Available);
            Ok(())
        }
        Action::CreateContract { id, contract_type, origin, final_destination, initial_shipper, max_prepaid_cost } => {
            world
                .contracts
                .create_contract(
                    &world.ledger,
                    id,
                    contract_type,
                    origin,
                    final_destination,
                    initial_shipper,
                    *max_prepaid_cost,
                    chrono::Utc::now(),
                    None,
                )
                .map(|_| ())
                .map_err(|e| e.to_string())
        }
        Action::AddLeg { leg_id, contract_id, origin, destination } => {
            world.contracts.add_leg(leg_id, contract_id, origin, destination);
            Ok(())
        }
        Action::OpenLegAuction { leg_id } => {
            let sim_time = 0; // opened at scenario start regardless of wall-clock tick
            world.contracts.open_leg_auction(leg_id, sim_time);
            Ok(())
        }
        Action::SubmitOrder { side, book_id, price, qty, trader, order_type, contract_id } => world
            .engine
            .submit(*side, book_id, *price, *qty, trader, *order_type, contract_id.clone())
            .map(|_| ())
            .map_err(|e| e.to_string()),
        Action::DeliverLeg { leg_id, contract_id } => {
            world.contracts.mark_leg_delivered(leg_id);
            world.settlement.on_delivery(leg_id, contract_id);
            Ok(())
        }
        Action::Log(message) => {
            info!("{message}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        let config = AppConfig::default();
        let world = Arc::new(RwLock::new(World::fresh(&config)));
        Scheduler::new(world, config)
    }

    #[test]
    fn snapshot_starts_idle() {
        let s = scheduler();
        let snap = s.snapshot();
        assert_eq!(snap.sim_clock, 0);
        assert!(!snap.is_running);
        assert!(!snap.is_paused);
    }

    #[test]
    fn pause_before_start_is_rejected() {
        let s = scheduler();
        assert!(matches!(s.pause(), Err(SchedulerError::NotRunning)));
    }

    #[tokio::test]
    async fn start_then_start_again_is_rejected() {
        let s = scheduler();
        s.start().unwrap();
        assert!(matches!(s.start(), Err(SchedulerError::AlreadyRunning)));
        s.reset().await.unwrap();
    }

    #[tokio::test]
    async fn reset_returns_scheduler_to_idle() {
        let s = scheduler();
        s.start().unwrap();
        s.reset().await.unwrap();
        let snap = s.snapshot();
        assert_eq!(snap.sim_clock, 0);
        assert!(!snap.is_running);
    }

    #[tokio::test]
    async fn play_while_paused_resumes_instead_of_rejecting() {
        let s = scheduler();
        s.start().unwrap();
        s.pause().unwrap();
        assert!(s.snapshot().is_paused);

        s.start().unwrap();

        let snap = s.snapshot();
        assert!(snap.is_running);
        assert!(!snap.is_paused);
        s.reset().await.unwrap();
    }
}
