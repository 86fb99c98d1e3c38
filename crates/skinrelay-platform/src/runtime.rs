//! A reference region runtime: one OS thread per region.
//!
//! Each region thread owns the players it ticks and drains a queue of tasks.
//! A player lives in exactly one region; moving them hands the player over
//! to the target region's queue, and until the target admits them no region
//! owns them.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{mpsc, Arc, Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;

use tokio::sync::oneshot;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{PlatformError, PlatformResult};
use crate::host::{
    HostPlayer, PlayerDirectory, PlayerLocation, Position, RegionContext, RegionId, RegionScheduler,
    RegionTask,
};

enum Message {
    Run(RegionTask),
    Admit(Box<dyn HostPlayer>, Position),
    Transfer(Uuid, mpsc::Sender<Message>, Position),
    Evict(Uuid),
    Stop,
}

type Locations = Arc<RwLock<HashMap<Uuid, PlayerLocation>>>;

struct RegionHandle {
    sender: mpsc::Sender<Message>,
    thread: Option<JoinHandle<()>>,
}

struct RegionState {
    id: RegionId,
    players: HashMap<Uuid, Box<dyn HostPlayer>>,
    locations: Locations,
}

impl RegionContext for RegionState {
    fn region(&self) -> RegionId {
        self.id
    }

    fn player_mut(&mut self, uuid: Uuid) -> Option<&mut dyn HostPlayer> {
        self.players.get_mut(&uuid).map(|p| &mut **p as &mut dyn HostPlayer)
    }
}

impl RegionState {
    fn run(mut self, queue: mpsc::Receiver<Message>) {
        while let Ok(message) = queue.recv() {
            match message {
                Message::Run(task) => {
                    if catch_unwind(AssertUnwindSafe(|| task(&mut self))).is_err() {
                        warn!(region = %self.id, "region task panicked");
                    }
                }
                Message::Admit(player, position) => {
                    let uuid = player.uuid();
                    // a player who left while in transit stays gone
                    if let Some(location) = write(&self.locations).get_mut(&uuid) {
                        location.region = Some(self.id);
                        location.position = position;
                        self.players.insert(uuid, player);
                    }
                }
                Message::Transfer(uuid, target, position) => {
                    if let Some(player) = self.players.remove(&uuid) {
                        if target.send(Message::Admit(player, position)).is_err() {
                            warn!(uuid = %uuid, "target region stopped, player dropped");
                            write(&self.locations).remove(&uuid);
                        }
                    }
                }
                Message::Evict(uuid) => {
                    self.players.remove(&uuid);
                }
                Message::Stop => break,
            }
        }
        debug!(region = %self.id, "region thread stopped");
    }
}

fn write(locations: &Locations) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, PlayerLocation>> {
    locations.write().unwrap_or_else(PoisonError::into_inner)
}

/// Region threads plus the directory of where each player is.
///
/// Cloning shares the same threads.
#[derive(Clone)]
pub struct RegionRuntime {
    regions: Arc<Mutex<HashMap<RegionId, RegionHandle>>>,
    locations: Locations,
}

impl std::fmt::Debug for RegionRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionRuntime")
            .field("regions", &self.regions())
            .finish()
    }
}

impl Default for RegionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionRuntime {
    /// A runtime with only the main region running.
    pub fn new() -> Self {
        let runtime = Self {
            regions: Arc::new(Mutex::new(HashMap::new())),
            locations: Arc::new(RwLock::new(HashMap::new())),
        };
        if let Err(err) = runtime.ensure_region(RegionId::MAIN) {
            warn!(error = %err, "failed to start main region");
        }
        runtime
    }

    pub fn regions(&self) -> Vec<RegionId> {
        let mut ids: Vec<_> = self.lock_regions().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Start `region`'s thread if it is not running yet.
    pub fn ensure_region(&self, region: RegionId) -> PlatformResult<()> {
        self.sender(region, true).map(|_| ())
    }

    /// Place a connected player into `region`.
    pub fn join(
        &self,
        player: Box<dyn HostPlayer>,
        region: RegionId,
        position: Position,
    ) -> PlatformResult<()> {
        let uuid = player.uuid();
        let external = player.is_external();
        let sender = self.sender(region, true)?;
        // visible to the directory right away; the admit is queued ahead of
        // any task submitted after this call
        write(&self.locations).insert(
            uuid,
            PlayerLocation {
                uuid,
                region: Some(region),
                position,
                external,
            },
        );
        sender
            .send(Message::Admit(player, position))
            .map_err(|_| closed(region))?;
        debug!(uuid = %uuid, region = %region, external, "player joined");
        Ok(())
    }

    /// Hand a player over to another region.
    pub fn move_player(&self, uuid: Uuid, to: RegionId, position: Position) -> PlatformResult<()> {
        let from = {
            let mut locations = write(&self.locations);
            let Some(location) = locations.get_mut(&uuid) else {
                return Ok(());
            };
            let from = location.region;
            location.region = None;
            location.position = position;
            from
        };
        let Some(from) = from else {
            return Ok(());
        };

        let target = self.sender(to, true)?;
        self.sender(from, false)?
            .send(Message::Transfer(uuid, target, position))
            .map_err(|_| closed(from))?;
        debug!(uuid = %uuid, from = %from, to = %to, "player moving");
        Ok(())
    }

    /// Disconnect a player.
    pub fn leave(&self, uuid: Uuid) {
        let location = write(&self.locations).remove(&uuid);
        if let Some(region) = location.and_then(|l| l.region) {
            if let Ok(sender) = self.sender(region, false) {
                let _ = sender.send(Message::Evict(uuid));
            }
        }
        debug!(uuid = %uuid, "player left");
    }

    /// Run `f` on `region`'s thread and wait for its result.
    pub async fn run_on<T, F>(&self, region: RegionId, f: F) -> PlatformResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn RegionContext) -> T + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.submit(
            region,
            Box::new(move |ctx| {
                let _ = tx.send(f(ctx));
            }),
        )?;
        rx.await.map_err(|_| closed(region))
    }

    /// Stop every region thread and wait for them to exit.
    pub fn shutdown(&self) {
        let handles: Vec<_> = self.lock_regions().drain().collect();
        for (_, handle) in &handles {
            let _ = handle.sender.send(Message::Stop);
        }
        for (region, mut handle) in handles {
            if let Some(thread) = handle.thread.take() {
                if thread.join().is_err() {
                    warn!(region = %region, "region thread panicked");
                }
            }
        }
        write(&self.locations).clear();
    }

    fn lock_regions(&self) -> std::sync::MutexGuard<'_, HashMap<RegionId, RegionHandle>> {
        self.regions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sender(&self, region: RegionId, start: bool) -> PlatformResult<mpsc::Sender<Message>> {
        let mut regions = self.lock_regions();
        if let Some(handle) = regions.get(&region) {
            return Ok(handle.sender.clone());
        }
        if !start {
            return Err(closed(region));
        }

        let (sender, queue) = mpsc::channel();
        let state = RegionState {
            id: region,
            players: HashMap::new(),
            locations: Arc::clone(&self.locations),
        };
        let thread = std::thread::Builder::new()
            .name(region.to_string())
            .spawn(move || state.run(queue))
            .map_err(|_| closed(region))?;
        regions.insert(
            region,
            RegionHandle {
                sender: sender.clone(),
                thread: Some(thread),
            },
        );
        debug!(region = %region, "started region thread");
        Ok(sender)
    }
}

fn closed(region: RegionId) -> PlatformError {
    PlatformError::SchedulerClosed {
        region: region.to_string(),
    }
}

impl RegionScheduler for RegionRuntime {
    fn submit(&self, region: RegionId, task: RegionTask) -> PlatformResult<()> {
        self.sender(region, false)?
            .send(Message::Run(task))
            .map_err(|_| closed(region))
    }
}

impl PlayerDirectory for RegionRuntime {
    fn locate(&self, uuid: Uuid) -> Vec<PlayerLocation> {
        self.locations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&uuid)
            .copied()
            .into_iter()
            .collect()
    }
}
