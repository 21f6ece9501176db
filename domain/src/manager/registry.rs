use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info};

use crate::{
    Battleground, BattlegroundCatalog, BattlegroundConfig, BattlegroundEffect, BattlegroundParams, BattlegroundTypeId,
    BracketEntry, BracketId, InstanceId, MatchContext, PlayerDirectory, PlayerId, QueueTypeId,
};

/// Request to run a matchmaking pass over one bracket on the next tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScheduledQueueUpdate {
    pub arena_matchmaker_rating: u32,
    pub queue_type: QueueTypeId,
    pub bracket_id: BracketId,
}

/// Live battlegrounds and the indices over them.
///
/// Owns the domain clock, advanced by the manager tick.
#[derive(Debug)]
pub struct BattlegroundRegistry {
    config: BattlegroundConfig,
    catalog: BattlegroundCatalog,
    now: Duration,
    battlegrounds: BTreeMap<InstanceId, Battleground>,
    free_slot_queue: HashMap<BattlegroundTypeId, VecDeque<InstanceId>>,
    client_ids: HashMap<(BattlegroundTypeId, BracketId), BTreeSet<u32>>,
    next_instance_id: u32,
    next_match_id: u64,
    scheduled_updates: Vec<ScheduledQueueUpdate>,
    random_winners: HashSet<PlayerId>,
    rng: StdRng,
}

impl BattlegroundRegistry {
    #[must_use]
    pub fn new(
        config: BattlegroundConfig,
        catalog: BattlegroundCatalog,
    ) -> Self {
        Self {
            config,
            catalog,
            now: Duration::ZERO,
            battlegrounds: BTreeMap::new(),
            free_slot_queue: HashMap::new(),
            client_ids: HashMap::new(),
            next_instance_id: 0,
            next_match_id: 0,
            scheduled_updates: Vec::new(),
            random_winners: HashSet::new(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Makes random battleground resolution reproducible.
    #[must_use]
    pub fn with_seed(
        mut self,
        seed: u64,
    ) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn advance(
        &mut self,
        diff: Duration,
    ) {
        self.now += diff;
    }

    #[must_use]
    pub fn config(&self) -> &BattlegroundConfig {
        &self.config
    }

    #[must_use]
    pub fn catalog(&self) -> &BattlegroundCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn battleground(
        &self,
        instance_id: InstanceId,
    ) -> Option<&Battleground> {
        self.battlegrounds.get(&instance_id)
    }

    pub fn battleground_mut(
        &mut self,
        instance_id: InstanceId,
    ) -> Option<&mut Battleground> {
        self.battlegrounds.get_mut(&instance_id)
    }

    pub fn battlegrounds(&self) -> impl Iterator<Item = &Battleground> {
        self.battlegrounds.values()
    }

    #[must_use]
    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.battlegrounds.keys().copied().collect()
    }

    /// Instance currently seating `player_id`.
    #[must_use]
    pub fn battleground_of(
        &self,
        player_id: PlayerId,
    ) -> Option<InstanceId> {
        self.battlegrounds
            .values()
            .find(|bg| bg.roster().contains(player_id))
            .map(Battleground::instance_id)
    }

    /// Runs `f` on a live battleground with a context wired to this registry.
    pub fn with_battleground<T>(
        &mut self,
        instance_id: InstanceId,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
        f: impl FnOnce(&mut Battleground, &mut MatchContext<'_>) -> T,
    ) -> Option<T> {
        let bg = self.battlegrounds.get_mut(&instance_id)?;
        let mut ctx = MatchContext {
            now: self.now,
            config: &self.config,
            directory,
            effects,
            queue_updates: &mut self.scheduled_updates,
            next_match_id: &mut self.next_match_id,
            random_winners: &mut self.random_winners,
        };
        let out = f(bg, &mut ctx);
        self.sync_free_slot_index(instance_id);
        Some(out)
    }

    /// Instantiates a battleground for `queue_type`, resolving random types first.
    pub fn create_battleground(
        &mut self,
        queue_type: QueueTypeId,
        bracket: BracketEntry,
        is_rated: bool,
    ) -> Option<InstanceId> {
        let bg_type_id = queue_type.battlemaster_list_id;
        let Some(concrete_type_id) = self.catalog.resolve_concrete_type(bg_type_id, &mut self.rng) else {
            error!(%bg_type_id, "Cannot resolve battleground type");
            return None;
        };
        let Some(template) = self.catalog.template(concrete_type_id) else {
            error!(%concrete_type_id, "Battleground template not found");
            return None;
        };

        self.next_instance_id += 1;
        let instance_id = InstanceId(self.next_instance_id);
        let client_instance_id = if template.is_arena {
            0
        } else {
            let ids = self
                .client_ids
                .entry((bg_type_id, bracket.bracket_id))
                .or_default();
            let mut last = 0;
            for &id in ids.iter() {
                if id != last + 1 {
                    break;
                }
                last = id;
            }
            ids.insert(last + 1);
            last + 1
        };

        let bg = Battleground::new(BattlegroundParams {
            instance_id,
            client_instance_id,
            queue_type,
            template,
            bracket,
            is_rated,
        });
        info!(
            %instance_id,
            client_instance_id,
            name = bg.name(),
            %bg_type_id,
            bracket_id = bracket.bracket_id.0,
            is_rated,
            "Created battleground"
        );
        self.battlegrounds.insert(instance_id, bg);
        Some(instance_id)
    }

    pub fn start_battleground(
        &mut self,
        instance_id: InstanceId,
    ) {
        if let Some(bg) = self.battlegrounds.get_mut(&instance_id) {
            bg.start_battleground();
        }
        self.sync_free_slot_index(instance_id);
    }

    pub fn remove_battleground(
        &mut self,
        instance_id: InstanceId,
    ) -> Option<Battleground> {
        let bg = self.battlegrounds.remove(&instance_id)?;
        if bg.client_instance_id() != 0 {
            if let Some(ids) = self.client_ids.get_mut(&(bg.type_id(), bg.bracket_id())) {
                ids.remove(&bg.client_instance_id());
            }
        }
        if let Some(queue) = self.free_slot_queue.get_mut(&bg.type_id()) {
            queue.retain(|id| *id != instance_id);
        }
        debug!(%instance_id, "Deleted battleground");
        Some(bg)
    }

    /// Standard matches of `bg_type_id` currently advertising free seats, newest first.
    pub fn free_slot_instances(
        &mut self,
        bg_type_id: BattlegroundTypeId,
    ) -> Vec<InstanceId> {
        let Some(queue) = self.free_slot_queue.get_mut(&bg_type_id) else {
            return Vec::new();
        };
        let battlegrounds = &self.battlegrounds;
        queue.retain(|id| battlegrounds.get(id).is_some_and(Battleground::in_free_slot_queue));
        queue.iter().copied().collect()
    }

    /// Brings the free-slot index in line with the battleground's own listing flag.
    pub fn sync_free_slot_index(
        &mut self,
        instance_id: InstanceId,
    ) {
        let Some(bg) = self.battlegrounds.get(&instance_id) else {
            for queue in self.free_slot_queue.values_mut() {
                queue.retain(|id| *id != instance_id);
            }
            return;
        };
        let queue = self.free_slot_queue.entry(bg.type_id()).or_default();
        let listed = queue.contains(&instance_id);
        if bg.in_free_slot_queue() && !listed {
            queue.push_front(instance_id);
        } else if !bg.in_free_slot_queue() && listed {
            queue.retain(|id| *id != instance_id);
        }
    }

    pub fn schedule_queue_update(
        &mut self,
        update: ScheduledQueueUpdate,
    ) {
        if !self.scheduled_updates.contains(&update) {
            self.scheduled_updates.push(update);
        }
    }

    #[must_use]
    pub fn scheduled_updates(&self) -> &[ScheduledQueueUpdate] {
        &self.scheduled_updates
    }

    pub fn take_scheduled_updates(&mut self) -> Vec<ScheduledQueueUpdate> {
        std::mem::take(&mut self.scheduled_updates)
    }
}
