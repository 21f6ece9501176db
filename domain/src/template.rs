use std::collections::HashMap;

use rand::Rng;
use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{BattlegroundTypeId, BracketId, MapId, PerTeam, Position};

fn default_weight() -> u32 {
    1
}

/// Static per-type battleground configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattlegroundTemplate {
    pub id: BattlegroundTypeId,
    pub name: String,
    /// More than one map marks a random type resolved by weight on instantiation.
    pub map_ids: Vec<MapId>,
    pub min_players_per_team: u32,
    pub max_players_per_team: u32,
    pub min_level: u8,
    pub max_level: u8,
    pub start_locations: PerTeam<Position>,
    /// Stragglers further than this from their start location are sent back during preparation.
    #[serde(default)]
    pub start_max_dist: f32,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub is_arena: bool,
}

impl BattlegroundTemplate {
    #[must_use]
    pub fn map_id(&self) -> MapId {
        self.map_ids.first().copied().unwrap_or(MapId(0))
    }

    #[must_use]
    pub fn is_random(&self) -> bool {
        self.map_ids.len() > 1
    }
}

/// Level range partition of a map's queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketEntry {
    pub map_id: MapId,
    pub bracket_id: BracketId,
    pub min_level: u8,
    pub max_level: u8,
}

#[derive(Clone, Debug, Default)]
pub struct BattlegroundCatalog {
    templates: HashMap<BattlegroundTypeId, BattlegroundTemplate>,
    brackets: Vec<BracketEntry>,
}

impl BattlegroundCatalog {
    #[must_use]
    pub fn new(
        templates: Vec<BattlegroundTemplate>,
        brackets: Vec<BracketEntry>,
    ) -> Self {
        Self {
            templates: templates.into_iter().map(|t| (t.id, t)).collect(),
            brackets,
        }
    }

    #[must_use]
    pub fn template(
        &self,
        bg_type_id: BattlegroundTypeId,
    ) -> Option<&BattlegroundTemplate> {
        self.templates.get(&bg_type_id)
    }

    pub fn templates(&self) -> impl Iterator<Item = &BattlegroundTemplate> {
        self.templates.values()
    }

    #[must_use]
    pub fn template_by_map(
        &self,
        map_id: MapId,
    ) -> Option<&BattlegroundTemplate> {
        self.templates
            .values()
            .find(|t| !t.is_random() && t.map_ids.first() == Some(&map_id))
    }

    #[must_use]
    pub fn bracket_by_level(
        &self,
        map_id: MapId,
        level: u8,
    ) -> Option<&BracketEntry> {
        self.brackets
            .iter()
            .find(|b| b.map_id == map_id && (b.min_level..=b.max_level).contains(&level))
    }

    #[must_use]
    pub fn bracket_by_id(
        &self,
        map_id: MapId,
        bracket_id: BracketId,
    ) -> Option<&BracketEntry> {
        self.brackets
            .iter()
            .find(|b| b.map_id == map_id && b.bracket_id == bracket_id)
    }

    pub fn brackets_for_map(
        &self,
        map_id: MapId,
    ) -> impl Iterator<Item = &BracketEntry> {
        self.brackets.iter().filter(move |b| b.map_id == map_id)
    }

    /// Picks the concrete type a (possibly random) type instantiates as, weighted by template weight.
    pub fn resolve_concrete_type<R: Rng>(
        &self,
        bg_type_id: BattlegroundTypeId,
        rng: &mut R,
    ) -> Option<BattlegroundTypeId> {
        let template = self.template(bg_type_id)?;
        if !template.is_random() {
            return Some(bg_type_id);
        }

        let candidates: Vec<&BattlegroundTemplate> = template
            .map_ids
            .iter()
            .filter_map(|&map_id| self.template_by_map(map_id))
            .collect();

        let weights = candidates.iter().map(|t| t.weight);
        let index = match WeightedIndex::new(weights) {
            Ok(index) => index,
            Err(e) => {
                error!(bg_type_id = %bg_type_id, error = %e, "No weighted candidate for random battleground");
                return None;
            }
        };
        Some(candidates[index.sample(rng)].id)
    }
}
