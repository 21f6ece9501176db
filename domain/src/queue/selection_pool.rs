use crate::GroupId;

use super::GroupQueueInfo;

/// Outcome of offering a group to a [`SelectionPool`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolAdmission {
    pub accepted: bool,
    /// The pool is at or above capacity; further groups cannot fit.
    pub should_stop: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectedGroup {
    pub id: GroupId,
    pub size: usize,
}

/// Greedy accumulator of queued groups up to a player-count target.
#[derive(Clone, Debug, Default)]
pub struct SelectionPool {
    selected: Vec<SelectedGroup>,
    player_count: usize,
}

impl SelectionPool {
    pub fn reset(&mut self) {
        self.selected.clear();
        self.player_count = 0;
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    #[must_use]
    pub fn selected(&self) -> &[SelectedGroup] {
        &self.selected
    }

    pub fn group_ids(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.selected.iter().map(|g| g.id)
    }

    /// Adds `group` if it is not invited anywhere and fits within `capacity`.
    pub fn add_group(
        &mut self,
        group: &GroupQueueInfo,
        capacity: usize,
    ) -> PoolAdmission {
        if !group.is_invited() && self.player_count + group.size() <= capacity {
            self.selected.push(SelectedGroup {
                id: group.id,
                size: group.size(),
            });
            self.player_count += group.size();
            return PoolAdmission {
                accepted: true,
                should_stop: false,
            };
        }

        PoolAdmission {
            accepted: false,
            should_stop: self.player_count >= capacity,
        }
    }

    /// Evicts the last group within one player of `size`, falling back to the largest group.
    ///
    /// Returns `false` once a well-sized group was evicted, `true` while shrinking should go on.
    pub fn kick_group(
        &mut self,
        size: usize,
    ) -> bool {
        if self.selected.is_empty() {
            return true;
        }

        let mut found = false;
        let mut kick = 0;
        for (i, group) in self.selected.iter().enumerate() {
            if group.size.abs_diff(size) <= 1 {
                kick = i;
                found = true;
            } else if !found && group.size >= self.selected[kick].size {
                kick = i;
            }
        }

        let kicked = self.selected.remove(kick);
        self.player_count -= kicked.size;
        kicked.size > size + 1
    }
}
