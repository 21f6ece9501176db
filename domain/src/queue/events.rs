use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::{BattlegroundTypeId, InstanceId, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InviteEventKind {
    /// Re-send the confirmation prompt.
    Remind,
    /// Evict the player if the invitation is still pending.
    Remove,
}

/// Deferred invitation callback. Stale once the group's invitation no longer matches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InviteEvent {
    pub kind: InviteEventKind,
    pub player_id: PlayerId,
    pub instance_id: InstanceId,
    pub bg_type_id: BattlegroundTypeId,
    pub remove_invite_time: Duration,
}

#[derive(Debug)]
struct Scheduled {
    fire_at: Duration,
    seq: u64,
    event: InviteEvent,
}

impl PartialEq for Scheduled {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scheduled {}

impl PartialOrd for Scheduled {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scheduled {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        (self.fire_at, self.seq).cmp(&(other.fire_at, other.seq))
    }
}

/// Min-heap of invitation callbacks keyed by fire time, ties broken by scheduling order.
#[derive(Debug, Default)]
pub struct TimedEvents {
    heap: BinaryHeap<Reverse<Scheduled>>,
    seq: u64,
}

impl TimedEvents {
    pub fn schedule(
        &mut self,
        fire_at: Duration,
        event: InviteEvent,
    ) {
        self.seq += 1;
        self.heap.push(Reverse(Scheduled {
            fire_at,
            seq: self.seq,
            event,
        }));
    }

    pub fn pop_due(
        &mut self,
        now: Duration,
    ) -> Option<InviteEvent> {
        match self.heap.peek() {
            Some(Reverse(next)) if next.fire_at <= now => self.heap.pop().map(|Reverse(s)| s.event),
            _ => None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
