use tracing::{debug, error};

use super::{BattlegroundQueue, InvitationState, InviteEvent, InviteEventKind, wait_time_index};
use crate::{
    BattlegroundEffect, BattlegroundRegistry, BattlegroundStatus, GroupId, InstanceId, PlayerDirectory, QueueState,
    ScheduledQueueUpdate, Team,
};

impl BattlegroundQueue {
    /// Marks a group as invited to `instance_id` and prompts every online member.
    ///
    /// `side` overrides the group's team, as happens for skirmish and rated arena pairings.
    /// Returns `false` when the group was already invited.
    pub fn invite_group_to_bg(
        &mut self,
        registry: &mut BattlegroundRegistry,
        group_id: GroupId,
        instance_id: InstanceId,
        side: Option<Team>,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) -> bool {
        let now = registry.now();
        let accept_wait = registry.config().invite_accept_wait_time;
        let remind_after = registry.config().invitation_remind_time;

        let Some(group) = self.groups.get_mut(&group_id) else {
            return false;
        };
        if let Some(side) = side {
            group.team = side;
        }
        if group.is_invited() {
            return false;
        }

        let Some(bg) = registry.battleground_mut(instance_id) else {
            error!(%instance_id, group_id = group_id.0, "Inviting group to a missing battleground");
            return false;
        };

        let remove_invite_time = now + accept_wait;
        group.invitation = InvitationState::Invited {
            instance_id,
            remove_invite_time,
        };

        if bg.is_arena() && bg.is_rated() {
            bg.set_arena_team_id_for_team(group.team, group.ratings.arena_team_id);
        }

        let wait_sample = now.saturating_sub(group.join_time);
        let wait_index = wait_time_index(self.queue_type, group);
        let mut invited = 0;

        for &player_id in &group.players {
            if !directory.is_online(player_id) {
                continue;
            }
            invited += 1;
            bg.increase_invited_count(group.team);

            let event = |kind| InviteEvent {
                kind,
                player_id,
                instance_id,
                bg_type_id: group.bg_type_id,
                remove_invite_time,
            };
            self.events.schedule(now + remind_after, event(InviteEventKind::Remind));
            self.events.schedule(remove_invite_time, event(InviteEventKind::Remove));

            effects.push(BattlegroundEffect::status(
                player_id,
                self.queue_type,
                Some(group.ticket(player_id)),
                QueueState::NeedConfirmation {
                    instance_id,
                    client_instance_id: bg.client_instance_id(),
                    map_id: bg.map_id(),
                    timeout: accept_wait,
                },
            ));
        }

        debug!(
            group_id = group_id.0,
            %instance_id,
            team = ?group.team,
            players = invited,
            "Invited group to battleground"
        );

        let bracket_id = group.bracket_id;
        for _ in 0..invited {
            self.record_wait_time(wait_index, bracket_id, wait_sample);
        }
        true
    }

    /// Fires every reminder and eviction that is due at the registry clock.
    pub fn update_events(
        &mut self,
        registry: &mut BattlegroundRegistry,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        let now = registry.now();
        while let Some(event) = self.events.pop_due(now) {
            match event.kind {
                InviteEventKind::Remind => self.remind_invitation(registry, event, directory, effects),
                InviteEventKind::Remove => self.expire_invitation(registry, event, directory, effects),
            }
        }
    }

    fn remind_invitation(
        &self,
        registry: &BattlegroundRegistry,
        event: InviteEvent,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        if !directory.is_online(event.player_id) {
            return;
        }
        let Some(bg) = registry.battleground(event.instance_id) else {
            return;
        };
        if !self.is_player_invited(event.player_id, event.instance_id, event.remove_invite_time) {
            return;
        }
        let Some(group) = self.player_group(event.player_id) else {
            return;
        };

        let config = registry.config();
        effects.push(BattlegroundEffect::status(
            event.player_id,
            self.queue_type,
            Some(group.ticket(event.player_id)),
            QueueState::NeedConfirmation {
                instance_id: event.instance_id,
                client_instance_id: bg.client_instance_id(),
                map_id: bg.map_id(),
                timeout: config
                    .invite_accept_wait_time
                    .saturating_sub(config.invitation_remind_time),
            },
        ));
    }

    fn expire_invitation(
        &mut self,
        registry: &mut BattlegroundRegistry,
        event: InviteEvent,
        directory: &dyn PlayerDirectory,
        effects: &mut Vec<BattlegroundEffect>,
    ) {
        // offline players are dropped from their queues on logout
        if !directory.is_online(event.player_id) {
            return;
        }
        if !self.is_player_invited(event.player_id, event.instance_id, event.remove_invite_time) {
            return;
        }

        let ticket = self
            .player_group(event.player_id)
            .map(|group| group.ticket(event.player_id));
        debug!(
            player_id = %event.player_id,
            instance_id = %event.instance_id,
            bg_type_id = %event.bg_type_id,
            "Invitation expired, removing player from queue"
        );

        self.remove_player(registry, event.player_id, true, directory, effects);

        if let Some(bg) = registry.battleground(event.instance_id) {
            if !bg.is_arena() && bg.status() != BattlegroundStatus::WaitLeave {
                let bracket_id = bg.bracket_id();
                registry.schedule_queue_update(ScheduledQueueUpdate {
                    arena_matchmaker_rating: 0,
                    queue_type: self.queue_type,
                    bracket_id,
                });
            }
        }

        effects.push(BattlegroundEffect::status(
            event.player_id,
            self.queue_type,
            ticket,
            QueueState::None,
        ));
    }
}
