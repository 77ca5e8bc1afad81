//! Room lifecycle state machine.
//!
//! Each client owns one instance and re-derives its view from the latest
//! authoritative snapshots plus its own locally known board. Decision
//! methods return *directives* describing the write to submit to the sync
//! adapter; they never perform I/O and they fail closed: an action that
//! does not pass its guards yields `None` with no state change, since the
//! authoritative truth is always the next snapshot.

use indexmap::IndexMap;
use thiserror::Error;

use crate::state::board::{self, Board, FinalBoard, MAX_VALUE};
use crate::state::room::{Player, PlayerId, Room, RoomCode, RoomStatus};
use crate::state::turns;
use crate::state::win::{self, LINES_TO_WIN};
use crate::sync::models::{PlayerRecord, RoomRecord};

/// Events that can be applied to a room's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Full ready roster observed; play begins with the elected starter.
    StartPlaying {
        /// Earliest-joined ready player, holder of the first turn.
        starter: PlayerId,
    },
    /// The turn holder picks an unpicked number.
    Pick {
        /// Acting player.
        by: PlayerId,
        /// Picked value, `1..=25`.
        value: u8,
    },
    /// A player's own line count reached five.
    DeclareWin {
        /// The winning player.
        winner: PlayerId,
    },
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the room was in when the event was evaluated.
    pub from: RoomStatus,
    /// The rejected event.
    pub event: RoomEvent,
}

/// Write directive: publish the finalized local board with the ready flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyDirective {
    /// The finalized layout to publish.
    pub board: FinalBoard,
}

/// Write directive: flip the room into active play.
///
/// Emitted only by the elected starter; the write is idempotent, so a
/// duplicate election under concurrent observation is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartDirective {
    /// First turn holder, identical for every observer of the roster.
    pub starter: PlayerId,
}

/// Write directive: append a pick and hand the turn over, atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickDirective {
    /// The full pick sequence including the new value.
    pub numbers_picked: Vec<u8>,
    /// Cyclic successor receiving the turn.
    pub next_turn: PlayerId,
}

/// Write directive: declare the local player the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinDirective {
    /// The winning player.
    pub winner: PlayerId,
}

/// Authoritative local view of one room, owned by a single client.
#[derive(Debug, Clone)]
pub struct RoomStateMachine {
    room: Room,
    roster: IndexMap<PlayerId, Player>,
    local_id: PlayerId,
    local_board: Board,
    ready_published: bool,
}

impl RoomStateMachine {
    /// Fresh machine for a lobby room, before any snapshot arrived.
    pub fn new(code: RoomCode, local_id: PlayerId) -> Self {
        Self {
            room: Room::new(code),
            roster: IndexMap::new(),
            local_id,
            local_board: Board::new(),
            ready_published: false,
        }
    }

    /// Shared room state as last reconciled.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Roster ordered ascending by join time.
    pub fn roster(&self) -> &IndexMap<PlayerId, Player> {
        &self.roster
    }

    /// Identity of the local participant.
    pub fn local_id(&self) -> PlayerId {
        self.local_id
    }

    /// The local player's board, possibly still under construction.
    pub fn local_board(&self) -> &Board {
        &self.local_board
    }

    /// Whether the local player may pick this instant.
    pub fn is_local_turn(&self) -> bool {
        matches!(self.room.status(), RoomStatus::Playing)
            && self.room.current_turn() == Some(self.local_id)
    }

    /// Completed lines on the local board given the shared picks.
    pub fn completed_lines(&self) -> usize {
        let Some(layout) = self.local_board.finalized() else {
            return 0;
        };
        let marked = win::marked_indices(&layout, self.room.numbers_picked());
        win::completed_lines(&marked)
    }

    /// Whether the liveness countdown should still auto-ready this client.
    pub fn auto_ready_pending(&self) -> bool {
        self.room.status().is_pregame() && !self.ready_published && !self.local_is_ready()
    }

    /// Place the next sequential value on the local board during setup.
    pub fn fill_cell(&mut self, index: usize) {
        if self.room.status().is_pregame() && !self.ready_published {
            self.local_board.fill_next_cell(index);
        }
    }

    /// Replace the local board with a fresh shuffle during setup.
    pub fn randomize_board(&mut self) {
        if self.room.status().is_pregame() && !self.ready_published {
            self.local_board = Board::shuffled();
        }
    }

    /// Reconcile the latest authoritative room record.
    ///
    /// Status only moves forward, the winner is write-once, and a pick
    /// sequence shorter than the known one is treated as a stale read.
    pub fn apply_room_snapshot(&mut self, record: &RoomRecord) {
        if record.id != *self.room.code() {
            return;
        }

        if let Some(winner) = record.winner_id {
            self.room.set_winner(winner);
        }
        self.room.advance_status(record.status);
        // The turn field travels with the pick sequence: a snapshot whose
        // picks are stale carries an equally stale turn holder, and
        // adopting it would let a client pass the turn guard it no longer
        // satisfies.
        let adopted = self.room.adopt_picks(record.numbers_picked.clone());
        if adopted && matches!(self.room.status(), RoomStatus::Playing) {
            self.room.set_current_turn(record.current_player_turn_id);
        }
    }

    /// Replace the roster with the latest listing, re-sorted by join time.
    ///
    /// When the authoritative record for the local player is ready and
    /// carries a valid board (reconnect case), it is adopted as the local
    /// layout. An unready record's board is ignored: boards are only
    /// published together with the ready flag, so anything else must not
    /// clobber a board still under construction.
    pub fn apply_roster(&mut self, records: Vec<PlayerRecord>) {
        let mut players: Vec<Player> = records.into_iter().map(Into::into).collect();
        players.sort_by_key(|player| (player.joined_at, player.id));
        self.roster = players
            .into_iter()
            .map(|player| (player.id, player))
            .collect();

        if let Some(local) = self.roster.get(&self.local_id)
            && local.is_ready
        {
            self.ready_published = true;
            if !self.local_board.is_complete()
                && let Some(layout) = local.board
                && board::is_permutation(&layout)
            {
                self.local_board = Board::from_final(layout);
            }
        }
    }

    /// Finalize the local board and request the ready publication.
    ///
    /// An incomplete board is completed with a fresh shuffle so gameplay
    /// can never start on empty cells. Returns `None` once ready has been
    /// requested or outside the pre-game states.
    pub fn ready_up(&mut self) -> Option<ReadyDirective> {
        if !self.room.status().is_pregame() || self.ready_published || self.local_is_ready() {
            return None;
        }

        let board = self.local_board.finalize_or_shuffle();
        self.ready_published = true;
        Some(ReadyDirective { board })
    }

    /// Re-enable the ready action after a failed publish, so the user can
    /// retry manually.
    pub fn retract_ready(&mut self) {
        if !self.local_is_ready() {
            self.ready_published = false;
        }
    }

    /// Evaluate the single-writer lobby-to-playing election.
    ///
    /// Fires only when the roster has at least two members, all of them
    /// ready, and the local player is the earliest-joined ready player.
    /// Every client evaluates the same roster snapshot, so all elect the
    /// same writer; a duplicate write is idempotent either way.
    pub fn maybe_start(&self) -> Option<StartDirective> {
        if self.roster.len() < 2 || !self.roster.values().all(|player| player.is_ready) {
            return None;
        }

        let starter = turns::first_ready_player(&self.roster)?;
        if starter != self.local_id {
            return None;
        }

        self.compute_transition(&RoomEvent::StartPlaying { starter })
            .ok()?;
        Some(StartDirective { starter })
    }

    /// Validate a local pick and compute its atomic room update.
    ///
    /// Rejected silently (returns `None`) unless the room is playing, it
    /// is the local player's turn, and the value has not been picked.
    pub fn propose_pick(&self, value: u8) -> Option<PickDirective> {
        self.compute_transition(&RoomEvent::Pick {
            by: self.local_id,
            value,
        })
        .ok()?;

        if self.room.current_turn() != Some(self.local_id) {
            return None;
        }
        if value == 0 || value > MAX_VALUE || self.room.is_picked(value) {
            return None;
        }

        let next_turn = turns::next_player(&self.roster, self.local_id)?;
        let mut numbers_picked = self.room.numbers_picked().to_vec();
        numbers_picked.push(value);
        Some(PickDirective {
            numbers_picked,
            next_turn,
        })
    }

    /// Emit the win declaration the first time the local count reaches
    /// five completed lines while the room is playing.
    pub fn check_win(&self) -> Option<WinDirective> {
        self.compute_transition(&RoomEvent::DeclareWin {
            winner: self.local_id,
        })
        .ok()?;

        if self.room.winner().is_some() || self.completed_lines() < LINES_TO_WIN {
            return None;
        }
        Some(WinDirective {
            winner: self.local_id,
        })
    }

    /// Self-heal an unfilled board encountered mid-game.
    ///
    /// A client that reaches `PLAYING` without a complete board (joined
    /// late or skipped setup) generates a fresh shuffle, marks itself
    /// ready, and publishes it, keeping every in-play board a full
    /// permutation without blocking the room.
    pub fn heal_board(&mut self) -> Option<ReadyDirective> {
        if !matches!(self.room.status(), RoomStatus::Playing) || self.local_board.is_complete() {
            return None;
        }

        let board = self.local_board.finalize_or_shuffle();
        self.ready_published = true;
        Some(ReadyDirective { board })
    }

    fn local_is_ready(&self) -> bool {
        self.roster
            .get(&self.local_id)
            .is_some_and(|player| player.is_ready)
    }

    /// Compute the status an event would transition into, if valid.
    fn compute_transition(&self, event: &RoomEvent) -> Result<RoomStatus, InvalidTransition> {
        let from = self.room.status();
        let next = match (from, event) {
            (RoomStatus::Lobby | RoomStatus::Setup, RoomEvent::StartPlaying { .. }) => {
                RoomStatus::Playing
            }
            (RoomStatus::Playing, RoomEvent::Pick { .. }) => RoomStatus::Playing,
            (RoomStatus::Playing, RoomEvent::DeclareWin { .. }) => RoomStatus::Finished,
            (from, event) => {
                return Err(InvalidTransition {
                    from,
                    event: event.clone(),
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::sync::models::RoomPatch;

    fn code() -> RoomCode {
        "AB12C".parse().unwrap()
    }

    fn identity_layout() -> FinalBoard {
        let mut layout = [0u8; 25];
        for (slot, value) in layout.iter_mut().zip(1..=25) {
            *slot = value;
        }
        layout
    }

    fn record(id: PlayerId, name: &str, offset_secs: i64, ready: bool) -> PlayerRecord {
        PlayerRecord {
            id,
            room_id: code(),
            name: name.into(),
            is_ready: ready,
            board: ready.then(identity_layout),
            joined_at: OffsetDateTime::from_unix_timestamp(1_700_000_000 + offset_secs).unwrap(),
        }
    }

    fn apply_patch(machine: &mut RoomStateMachine, patch: RoomPatch) {
        let mut snapshot = RoomRecord::from(machine.room());
        if let Some(status) = patch.status {
            snapshot.status = status;
        }
        if let Some(numbers) = patch.numbers_picked {
            snapshot.numbers_picked = numbers;
        }
        if let Some(turn) = patch.current_player_turn_id {
            snapshot.current_player_turn_id = turn;
        }
        if let Some(winner) = patch.winner_id {
            snapshot.winner_id = Some(winner);
        }
        machine.apply_room_snapshot(&snapshot);
    }

    #[test]
    fn lone_ready_player_does_not_start_the_game() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        machine.apply_roster(vec![record(local, "solo", 0, true)]);

        assert_eq!(machine.maybe_start(), None);
    }

    #[test]
    fn only_the_elected_starter_fires_the_playing_transition() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let roster = vec![record(first, "ana", 0, true), record(second, "ben", 1, true)];

        let mut early = RoomStateMachine::new(code(), first);
        early.apply_roster(roster.clone());
        assert_eq!(early.maybe_start(), Some(StartDirective { starter: first }));

        let mut late = RoomStateMachine::new(code(), second);
        late.apply_roster(roster);
        assert_eq!(late.maybe_start(), None);
    }

    #[test]
    fn unready_roster_member_blocks_the_start() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), first);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, false),
        ]);

        assert_eq!(machine.maybe_start(), None);
    }

    #[test]
    fn ready_up_completes_an_unfinished_board() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        machine.apply_roster(vec![record(local, "ana", 0, false)]);
        machine.fill_cell(3);

        let directive = machine.ready_up().expect("first ready should fire");
        assert!(board::is_permutation(&directive.board));

        // Ready never fires twice within the same round.
        assert_eq!(machine.ready_up(), None);
    }

    #[test]
    fn retract_ready_reenables_the_action_after_a_failed_write() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        machine.apply_roster(vec![record(local, "ana", 0, false)]);

        assert!(machine.ready_up().is_some());
        machine.retract_ready();
        assert!(machine.ready_up().is_some());
    }

    #[test]
    fn pick_requires_playing_status() {
        let local = PlayerId::new_v4();
        let machine = RoomStateMachine::new(code(), local);
        assert_eq!(machine.propose_pick(7), None);
    }

    #[test]
    fn pick_is_rejected_when_it_is_not_your_turn() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), second);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));

        assert_eq!(machine.propose_pick(7), None);
    }

    #[test]
    fn pick_is_rejected_for_already_picked_values() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), first);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));
        apply_patch(&mut machine, RoomPatch::pick(vec![7], first));

        assert_eq!(machine.propose_pick(7), None);
    }

    #[test]
    fn successful_pick_appends_and_hands_the_turn_over() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), first);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));

        let directive = machine.propose_pick(7).expect("legal pick");
        assert_eq!(directive.numbers_picked, vec![7]);
        assert_eq!(directive.next_turn, second);
    }

    #[test]
    fn win_fires_when_line_count_reaches_five() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), first);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));

        // Identity layout: values 1..=20 complete rows 0..=3, and 21
        // closes both the first column (1, 6, 11, 16, 21) and the
        // anti-diagonal (5, 9, 13, 17, 21), jumping from 4 to 6 lines.
        apply_patch(&mut machine, RoomPatch::pick((1..=20).collect(), second));
        assert_eq!(machine.completed_lines(), 4);
        assert_eq!(machine.check_win(), None);

        apply_patch(&mut machine, RoomPatch::pick((1..=21).collect(), second));
        assert_eq!(machine.completed_lines(), 6);
        assert_eq!(machine.check_win(), Some(WinDirective { winner: first }));
    }

    #[test]
    fn finished_room_accepts_no_further_actions() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), first);
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));
        apply_patch(&mut machine, RoomPatch::win(second));

        let picks_before = machine.room().numbers_picked().to_vec();
        assert_eq!(machine.propose_pick(3), None);
        assert_eq!(machine.check_win(), None);
        assert_eq!(machine.maybe_start(), None);
        assert_eq!(machine.room().numbers_picked(), picks_before.as_slice());
        assert_eq!(machine.room().winner(), Some(second));
        assert_eq!(machine.room().current_turn(), None);
    }

    #[test]
    fn stale_snapshots_cannot_rewind_the_room() {
        let local = PlayerId::new_v4();
        let other = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        machine.apply_roster(vec![
            record(local, "ana", 0, true),
            record(other, "ben", 1, true),
        ]);
        apply_patch(&mut machine, RoomPatch::start(local));
        apply_patch(&mut machine, RoomPatch::pick(vec![7, 12], other));

        // A stale read with fewer picks, an older status, and the turn
        // holder from before the handover arrives late.
        machine.apply_room_snapshot(&RoomRecord {
            id: code(),
            status: RoomStatus::Lobby,
            numbers_picked: vec![7],
            current_player_turn_id: Some(local),
            winner_id: None,
        });

        assert_eq!(machine.room().status(), RoomStatus::Playing);
        assert_eq!(machine.room().numbers_picked(), &[7, 12]);
        // The stale turn is not adopted either; picking again here would
        // advance a turn this client no longer holds.
        assert_eq!(machine.room().current_turn(), Some(other));
        assert_eq!(machine.propose_pick(3), None);
    }

    #[test]
    fn snapshots_for_other_rooms_are_ignored() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);

        machine.apply_room_snapshot(&RoomRecord {
            id: "ZZZZZ".parse().unwrap(),
            status: RoomStatus::Finished,
            numbers_picked: vec![1],
            current_player_turn_id: None,
            winner_id: Some(local),
        });

        assert_eq!(machine.room().status(), RoomStatus::Lobby);
        assert_eq!(machine.room().winner(), None);
    }

    #[test]
    fn heal_board_replaces_missing_layout_mid_game() {
        let first = PlayerId::new_v4();
        let second = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), second);
        // Joined late: never built a board, game already running.
        machine.apply_roster(vec![
            record(first, "ana", 0, true),
            record(second, "ben", 1, false),
        ]);
        apply_patch(&mut machine, RoomPatch::start(first));

        let directive = machine.heal_board().expect("incomplete board heals");
        assert!(board::is_permutation(&directive.board));
        assert!(machine.local_board().is_complete());
        assert_eq!(machine.heal_board(), None);
    }

    #[test]
    fn unready_roster_board_is_not_adopted() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        // An unready record carrying board data (e.g. a leftover from an
        // earlier round) must not clobber the board under construction.
        machine.apply_roster(vec![PlayerRecord {
            id: local,
            room_id: code(),
            name: "ana".into(),
            is_ready: false,
            board: Some(identity_layout()),
            joined_at: OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap(),
        }]);

        assert_eq!(machine.local_board().filled_count(), 0);
        machine.fill_cell(3);
        assert_eq!(machine.local_board().cells()[3], Some(1));
        assert!(machine.auto_ready_pending());
    }

    #[test]
    fn reconnect_adopts_the_published_board() {
        let local = PlayerId::new_v4();
        let mut machine = RoomStateMachine::new(code(), local);
        machine.apply_roster(vec![record(local, "ana", 0, true)]);

        assert_eq!(machine.local_board().finalized(), Some(identity_layout()));
        // The published ready state also disarms the countdown.
        assert!(!machine.auto_ready_pending());
    }

    #[test]
    fn full_round_between_two_players() {
        let a = PlayerId::new_v4();
        let b = PlayerId::new_v4();
        let roster = vec![record(a, "ana", 0, true), record(b, "ben", 1, true)];

        let mut machine_a = RoomStateMachine::new(code(), a);
        let mut machine_b = RoomStateMachine::new(code(), b);
        machine_a.apply_roster(roster.clone());
        machine_b.apply_roster(roster);

        // Only A is elected; its write reaches both as a snapshot.
        let start = machine_a.maybe_start().expect("A is the elected starter");
        assert_eq!(machine_b.maybe_start(), None);
        for machine in [&mut machine_a, &mut machine_b] {
            apply_patch(machine, RoomPatch::start(start.starter));
        }
        assert!(machine_a.is_local_turn());
        assert!(!machine_b.is_local_turn());

        // A picks 7; after the broadcast it is B's turn.
        let pick = machine_a.propose_pick(7).expect("A holds the turn");
        assert_eq!(pick.numbers_picked, vec![7]);
        for machine in [&mut machine_a, &mut machine_b] {
            apply_patch(
                machine,
                RoomPatch::pick(pick.numbers_picked.clone(), pick.next_turn),
            );
        }
        assert!(machine_b.is_local_turn());
        assert_eq!(machine_a.propose_pick(9), None);
        assert!(machine_b.propose_pick(9).is_some());
    }
}
