//! Turn sequencing over a join-ordered roster.
//!
//! These helpers hold no state of their own: the next turn is always
//! re-derived from the latest roster snapshot, so players joining or
//! leaving between turns are tolerated without disrupting a turn that
//! was already granted.

use indexmap::IndexMap;

use crate::state::room::{Player, PlayerId};

/// Cyclic successor of `current` in the roster.
///
/// The roster map must already be ordered ascending by join time. When
/// `current` is no longer part of the roster (the player left), the turn
/// falls back to the earliest-joined player. Empty rosters have no turn.
pub fn next_player(roster: &IndexMap<PlayerId, Player>, current: PlayerId) -> Option<PlayerId> {
    if roster.is_empty() {
        return None;
    }

    let next_index = match roster.get_index_of(&current) {
        Some(index) => (index + 1) % roster.len(),
        None => 0,
    };
    roster.get_index(next_index).map(|(id, _)| *id)
}

/// Earliest-joined ready player: holder of the first turn and elected
/// writer of the lobby-to-playing transition.
pub fn first_ready_player(roster: &IndexMap<PlayerId, Player>) -> Option<PlayerId> {
    roster
        .values()
        .find(|player| player.is_ready)
        .map(|player| player.id)
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn roster_of(names: &[&str]) -> (IndexMap<PlayerId, Player>, Vec<PlayerId>) {
        let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let mut roster = IndexMap::new();
        let mut ids = Vec::new();
        for (offset, name) in names.iter().enumerate() {
            let id = PlayerId::new_v4();
            roster.insert(
                id,
                Player {
                    id,
                    name: (*name).into(),
                    is_ready: true,
                    board: None,
                    joined_at: base + time::Duration::seconds(offset as i64),
                },
            );
            ids.push(id);
        }
        (roster, ids)
    }

    #[test]
    fn next_is_cyclic_successor() {
        let (roster, ids) = roster_of(&["a", "b", "c"]);

        assert_eq!(next_player(&roster, ids[0]), Some(ids[1]));
        assert_eq!(next_player(&roster, ids[1]), Some(ids[2]));
        assert_eq!(next_player(&roster, ids[2]), Some(ids[0]));
    }

    #[test]
    fn unknown_current_falls_back_to_first() {
        let (roster, ids) = roster_of(&["a", "b"]);
        assert_eq!(next_player(&roster, PlayerId::new_v4()), Some(ids[0]));
    }

    #[test]
    fn empty_roster_has_no_turn() {
        let roster = IndexMap::new();
        assert_eq!(next_player(&roster, PlayerId::new_v4()), None);
    }

    #[test]
    fn first_ready_skips_unready_players() {
        let (mut roster, ids) = roster_of(&["a", "b", "c"]);
        roster.get_mut(&ids[0]).unwrap().is_ready = false;

        assert_eq!(first_ready_player(&roster), Some(ids[1]));
    }

    #[test]
    fn no_ready_players_elects_nobody() {
        let (mut roster, _) = roster_of(&["a", "b"]);
        for player in roster.values_mut() {
            player.is_ready = false;
        }
        assert_eq!(first_ready_player(&roster), None);
    }
}
