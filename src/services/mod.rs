/// In-game actions: readying up, board edits, and number picks.
pub mod gameplay;
/// Room creation and joining.
pub mod lobby;
/// Long-running per-room session loop reacting to remote changes.
pub mod session;
