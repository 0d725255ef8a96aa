//! Table configuration and round state machine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TableConfig
// ---------------------------------------------------------------------------

/// Configuration shared by every table a server hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Seated players needed before a round starts.
    pub min_players: usize,

    /// Seats per table.
    pub max_players: usize,

    /// Whether players may watch instead of play.
    pub allow_spectators: bool,

    /// Maximum number of spectators (0 = unlimited when allowed).
    pub max_spectators: usize,

    /// The dealer draws until their hand is worth at least this much.
    pub dealer_stands_on: u8,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: 5,
            allow_spectators: true,
            max_spectators: 0,
            dealer_stands_on: 17,
        }
    }
}

impl TableConfig {
    /// Clamps values into ranges the table logic can work with.
    ///
    /// - `max_players` at least 1
    /// - `min_players` within `1..=max_players`
    /// - `dealer_stands_on` within `12..=21`
    pub fn validated(mut self) -> Self {
        self.max_players = self.max_players.max(1);
        self.min_players = self.min_players.clamp(1, self.max_players);
        self.dealer_stands_on = self.dealer_stands_on.clamp(12, 21);
        self
    }

    /// Returns `true` if one more spectator fits next to `current`.
    pub fn has_spectator_room(&self, current: usize) -> bool {
        self.allow_spectators && (self.max_spectators == 0 || current < self.max_spectators)
    }
}

// ---------------------------------------------------------------------------
// TablePhase
// ---------------------------------------------------------------------------

/// Where a table is in its round cycle.
///
/// ```text
/// WaitingForPlayers → InProgress → Finished → WaitingForPlayers → ...
/// ```
///
/// - **WaitingForPlayers**: seats open, no cards dealt.
/// - **InProgress**: cards dealt, players take turns.
/// - **Finished**: the dealer has played and results are out. Hands stay
///   visible until the round is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TablePhase {
    WaitingForPlayers,
    InProgress,
    Finished,
}

impl TablePhase {
    /// The phase that follows this one.
    pub fn next(self) -> Self {
        match self {
            Self::WaitingForPlayers => Self::InProgress,
            Self::InProgress => Self::Finished,
            Self::Finished => Self::WaitingForPlayers,
        }
    }

    /// Returns `true` if moving to `target` is a valid step.
    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == target
    }

    pub fn is_active(self) -> bool {
        matches!(self, Self::InProgress)
    }
}

impl std::fmt::Display for TablePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WaitingForPlayers => write!(f, "WaitingForPlayers"),
            Self::InProgress => write!(f, "InProgress"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_cycle() {
        assert_eq!(TablePhase::WaitingForPlayers.next(), TablePhase::InProgress);
        assert_eq!(TablePhase::InProgress.next(), TablePhase::Finished);
        assert_eq!(TablePhase::Finished.next(), TablePhase::WaitingForPlayers);
    }

    #[test]
    fn test_phase_can_transition_to() {
        assert!(TablePhase::WaitingForPlayers.can_transition_to(TablePhase::InProgress));
        assert!(!TablePhase::WaitingForPlayers.can_transition_to(TablePhase::Finished));
        assert!(!TablePhase::InProgress.can_transition_to(TablePhase::WaitingForPlayers));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(TablePhase::InProgress.to_string(), "InProgress");
    }

    #[test]
    fn test_table_config_default() {
        let config = TableConfig::default();
        assert_eq!(config.min_players, 1);
        assert_eq!(config.max_players, 5);
        assert!(config.allow_spectators);
        assert_eq!(config.dealer_stands_on, 17);
    }

    #[test]
    fn test_validated_clamps() {
        let config = TableConfig {
            min_players: 9,
            max_players: 0,
            dealer_stands_on: 30,
            ..TableConfig::default()
        }
        .validated();
        assert_eq!(config.max_players, 1);
        assert_eq!(config.min_players, 1);
        assert_eq!(config.dealer_stands_on, 21);
    }

    #[test]
    fn test_spectator_room() {
        let mut config = TableConfig::default();
        assert!(config.has_spectator_room(1000));
        config.max_spectators = 2;
        assert!(config.has_spectator_room(1));
        assert!(!config.has_spectator_room(2));
        config.allow_spectators = false;
        assert!(!config.has_spectator_room(0));
    }
}
