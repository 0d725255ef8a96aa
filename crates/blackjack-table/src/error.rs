//! Error types for the table layer.

use blackjack_transport::PeerAddr;

use crate::TablePhase;

/// Rule violations raised by tables and the lobby.
///
/// None of these are fatal. The lobby turns them into a private notice to
/// the player who caused them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// No table has this index.
    #[error("table {0} does not exist")]
    NoSuchTable(usize),

    /// Every seat at the table is taken.
    #[error("table {0} is full")]
    TableFull(usize),

    /// The table does not take spectators, or has no room for more.
    #[error("table {0} has no room for spectators")]
    NoSpectatorRoom(usize),

    /// The player is not at this table (or at any table).
    #[error("{0} is not at a table")]
    NotAtTable(PeerAddr),

    /// The player is already at this table.
    #[error("{0} is already at table {1}")]
    AlreadyAtTable(PeerAddr, usize),

    /// A move arrived from someone whose turn it isn't.
    #[error("it is not {0}'s turn")]
    NotYourTurn(PeerAddr),

    /// The player is dealt into the current round and can't switch roles.
    #[error("{0} is playing the current round")]
    InRound(PeerAddr),

    /// The table is in the wrong phase for this operation.
    #[error("table {table} is {phase}")]
    InvalidPhase { table: usize, phase: TablePhase },

    /// A round can't start without enough seated players.
    #[error("table {table} needs {needed} players, has {seated}")]
    NotEnoughPlayers {
        table: usize,
        seated: usize,
        needed: usize,
    },

    /// A message came from a peer the lobby has never seen connect.
    #[error("unknown player {0}")]
    UnknownPlayer(PeerAddr),

    /// A display name was empty or too long.
    #[error("invalid display name: {0}")]
    InvalidName(String),

    /// The chat line with the author's name in front is over the string limit.
    #[error("chat message too long ({len} bytes, max {max})")]
    ChatTooLong { len: usize, max: usize },
}
