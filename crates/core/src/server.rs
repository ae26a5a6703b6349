//! Live server facts as reported by the query collaborator.
//!
//! A [`ServerInfo`] is an immutable record of one server at query time. The
//! engine never builds these itself; they come from a [`crate::ServerQuery`]
//! implementation and are only read afterwards.

use regex::Regex;
use std::fmt;
use std::net::SocketAddr;
use std::sync::LazyLock;

static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^[0-9A-Za-z]").expect("static colour code pattern"));

/// Remove `^N` colour escapes from an arena string.
pub fn strip_colors(s: &str) -> String {
    COLOR_CODE.replace_all(s, "").into_owned()
}

// ============================================================================
// Identities
// ============================================================================

/// Stable key for a server across polls.
///
/// Derived from the network address only. Display names can be empty,
/// change between map rotations or collide, so they are rendering data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerIdentity(SocketAddr);

impl ServerIdentity {
    pub const fn new(address: SocketAddr) -> Self {
        Self(address)
    }

    pub const fn address(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for ServerIdentity {
    fn from(address: SocketAddr) -> Self {
        Self(address)
    }
}

impl fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery destination (a chat room id, a channel name...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DestinationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Game modes
// ============================================================================

/// OpenArena gametypes, indexed by the `g_gametype` cvar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    Ffa,
    Tournament,
    SinglePlayer,
    Team,
    Ctf,
    OneFlag,
    Obelisk,
    Harvester,
    Elimination,
    CtfElimination,
    Lms,
    DoubleDomination,
    Domination,
    Possession,
    MultiTournament,
    Other(u8),
}

impl GameMode {
    pub fn from_gametype(gametype: u8) -> Self {
        match gametype {
            0 => Self::Ffa,
            1 => Self::Tournament,
            2 => Self::SinglePlayer,
            3 => Self::Team,
            4 => Self::Ctf,
            5 => Self::OneFlag,
            6 => Self::Obelisk,
            7 => Self::Harvester,
            8 => Self::Elimination,
            9 => Self::CtfElimination,
            10 => Self::Lms,
            11 => Self::DoubleDomination,
            12 => Self::Domination,
            13 => Self::Possession,
            14 => Self::MultiTournament,
            n => Self::Other(n),
        }
    }

    /// Short label used in notifications ("FFA", "CTF"...).
    pub fn label(&self) -> String {
        match self {
            Self::Ffa => "FFA".to_string(),
            Self::Tournament => "TOURNAMENT".to_string(),
            Self::SinglePlayer => "SINGLE_PLAYER".to_string(),
            Self::Team => "TDM".to_string(),
            Self::Ctf => "CTF".to_string(),
            Self::OneFlag => "1FCTF".to_string(),
            Self::Obelisk => "OVERLOAD".to_string(),
            Self::Harvester => "HARVESTER".to_string(),
            Self::Elimination => "ELIMINATION".to_string(),
            Self::CtfElimination => "CTF_ELIMINATION".to_string(),
            Self::Lms => "LMS".to_string(),
            Self::DoubleDomination => "DOUBLE_D".to_string(),
            Self::Domination => "DOMINATION".to_string(),
            Self::Possession => "POSSESSION".to_string(),
            Self::MultiTournament => "MULTITOURNAMENT".to_string(),
            Self::Other(n) => format!("GT{}", n),
        }
    }

    /// One-versus-one modes.
    pub fn is_head_to_head(&self) -> bool {
        matches!(self, Self::Tournament | Self::MultiTournament)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ============================================================================
// Server info
// ============================================================================

/// A player line from a status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub score: i32,
    pub ping: u32,
}

impl Player {
    /// Bots always report a zero ping.
    pub fn is_likely_human(&self) -> bool {
        self.ping > 0
    }

    pub fn plain_name(&self) -> String {
        strip_colors(&self.name)
    }
}

/// Snapshot of one server's live state at query time.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub address: SocketAddr,
    pub name: String,
    pub map: String,
    pub game_mode: GameMode,
    pub max_clients: u32,
    pub players: Vec<Player>,
}

impl ServerInfo {
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity::new(self.address)
    }

    /// Population as far as notifications are concerned.
    pub fn num_humans(&self) -> u32 {
        let humans = self.players.iter().filter(|p| p.is_likely_human()).count();
        u32::try_from(humans).unwrap_or(u32::MAX)
    }

    pub fn num_clients(&self) -> usize {
        self.players.len()
    }

    /// Colour-stripped names of the likely human players, in server order.
    pub fn human_names(&self) -> Vec<String> {
        self.players
            .iter()
            .filter(|p| p.is_likely_human())
            .map(Player::plain_name)
            .collect()
    }

    pub fn plain_name(&self) -> String {
        strip_colors(&self.name)
    }

    pub fn plain_map(&self) -> String {
        strip_colors(&self.map)
    }
}
