//! `statusResponse` parsing.
//!
//! Datagram layout:
//!
//! ```text
//! \xff\xff\xff\xffstatusResponse\n
//! \key\value\key\value...\n
//! <score> <ping> "<name>"\n
//! ...
//! ```

use crate::QueryError;
use ratstalker_core::{GameMode, Player, ServerInfo};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Out-of-band packet prefix
pub const OOB_PREFIX: &[u8] = b"\xff\xff\xff\xff";
/// Request sent to every server
pub const GETSTATUS: &[u8] = b"\xff\xff\xff\xffgetstatus\n";

const STATUS_RESPONSE: &str = "statusResponse";

/// Parse one `statusResponse` datagram from `address`.
pub fn parse_status(address: SocketAddr, datagram: &[u8]) -> Result<ServerInfo, QueryError> {
    let body = datagram
        .strip_prefix(OOB_PREFIX)
        .ok_or(QueryError::BadHeader)?;
    // Names are arbitrary bytes; keep what decodes
    let text = String::from_utf8_lossy(body);
    let mut lines = text.split('\n');

    match lines.next() {
        Some(header) if header.trim_end() == STATUS_RESPONSE => {}
        _ => return Err(QueryError::BadHeader),
    }

    let info = lines
        .next()
        .filter(|line| line.starts_with('\\'))
        .map(parse_info)
        .ok_or(QueryError::MissingInfo)?;

    let players = lines
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(parse_player)
        .collect::<Result<Vec<_>, _>>()?;

    let game_mode = info
        .get("g_gametype")
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(GameMode::from_gametype)
        .unwrap_or(GameMode::Ffa);
    let max_clients = info
        .get("sv_maxclients")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .unwrap_or(0);

    Ok(ServerInfo {
        address,
        name: info.get("sv_hostname").cloned().unwrap_or_default(),
        map: info.get("mapname").cloned().unwrap_or_default(),
        game_mode,
        max_clients,
        players,
    })
}

/// `\k1\v1\k2\v2` into a map. A trailing key without value is dropped.
fn parse_info(line: &str) -> HashMap<String, String> {
    let mut parts = line.trim_end_matches('\r').split('\\').skip(1);
    let mut info = HashMap::new();
    while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
        info.insert(key.to_string(), value.to_string());
    }
    info
}

fn parse_player(line: &str) -> Result<Player, QueryError> {
    let malformed = || QueryError::MalformedPlayer(line.to_string());

    let mut fields = line.trim_start().splitn(3, ' ');
    let score = fields
        .next()
        .and_then(|s| s.parse::<i32>().ok())
        .ok_or_else(malformed)?;
    let ping = fields
        .next()
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(malformed)?;
    let rest = fields.next().unwrap_or("").trim();

    let name = match (rest.find('"'), rest.rfind('"')) {
        (Some(start), Some(end)) if end > start => &rest[start + 1..end],
        _ => rest,
    };

    Ok(Player {
        name: name.to_string(),
        score,
        ping,
    })
}
