//! Notification and reply formatting.
//!
//! Every message has a plain text form and an HTML form. Names are shown
//! colour-stripped; commas inside names are escaped so the player list
//! stays unambiguous.

use crate::adapter::MessageContent;
use ratstalker_core::{Notification, NotificationKind, ServerSummary};

const GREEN: &str = "00cc00";
const RED: &str = "db0000";
const CYAN: &str = "00d4d4";

/// Render one notification.
pub fn render(notification: &Notification) -> MessageContent {
    let server = &notification.server;
    let name = server.display_name();
    let n = server.population;
    let s = if n == 1 { "" } else { "s" };
    let mode = server.game_mode.label();

    match notification.kind {
        NotificationKind::OverThreshold => MessageContent {
            text: format!(
                "[+] {}: {} player{} now @ {}/{} ({})",
                name,
                n,
                s,
                server.map,
                mode,
                comma_separated(&server.players)
            ),
            html: Some(format!(
                "{} <b>{}</b>: {} player{} now @ <b>{}</b>/{} ({})",
                bullet(GREEN, "●"),
                escape_html(&name),
                n,
                s,
                escape_html(&server.map),
                mode,
                escape_html(&comma_separated(&server.players))
            )),
        },
        NotificationKind::UnderThreshold => MessageContent {
            text: format!("[-] {}: {} player{} now", name, n, s),
            html: Some(format!(
                "{} <b>{}</b>: {} player{} now",
                bullet(RED, "●"),
                escape_html(&name),
                n,
                s
            )),
        },
        NotificationKind::Sustained => {
            let tobe = if n == 1 { "is" } else { "are" };
            MessageContent {
                text: format!(
                    "[*] {}: {} {} still having a lot of fun @ {}/{}",
                    name,
                    comma_separated(&server.players),
                    tobe,
                    server.map,
                    mode
                ),
                html: Some(format!(
                    "{} <b>{}</b>: {} {} still having a lot of fun @ <b>{}</b>/{}",
                    bullet(CYAN, "●"),
                    escape_html(&name),
                    escape_html(&comma_separated(&server.players)),
                    tobe,
                    escape_html(&server.map),
                    mode
                )),
            }
        }
        NotificationKind::WatchedEntered => {
            let player = escape_comma(notification.player.as_deref().unwrap_or_default());
            MessageContent {
                text: format!("[->] {} entered {}", player, name),
                html: Some(format!(
                    "{} {} entered <b>{}</b>",
                    bullet(GREEN, "→"),
                    escape_html(&player),
                    escape_html(&name)
                )),
            }
        }
        NotificationKind::WatchedLeft => {
            let player = escape_comma(notification.player.as_deref().unwrap_or_default());
            MessageContent {
                text: format!("[<-] {} left {}", player, name),
                html: Some(format!(
                    "{} {} left <b>{}</b>",
                    bullet(RED, "←"),
                    escape_html(&player),
                    escape_html(&name)
                )),
            }
        }
    }
}

/// One line per server, as answered to `query` and `hunt`.
pub fn render_server_list(servers: &[ServerSummary], by_keywords: bool) -> MessageContent {
    if servers.is_empty() {
        let text = if by_keywords {
            "No match for this search"
        } else {
            "No player currently online"
        };
        return MessageContent::plain(text);
    }

    let line = |server: &ServerSummary| {
        let n = server.population;
        format!(
            "{}: {} player{} now @ {}/{} ({})",
            server.display_name(),
            n,
            if n == 1 { "" } else { "s" },
            server.map,
            server.game_mode.label(),
            comma_separated(&server.players)
        )
    };
    let text: Vec<String> = servers.iter().map(line).collect();
    let html: Vec<String> = text.iter().map(|l| escape_html(l)).collect();
    MessageContent {
        text: text.join("\n"),
        html: Some(html.join("<br>")),
    }
}

fn escape_comma(name: &str) -> String {
    name.replace(',', "\\,")
}

fn comma_separated(names: &[String]) -> String {
    names
        .iter()
        .map(|n| escape_comma(n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bullet(color: &str, symbol: &str) -> String {
    format!("<font color=#{}>{}</font>", color, symbol)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use ratstalker_core::{GameMode, ServerIdentity};
    use std::net::SocketAddr;

    fn summary(players: &[&str]) -> ServerSummary {
        ServerSummary {
            identity: ServerIdentity::new(SocketAddr::from(([10, 0, 0, 1], 27960))),
            name: "Rat City".to_string(),
            map: "oa_dm4".to_string(),
            game_mode: GameMode::Ctf,
            population: players.len() as u32,
            players: players.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn notification(kind: NotificationKind, players: &[&str], player: Option<&str>) -> Notification {
        Notification {
            kind,
            server: summary(players),
            player: player.map(str::to_string),
            observed_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn test_over_threshold_text() {
        let msg = render(&notification(
            NotificationKind::OverThreshold,
            &["Anna", "Bob, Jr", "Cid", "Dee"],
            None,
        ));
        assert_eq!(
            msg.text,
            "[+] Rat City: 4 players now @ oa_dm4/CTF (Anna, Bob\\, Jr, Cid, Dee)"
        );
        assert!(msg.html.unwrap().contains("<b>Rat City</b>"));
    }

    #[test]
    fn test_singular_forms() {
        let under = render(&notification(NotificationKind::UnderThreshold, &["Anna"], None));
        assert_eq!(under.text, "[-] Rat City: 1 player now");

        let sustained = render(&notification(NotificationKind::Sustained, &["Anna"], None));
        assert_eq!(
            sustained.text,
            "[*] Rat City: Anna is still having a lot of fun @ oa_dm4/CTF"
        );

        let sustained = render(&notification(NotificationKind::Sustained, &["Anna", "Bob"], None));
        assert!(sustained.text.contains("Anna, Bob are still"));
    }

    #[test]
    fn test_watched_player_text() {
        let entered = render(&notification(NotificationKind::WatchedEntered, &[], Some("Anna")));
        assert_eq!(entered.text, "[->] Anna entered Rat City");

        let left = render(&notification(NotificationKind::WatchedLeft, &[], Some("<b>oss")));
        assert_eq!(left.text, "[<-] <b>oss left Rat City");
        assert!(left.html.unwrap().contains("&lt;b&gt;oss left"));
    }

    #[test]
    fn test_server_list() {
        let empty = render_server_list(&[], true);
        assert_eq!(empty.text, "No match for this search");
        assert_eq!(render_server_list(&[], false).text, "No player currently online");

        let list = render_server_list(&[summary(&["Anna"]), summary(&[])], false);
        assert_eq!(
            list.text,
            "Rat City: 1 player now @ oa_dm4/CTF (Anna)\nRat City: 0 players now @ oa_dm4/CTF ()"
        );
    }
}
