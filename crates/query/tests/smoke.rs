use ratstalker_core::ServerQuery;
use ratstalker_query::{query_host, QueryError, UdpStatusQuery, GETSTATUS};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;

const REPLY: &[u8] = b"\xff\xff\xff\xffstatusResponse\n\\sv_hostname\\^3duel\\mapname\\ps37ctf\\g_gametype\\1\\sv_maxclients\\2\n7 35 \"Anna\"\n";

/// Local fake server that answers `getstatus`, ignoring the first `skip`
/// requests.
async fn spawn_responder(skip: usize) -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind responder");
    let address = socket.local_addr().expect("local addr");
    tokio::spawn(async move {
        let mut buffer = [0u8; 64];
        let mut seen = 0;
        while let Ok((len, peer)) = socket.recv_from(&mut buffer).await {
            if &buffer[..len] != GETSTATUS {
                continue;
            }
            seen += 1;
            if seen > skip {
                let _ = socket.send_to(REPLY, peer).await;
            }
        }
    });
    address
}

/// Bound but never reads or answers.
async fn silent_host() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind silent");
    let address = socket.local_addr().expect("local addr");
    (socket, address)
}

#[tokio::test]
async fn query_smoke_single_host() {
    let address = spawn_responder(0).await;
    let info = query_host(address, Duration::from_millis(500), 0)
        .await
        .expect("status reply");

    assert_eq!(info.address, address);
    assert_eq!(info.plain_name(), "duel");
    assert_eq!(info.map, "ps37ctf");
    assert!(info.game_mode.is_head_to_head());
    assert_eq!(info.human_names(), vec!["Anna".to_string()]);
}

#[tokio::test]
async fn query_smoke_retries_after_lost_request() {
    let address = spawn_responder(1).await;

    let no_retry = query_host(address, Duration::from_millis(200), 0).await;
    assert!(matches!(no_retry, Err(QueryError::Timeout { attempts: 1 })));

    let address = spawn_responder(1).await;
    let with_retry = query_host(address, Duration::from_millis(200), 1).await;
    assert!(with_retry.is_ok());
}

#[tokio::test]
async fn query_smoke_unreachable_hosts_are_absent() {
    let live = spawn_responder(0).await;
    let (_keep, silent) = silent_host().await;

    let infos = UdpStatusQuery::new()
        .query_all(&[silent, live], Duration::from_millis(200), 1)
        .await;

    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].address, live);
}
