//! Relay hub behaviour with real TCP peers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use sft_relay::{RelayServer, RelayStats, ServerConfig};
use sft_transport::{ConnectPolicy, LengthCodec, MessageChannel, TcpChannel, TransportError};
use tokio::sync::oneshot;
use tokio::time::timeout;

struct Hub {
    addr: String,
    stats: Arc<RelayStats>,
    _shutdown: oneshot::Sender<()>,
}

async fn start_hub(max_peers: usize) -> Hub {
    let config = ServerConfig {
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        max_peers,
        ..ServerConfig::default()
    };
    let server = RelayServer::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();
    let stats = server.stats();

    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(server.run_until(async {
        let _ = rx.await;
    }));

    Hub {
        addr,
        stats,
        _shutdown: tx,
    }
}

async fn join(hub: &Hub) -> TcpChannel {
    TcpChannel::connect_with_retry(&hub.addr, ConnectPolicy::default(), LengthCodec::default())
        .await
        .unwrap()
}

async fn wait_for_peers(stats: &RelayStats, n: usize) {
    timeout(Duration::from_secs(5), async {
        while stats.peers() != n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn relay_forwards_to_others_only() {
    let hub = start_hub(8).await;
    let alice = join(&hub).await;
    let bob = join(&hub).await;
    let carol = join(&hub).await;
    wait_for_peers(&hub.stats, 3).await;

    let frame = Bytes::from_static(br#"{"fileName":"a.txt"}"#);
    alice.send(frame.clone()).await.unwrap();

    assert_eq!(bob.recv().await.unwrap(), frame);
    assert_eq!(carol.recv().await.unwrap(), frame);

    // Nothing comes back to the sender.
    assert!(timeout(Duration::from_millis(200), alice.recv()).await.is_err());
    assert_eq!(hub.stats.frames_relayed(), 1);
}

#[tokio::test]
async fn relay_lone_peer_is_harmless() {
    let hub = start_hub(8).await;
    let alice = join(&hub).await;
    wait_for_peers(&hub.stats, 1).await;

    alice.send(Bytes::from_static(b"nobody listening")).await.unwrap();
    timeout(Duration::from_secs(5), async {
        while hub.stats.frames_relayed() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let bob = join(&hub).await;
    wait_for_peers(&hub.stats, 2).await;

    // Bob joined late and does not get the earlier frame.
    assert!(timeout(Duration::from_millis(200), bob.recv()).await.is_err());
}

#[tokio::test]
async fn relay_enforces_peer_limit() {
    let hub = start_hub(2).await;
    let _alice = join(&hub).await;
    let _bob = join(&hub).await;
    wait_for_peers(&hub.stats, 2).await;

    // The TCP handshake succeeds, then the relay hangs up.
    let carol = join(&hub).await;
    let result = timeout(Duration::from_secs(5), carol.recv()).await.unwrap();
    assert!(matches!(result, Err(TransportError::Disconnected)));
    assert_eq!(hub.stats.peers(), 2);
}

#[tokio::test]
async fn relay_tracks_departures() {
    let hub = start_hub(8).await;
    let alice = join(&hub).await;
    let bob = join(&hub).await;
    wait_for_peers(&hub.stats, 2).await;

    alice.close().await.unwrap();
    drop(alice);
    wait_for_peers(&hub.stats, 1).await;

    drop(bob);
    wait_for_peers(&hub.stats, 0).await;
}
