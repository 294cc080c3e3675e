use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use viewcounter::{http, MemStorage, ViewStorage, ViewsResponse};

async fn start() -> (std::net::SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let store: Arc<dyn ViewStorage> = Arc::new(MemStorage::new());
    store.initialize_view_count().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        http::serve(listener, store, async {
            rx.await.ok();
        })
        .await
        .unwrap();
    });
    (addr, tx, task)
}

async fn send(addr: std::net::SocketAddr, raw: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn increment_then_get_over_the_wire() {
    let (addr, stop, task) = start().await;

    let (status, body) = send(
        addr,
        "POST /api/views/increment HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n",
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(serde_json::from_str::<ViewsResponse>(&body).unwrap(), ViewsResponse { views: 1 });

    let (status, body) = send(addr, "GET /api/views HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
    assert_eq!(status, 200);
    assert_eq!(serde_json::from_str::<ViewsResponse>(&body).unwrap(), ViewsResponse { views: 1 });

    stop.send(()).ok();
    task.await.unwrap();
}

#[tokio::test]
async fn each_post_counts_and_bodies_are_ignored() {
    let (addr, stop, task) = start().await;

    for expected in 1..=3u64 {
        let (status, body) = send(
            addr,
            "POST /api/views/increment HTTP/1.1\r\nContent-Length: 2\r\n\r\n{}",
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(serde_json::from_str::<ViewsResponse>(&body).unwrap().views, expected);
    }

    stop.send(()).ok();
    task.await.unwrap();
}

#[tokio::test]
async fn unknown_routes_and_bad_requests() {
    let (addr, stop, task) = start().await;

    let (status, _) = send(addr, "GET /nope HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 404);
    let (status, _) = send(addr, "GET /api/views/increment HTTP/1.1\r\n\r\n").await;
    assert_eq!(status, 405);
    let (status, _) = send(addr, "nonsense\r\n\r\n").await;
    assert_eq!(status, 400);

    let (_, body) = send(addr, "GET /api/views HTTP/1.1\r\n\r\n").await;
    assert_eq!(serde_json::from_str::<ViewsResponse>(&body).unwrap().views, 0);

    stop.send(()).ok();
    task.await.unwrap();
}
