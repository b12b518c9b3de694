use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use cart::Cart;
use futures_util::{SinkExt, StreamExt};
use menu::{
    catalog::Catalog,
    events::ServerFrame,
    orders::{Customer, Order, OrderStatus},
};
use serde_json::json;
use server::{config::Config, router, state::AppState};
use tokio::{net::TcpListener, time::timeout};
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

type Socket = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

async fn spawn_server() -> SocketAddr {
    let state = AppState::with_catalog(Config::default(), Catalog::sample());
    let app = router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn connect(addr: SocketAddr) -> Socket {
    let (socket, _) = connect_async(format!("ws://{addr}/ws").as_str())
        .await
        .expect("websocket handshake failed");

    socket
}

async fn next_frame(socket: &mut Socket) -> ServerFrame {
    loop {
        let message = timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for frame")
            .expect("socket closed")
            .expect("socket error");

        if let Message::Text(text) = message {
            return serde_json::from_str(&text).expect("undecodable frame");
        }
    }
}

fn customer() -> Customer {
    Customer {
        name: "Ana".to_string(),
        phone: "555-0100".to_string(),
        address: "1 Main St".to_string(),
    }
}

#[tokio::test]
async fn welcome_echo_and_malformed_frames() {
    let addr = spawn_server().await;
    let mut socket = connect(addr).await;

    assert!(matches!(
        next_frame(&mut socket).await,
        ServerFrame::Connection { .. }
    ));

    socket
        .send(Message::Text(json!({"probe": 42}).to_string()))
        .await
        .unwrap();

    match next_frame(&mut socket).await {
        ServerFrame::Echo { data, .. } => assert_eq!(data["probe"], 42),
        other => panic!("expected echo, got {other:?}"),
    }

    // A malformed frame gets an error reply and the session survives.
    socket
        .send(Message::Text("not json".to_string()))
        .await
        .unwrap();

    assert!(matches!(
        next_frame(&mut socket).await,
        ServerFrame::Error { .. }
    ));

    socket
        .send(Message::Text(json!({"still": "alive"}).to_string()))
        .await
        .unwrap();

    assert!(matches!(
        next_frame(&mut socket).await,
        ServerFrame::Echo { .. }
    ));
}

#[tokio::test]
async fn checkout_reprices_and_broadcasts() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();
    let catalog = Catalog::sample();

    let mut socket = connect(addr).await;
    assert!(matches!(
        next_frame(&mut socket).await,
        ServerFrame::Connection { .. }
    ));

    // Valid coupon from the server's table.
    let reply: serde_json::Value = client
        .post(format!("http://{addr}/coupons/validate"))
        .json(&json!({"code": "WELCOME10"}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reply["valid"], true);
    assert_eq!(reply["discount_cents"], 1000);

    let mut cart = Cart::default();
    cart.add_item(catalog.get("margherita").unwrap(), BTreeMap::new(), None);
    cart.add_item(catalog.get("margherita").unwrap(), BTreeMap::new(), None);
    cart.add_item(catalog.get("cola").unwrap(), BTreeMap::new(), None);
    cart.apply_discount(1000, Some("welcome10".to_string()));

    let response = client
        .post(format!("http://{addr}/orders"))
        .json(&cart.submission(customer()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::CREATED);

    let order: Order = response.json().await.unwrap();
    // 2 * 1250 + 350 + 500 fee - 1000 discount
    assert_eq!(order.subtotal_cents, 2850);
    assert_eq!(order.total_cents, 2350);
    assert_eq!(order.status, OrderStatus::Received);

    match next_frame(&mut socket).await {
        ServerFrame::OrderCreated { order: pushed, .. } => {
            assert_eq!(pushed.id, order.id);
            assert_eq!(pushed.total_cents, 2350);
        }
        other => panic!("expected order_created, got {other:?}"),
    }

    // Admin moves the order along; subscribers hear about it.
    let response = client
        .post(format!("http://{addr}/orders/{}/status", order.id))
        .json(&json!({"status": "preparing"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    match next_frame(&mut socket).await {
        ServerFrame::OrderStatusChanged {
            order_id, status, ..
        } => {
            assert_eq!(order_id, order.id);
            assert_eq!(status, OrderStatus::Preparing);
        }
        other => panic!("expected order_status_changed, got {other:?}"),
    }

    let tracked: Order = client
        .get(format!("http://{addr}/orders/{}", order.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tracked.status, OrderStatus::Preparing);
}

#[tokio::test]
async fn unknown_product_is_rejected() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let submission = json!({
        "customer": {"name": "Ana", "phone": "555-0100", "address": "1 Main St"},
        "items": [{"product_id": "sushi", "quantity": 1, "unit_price_cents": 900}],
        "total_cents": 900
    });

    let response = client
        .post(format!("http://{addr}/orders"))
        .json(&submission)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let addr = spawn_server().await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "http://{addr}/orders/00000000-0000-0000-0000-000000000000"
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}
