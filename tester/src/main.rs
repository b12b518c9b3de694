use std::{env, time::Duration};

use channel::{Channel, ChannelConfig};
use serde_json::json;
use tokio::time::sleep;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let url = env::args()
        .nth(1)
        .unwrap_or_else(|| "ws://127.0.0.1:8080/ws".to_string());

    println!("Connecting to {url}");
    let (channel, mut events) = Channel::connect(ChannelConfig::new(url));

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event:?}");
        }
    });

    sleep(Duration::from_millis(500)).await;
    channel.send(json!({ "probe": "hello" }));

    // Stay subscribed for a bit; place orders against the REST side to
    // watch broadcasts arrive here.
    sleep(Duration::from_secs(10)).await;

    channel.disconnect();
    let _ = printer.await;
}
