//! End-to-end fan-out benchmark for Huddle.
//!
//! Every client joins one room and sends to it as fast as it can; the
//! benchmark counts message frames delivered back over real WebSockets.

use bytes::BytesMut;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use huddle_protocol::{codec, ChannelKind, Frame, PROTOCOL_VERSION};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::Barrier;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

const SERVER_URL: &str = "ws://127.0.0.1:8080/ws";
const ROOM: &str = "benchmark";
const WARMUP_SECS: u64 = 2;
const BENCH_SECS: u64 = 10;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let num_clients = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(16);

    println!("Huddle end-to-end fan-out benchmark");
    println!("Make sure the server is running: cargo run --release --bin huddle");
    println!();

    run_fanout_benchmark(num_clients).await;
}

async fn run_fanout_benchmark(num_clients: usize) {
    println!("Fan-out benchmark: {} clients in #{}", num_clients, ROOM);
    println!("Warmup: {}s, Measurement: {}s", WARMUP_SECS, BENCH_SECS);

    let message_count = Arc::new(AtomicU64::new(0));
    // The owner creates the room before anyone joins; everyone then waits
    // for all joins to finish before sending.
    let room_ready = Arc::new(Barrier::new(num_clients));
    let all_joined = Arc::new(Barrier::new(num_clients + 1));

    let mut handles = Vec::new();
    for client_id in 0..num_clients {
        let msg_count = Arc::clone(&message_count);
        let room_ready = Arc::clone(&room_ready);
        let all_joined = Arc::clone(&all_joined);

        handles.push(tokio::spawn(async move {
            if let Err(e) = run_client(client_id, msg_count, room_ready, all_joined).await {
                eprintln!("Client {} error: {}", client_id, e);
            }
        }));
    }

    all_joined.wait().await;
    println!("All {} clients joined", num_clients);

    tokio::time::sleep(Duration::from_secs(WARMUP_SECS)).await;

    message_count.store(0, Ordering::SeqCst);
    let start = Instant::now();
    tokio::time::sleep(Duration::from_secs(BENCH_SECS)).await;

    let elapsed = start.elapsed();
    let total_messages = message_count.load(Ordering::SeqCst);
    let msgs_per_sec = total_messages as f64 / elapsed.as_secs_f64();

    println!();
    println!("Clients:          {:>12}", num_clients);
    println!("Duration:         {:>12.2}s", elapsed.as_secs_f64());
    println!("Delivered:        {:>12}", total_messages);
    println!("Throughput:       {:>12.0} msg/s", msgs_per_sec);
    println!(
        "Per-Client:       {:>12.0} msg/s",
        msgs_per_sec / num_clients as f64
    );

    for handle in handles {
        handle.abort();
    }
}

async fn send(sender: &mut SplitSink<Ws, Message>, frame: &Frame) -> Result<(), BoxError> {
    let bytes = codec::encode(frame)?;
    sender.send(Message::Binary(bytes.to_vec())).await?;
    Ok(())
}

/// Read until one complete frame is available.
async fn next_frame(
    receiver: &mut SplitStream<Ws>,
    buf: &mut BytesMut,
) -> Result<Frame, BoxError> {
    loop {
        if let Some(frame) = codec::decode_from(buf)? {
            return Ok(frame);
        }
        match receiver.next().await {
            Some(Ok(Message::Binary(data))) => buf.extend_from_slice(&data),
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Err("connection closed".into()),
        }
    }
}

async fn expect_ack(receiver: &mut SplitStream<Ws>, buf: &mut BytesMut) -> Result<(), BoxError> {
    match next_frame(receiver, buf).await? {
        Frame::Ack { .. } => Ok(()),
        Frame::Error { code, message, .. } => Err(format!("error {code}: {message}").into()),
        other => Err(format!("unexpected frame {:?}", other.frame_type()).into()),
    }
}

async fn run_client(
    client_id: usize,
    message_count: Arc<AtomicU64>,
    room_ready: Arc<Barrier>,
    all_joined: Arc<Barrier>,
) -> Result<(), BoxError> {
    let (ws, _) = connect_async(SERVER_URL).await?;
    let (mut sender, mut receiver) = ws.split();
    let mut buf = BytesMut::with_capacity(65536);

    let user = format!("bench-{client_id}");
    send(&mut sender, &Frame::connect(PROTOCOL_VERSION.major, &user)).await?;
    match next_frame(&mut receiver, &mut buf).await? {
        Frame::Connected { .. } => {}
        other => return Err(format!("handshake failed: {:?}", other).into()),
    }

    if client_id == 0 {
        send(&mut sender, &Frame::create_group_chat(1, ROOM)).await?;
        expect_ack(&mut receiver, &mut buf).await?;
        room_ready.wait().await;
    } else {
        room_ready.wait().await;
        send(&mut sender, &Frame::join_group_chat(1, ROOM)).await?;
        expect_ack(&mut receiver, &mut buf).await?;
    }

    all_joined.wait().await;

    let recv_count = Arc::clone(&message_count);
    let recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            if let Ok(Message::Binary(data)) = result {
                buf.extend_from_slice(&data);
                while let Ok(Some(frame)) = codec::decode_from(&mut buf) {
                    if matches!(frame, Frame::Message { .. }) {
                        recv_count.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        }
    });

    let mut id = 2u64;
    loop {
        let frame = Frame::send_message(id, ROOM, ChannelKind::Group, "x".repeat(64));
        if send(&mut sender, &frame).await.is_err() {
            break;
        }
        id += 1;
        tokio::task::yield_now().await;
    }

    recv_task.abort();
    Ok(())
}
