//! Per-book streaming push (spec.md §6), grounded on the teacher's
//! `websocket::handler`/`websocket::channels` — tagged `ClientMessage`/
//! `ServerMessage` enums, subscribe/unsubscribe by channel string — here
//! generalized from per-symbol `orderbook.{symbol}` channels to
//! per-`book_id` freight/ownership channels, each backed by its own
//! `tokio::sync::broadcast` fan-out.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::books::BookSnapshot;
use crate::contract::parse_leg_book_id;
use crate::models::account::BalanceSnapshot;
use crate::models::contract::{ContractStatus, LegStatus};
use crate::models::match_record::MatchRecord;
use crate::scheduler::SchedulerSnapshot;
use crate::world::World;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct LegProgress {
    pub leg_id: String,
    pub status: LegStatus,
}

/// spec.md §6's streaming update shape, pushed at ≤1 Hz per `book_id`.
#[derive(Debug, Clone, Serialize)]
pub struct BookStreamFrame {
    pub book_id: String,
    pub orderbook: BookSnapshot,
    pub matches: Vec<MatchRecord>,
    pub iot_progress: Vec<LegProgress>,
    pub balances: BTreeMap<String, BalanceSnapshot>,
    pub simulation_clock: u64,
    pub is_running: bool,
    pub is_paused: bool,
    pub current_container_owner: Option<String>,
    pub container_status: Option<ContractStatus>,
}

fn contract_id_for_book(book_id: &str) -> Option<String> {
    book_id.strip_prefix("contract:").map(str::to_string).or_else(|| parse_leg_book_id(book_id).map(|(_, c)| c))
}

pub fn build_frame(world: &World, book_id: &str, scheduler: &SchedulerSnapshot) -> Option<BookStreamFrame> {
    let book = world.books.get(book_id).ok()?;
    let contract_id = contract_id_for_book(book_id);
    let (current_container_owner, container_status, iot_progress) = match &contract_id {
        Some(cid) => {
            let contract = world.contracts.get_contract(cid);
            let progress =
                world.contracts.legs_for_contract(cid).into_iter().map(|leg| LegProgress { leg_id: leg.leg_id, status: leg.status }).collect();
            (contract.as_ref().map(|c| c.current_owner.clone()), contract.map(|c| c.status), progress)
        }
        None => (None, None, Vec::new()),
    };

    Some(BookStreamFrame {
        book_id: book_id.to_string(),
        orderbook: book.snapshot(),
        matches: world.engine.match_log(book_id),
        iot_progress,
        balances: world.ledger.all_balances(),
        simulation_clock: scheduler.sim_clock,
        is_running: scheduler.is_running,
        is_paused: scheduler.is_paused,
        current_container_owner,
        container_status,
    })
}

/// One broadcast channel per `book_id`, created lazily on first
/// subscribe or first publish, matching `BookRegistry`'s own
/// lazy-creation shape.
#[derive(Default)]
pub struct WsHub {
    channels: DashMap<String, broadcast::Sender<BookStreamFrame>>,
}

impl WsHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, book_id: &str) -> broadcast::Sender<BookStreamFrame> {
        self.channels.entry(book_id.to_string()).or_insert_with(|| broadcast::channel(32).0).clone()
    }

    pub fn subscribe(&self, book_id: &str) -> broadcast::Receiver<BookStreamFrame> {
        self.sender(book_id).subscribe()
    }

    pub fn publish(&self, book_id: &str, frame: BookStreamFrame) {
        // No subscribers is not an error — frames are simply dropped,
        // matching spec.md §6 ("missed frames are not retransmitted").
        let _ = self.sender(book_id).send(frame);
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Subscribe { book_id: String },
    Unsubscribe { book_id: String },
    Ping,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    Subscribed { book_id: String },
    Unsubscribed { book_id: String },
    Frame(Box<BookStreamFrame>),
    Pong,
}

pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One active book subscription per connection at a time — simpler than
/// multiplexing N broadcast receivers and sufficient for a single
/// simulated-exchange client watching one book's activity.
async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    let mut current: Option<(String, broadcast::Receiver<BookStreamFrame>)> = None;

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { book_id }) => {
                                let rx = state.ws_hub.subscribe(&book_id);
                                current = Some((book_id.clone(), rx));
                                if send_json(&mut socket, &ServerMessage::Subscribed { book_id }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ClientMessage::Unsubscribe { book_id }) => {
                                if matches!(&current, Some((id, _)) if *id == book_id) {
                                    current = None;
                                }
                                if send_json(&mut socket, &ServerMessage::Unsubscribed { book_id }).await.is_err() {
                                    break;
                                }
                            }
                            Ok(ClientMessage::Ping) => {
                                if send_json(&mut socket, &ServerMessage::Pong).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => debug!(%err, "ignoring unparseable websocket message"),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(%err, "websocket receive error");
                        break;
                    }
                    _ => {}
                }
            }
            frame = next_frame(&mut current) => {
                match frame {
                    Some(Ok(frame)) => {
                        if send_json(&mut socket, &ServerMessage::Frame(Box::new(frame))).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        debug!(skipped, "websocket subscriber lagged; missed frames are not retransmitted");
                    }
                    Some(Err(broadcast::error::RecvError::Closed)) | None => {}
                }
            }
        }
    }
}

async fn next_frame(
    current: &mut Option<(String, broadcast::Receiver<BookStreamFrame>)>,
) -> Option<Result<BookStreamFrame, broadcast::error::RecvError>> {
    match current {
        Some((_, rx)) => Some(rx.recv().await),
        None => std::future::pending().await,
    }
}

async fn send_json<T: Serialize>(socket: &mut WebSocket, message: &T) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).unwrap_or_default();
    socket.send(Message::Text(text)).await
}
