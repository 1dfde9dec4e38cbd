//! Session coordinator - applies client intents to matchmaking state
//! and fans the resulting events out to the affected sessions

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::game::room::MoveProgress;
use crate::game::{Move, RoomId, SessionId};
use crate::matchmaking::{MatchStore, MatchmakingService, QueueStatus};
use crate::ws::protocol::{ClientMsg, ServerMsg, OPPONENT_MOVED_TEXT};

use super::registry::ConnectionRegistry;
use super::SessionError;

/// Something a session asked for, or its departure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    JoinQueue,
    SubmitMove { room_id: RoomId, mv: Move },
    RequestRematch { room_id: RoomId },
    Chat { room_id: RoomId, message: String },
    Disconnect,
}

impl Intent {
    /// Map a wire message to an intent; transport-level messages map to `None`
    pub fn from_client(msg: ClientMsg) -> Option<Self> {
        match msg {
            ClientMsg::JoinQueue => Some(Intent::JoinQueue),
            ClientMsg::SubmitMove { room_id, mv } => Some(Intent::SubmitMove { room_id, mv }),
            ClientMsg::RequestRematch { room_id } => Some(Intent::RequestRematch { room_id }),
            ClientMsg::ChatMessage { room_id, message } => Some(Intent::Chat { room_id, message }),
            ClientMsg::Ping { .. } => None,
        }
    }
}

/// One event addressed to one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: SessionId,
    pub msg: ServerMsg,
}

impl Outbound {
    fn new(to: SessionId, msg: ServerMsg) -> Self {
        Self { to, msg }
    }
}

/// Counters published by the coordinator for the health endpoint
#[derive(Debug, Default)]
pub struct CoordinatorStats {
    waiting: AtomicBool,
    active_rooms: AtomicUsize,
}

impl CoordinatorStats {
    pub fn has_waiting(&self) -> bool {
        self.waiting.load(Ordering::Relaxed)
    }

    pub fn active_rooms(&self) -> usize {
        self.active_rooms.load(Ordering::Relaxed)
    }
}

/// Transport-free protocol state machine
pub struct SessionCoordinator<S: MatchStore> {
    service: MatchmakingService<S>,
}

impl<S: MatchStore> SessionCoordinator<S> {
    pub fn new(service: MatchmakingService<S>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &MatchmakingService<S> {
        &self.service
    }

    /// Apply one intent and return every event it produced, in send order
    pub fn handle(&mut self, from: SessionId, intent: Intent) -> Vec<Outbound> {
        let mut out = Vec::new();

        match intent {
            Intent::JoinQueue => {
                let outcome = self.service.request_match(from);
                if let Some(departure) = outcome.left {
                    out.push(Outbound::new(departure.remaining, ServerMsg::OpponentLeft));
                }

                match outcome.status {
                    QueueStatus::Waiting => out.push(Outbound::new(from, ServerMsg::Waiting)),
                    QueueStatus::Matched { room_id, players } => {
                        for player in players {
                            out.push(Outbound::new(player, ServerMsg::Matched { room_id, players }));
                        }
                    }
                }
            }

            Intent::SubmitMove { room_id, mv } => {
                match self.service.submit_move(&room_id, from, mv) {
                    Some(MoveProgress::AwaitingOpponent { opponent }) => {
                        out.push(Outbound::new(
                            opponent,
                            ServerMsg::OpponentMoved {
                                message: OPPONENT_MOVED_TEXT.to_string(),
                            },
                        ));
                    }
                    Some(MoveProgress::Resolved(summary)) => {
                        let winner = summary.outcome.winner();
                        let moves: BTreeMap<SessionId, Move> = summary.moves;
                        for player in room_id.members() {
                            out.push(Outbound::new(
                                player,
                                ServerMsg::RoundResult {
                                    round: summary.round,
                                    moves: moves.clone(),
                                    winner,
                                },
                            ));
                        }
                    }
                    None => {}
                }
            }

            Intent::RequestRematch { room_id } => {
                if let Some(players) = self.service.request_rematch(&room_id, from) {
                    for player in players {
                        out.push(Outbound::new(player, ServerMsg::NewRound));
                    }
                }
            }

            Intent::Chat { room_id, message } => match self.service.chat_recipients(&room_id, from) {
                Some(players) => {
                    for player in players {
                        out.push(Outbound::new(
                            player,
                            ServerMsg::ChatMessage {
                                sender: from,
                                message: message.clone(),
                            },
                        ));
                    }
                }
                None => debug!(room_id = %room_id, session_id = %from, "Chat for unknown room ignored"),
            },

            Intent::Disconnect => {
                self.service.release(from);
                if let Some(departure) = self.service.leave_room(from) {
                    out.push(Outbound::new(departure.remaining, ServerMsg::OpponentLeft));
                }
            }
        }

        out
    }
}

/// Cloneable sender side used by connection handlers
#[derive(Clone)]
pub struct CoordinatorHandle {
    intent_tx: mpsc::UnboundedSender<(SessionId, Intent)>,
    pub stats: Arc<CoordinatorStats>,
}

impl CoordinatorHandle {
    pub fn send(&self, session_id: SessionId, intent: Intent) -> Result<(), SessionError> {
        self.intent_tx
            .send((session_id, intent))
            .map_err(|_| SessionError::CoordinatorClosed)
    }
}

/// The coordinator task: sole owner of matchmaking state
pub struct CoordinatorTask<S: MatchStore> {
    coordinator: SessionCoordinator<S>,
    intent_rx: mpsc::UnboundedReceiver<(SessionId, Intent)>,
    registry: Arc<ConnectionRegistry>,
    stats: Arc<CoordinatorStats>,
}

impl<S: MatchStore> CoordinatorTask<S> {
    pub fn new(
        service: MatchmakingService<S>,
        registry: Arc<ConnectionRegistry>,
    ) -> (Self, CoordinatorHandle) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let stats = Arc::new(CoordinatorStats::default());

        let handle = CoordinatorHandle {
            intent_tx,
            stats: stats.clone(),
        };

        let task = Self {
            coordinator: SessionCoordinator::new(service),
            intent_rx,
            registry,
            stats,
        };

        (task, handle)
    }

    /// Process intents one at a time until every handle is dropped
    pub async fn run(mut self) {
        info!("Session coordinator started");

        while let Some((session_id, intent)) = self.intent_rx.recv().await {
            let events = self.coordinator.handle(session_id, intent);
            self.publish_stats();

            for Outbound { to, msg } in events {
                self.registry.send(to, msg);
            }
        }

        info!("Session coordinator stopped");
    }

    fn publish_stats(&self) {
        let service = self.coordinator.service();
        self.stats
            .waiting
            .store(service.waiting().is_some(), Ordering::Relaxed);
        self.stats
            .active_rooms
            .store(service.active_rooms(), Ordering::Relaxed);
    }
}
