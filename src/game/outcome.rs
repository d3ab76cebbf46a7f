use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{info, warn};
use uuid::Uuid;

use crate::card::types::PlayerKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuelResult {
    Win { winner: PlayerKind },
    Draw,
    /// 중단된 듀얼. 승패를 매기지 않습니다.
    NoContest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    LifePoints,
    DeckOut,
    Concession,
    Disconnect,
    /// 상태 일관성이 깨져 엔진이 세션을 멈춘 경우
    InternalFault,
}

/// 레이팅 서비스에 넘기는 점수 힌트. 승 1.0, 패 0.0, 무승부 0.5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingHint {
    pub player_id: Uuid,
    pub score: f32,
}

/// 듀얼이 끝났을 때 한 번만 발행되는 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub session_id: Uuid,
    pub result: DuelResult,
    pub reason: EndReason,
    pub winner_id: Option<Uuid>,
    pub loser_id: Option<Uuid>,
    pub is_draw: bool,
    pub turn_count: u32,
    pub rating_deltas_hint: Vec<RatingHint>,
}

impl OutcomeEvent {
    /// `players` 는 좌석 순서(Player1, Player2)의 외부 식별자입니다.
    pub fn new(
        session_id: Uuid,
        result: DuelResult,
        reason: EndReason,
        players: [Uuid; 2],
        turn_count: u32,
    ) -> Self {
        let (winner_id, loser_id, rating_deltas_hint) = match result {
            DuelResult::Win { winner } => {
                let winner_id = players[winner.index()];
                let loser_id = players[winner.reverse().index()];
                (
                    Some(winner_id),
                    Some(loser_id),
                    vec![
                        RatingHint {
                            player_id: winner_id,
                            score: 1.0,
                        },
                        RatingHint {
                            player_id: loser_id,
                            score: 0.0,
                        },
                    ],
                )
            }
            DuelResult::Draw => (
                None,
                None,
                players
                    .iter()
                    .map(|id| RatingHint {
                        player_id: *id,
                        score: 0.5,
                    })
                    .collect(),
            ),
            DuelResult::NoContest => (None, None, vec![]),
        };
        Self {
            session_id,
            result,
            reason,
            winner_id,
            loser_id,
            is_draw: result == DuelResult::Draw,
            turn_count,
            rating_deltas_hint,
        }
    }
}

/// 듀얼 결과를 받아 가는 쪽(레이팅 서비스 등).
pub trait OutcomeSink: Send + Sync {
    fn publish(&self, event: OutcomeEvent);
}

/// tokio 채널로 결과를 흘려보내는 싱크.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: UnboundedSender<OutcomeEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, UnboundedReceiver<OutcomeEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl OutcomeSink for ChannelSink {
    fn publish(&self, event: OutcomeEvent) {
        let session_id = event.session_id;
        if self.tx.send(event).is_err() {
            warn!("outcome receiver for session {} is gone", session_id);
        } else {
            info!("outcome of session {} published", session_id);
        }
    }
}
