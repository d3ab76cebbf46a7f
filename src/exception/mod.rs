use thiserror::Error;

use crate::{
    card::{catalog::CatalogId, InstanceId},
    effect::types::EffectSpeed,
    enums::ZoneType,
    game::{action::ActionKind, phase::Phase, session::SessionStatus},
};

/// 엔진이 돌려주는 모든 오류.
///
/// `Gameplay` 는 요청 거부이며 상태를 건드리지 않습니다.
/// `Internal` 은 상태 일관성이 깨졌다는 뜻이고 세션을 중단시킵니다.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error(transparent)]
    Gameplay(#[from] GameplayError),

    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl GameError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::Internal(_))
    }
}

impl From<SummonError> for GameError {
    fn from(value: SummonError) -> Self {
        GameError::Gameplay(GameplayError::Summon(value))
    }
}

impl From<ActivationError> for GameError {
    fn from(value: ActivationError) -> Self {
        GameError::Gameplay(GameplayError::Activation(value))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameplayError {
    #[error("{action:?} is not allowed during {phase}")]
    PhaseViolation { phase: Phase, action: ActionKind },

    #[error("illegal zone transition: {reason}")]
    IllegalZoneTransition { reason: String },

    #[error("card {0} does not exist in this duel")]
    UnknownCard(InstanceId),

    #[error("player is not seated in this session")]
    UnknownPlayer,

    #[error("request addressed to another session")]
    SessionMismatch,

    #[error("only the priority holder may respond")]
    NotPriorityHolder,

    #[error("cost payment failed: {reason}")]
    CostPaymentFailed { reason: String },

    #[error("illegal attack: {reason}")]
    IllegalAttack { reason: String },

    #[error("illegal position change: {reason}")]
    IllegalPositionChange { reason: String },

    #[error("invalid deck: {reason}")]
    InvalidDeck { reason: String },

    #[error("seat already taken")]
    SeatTaken,

    #[error("both seats must be filled before the duel starts")]
    SeatsOpen,

    #[error("session is busy resolving another action")]
    SessionBusy,

    #[error("session is {0:?}")]
    SessionNotActive(SessionStatus),

    #[error("action discarded because the session was abandoned")]
    ActionDiscarded,

    #[error(transparent)]
    Summon(SummonError),

    #[error(transparent)]
    Activation(ActivationError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SummonError {
    #[error("not enough materials: need {required}, have {available}")]
    InsufficientMaterial { required: usize, available: usize },

    #[error("destination zone is full")]
    ZoneFull,

    #[error("summon allowance exhausted for this turn")]
    AllowanceExhausted,

    #[error("material selection does not satisfy the requirement: {reason}")]
    MaterialMismatch { reason: String },

    #[error("card cannot be summoned this way: {reason}")]
    NotSummonable { reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("effect {index} is not defined on card {catalog_id}")]
    UnknownEffect { catalog_id: CatalogId, index: usize },

    #[error("card {0} is not controlled by the activating player")]
    NotOwner(InstanceId),

    #[error("cannot activate from {0}")]
    WrongLocation(ZoneType),

    #[error("trap was set this turn")]
    SetThisTurn,

    #[error("effect cannot be activated at this timing")]
    WrongTiming,

    #[error("{effect:?} speed cannot chain onto {chain:?}")]
    SpeedTooSlow { chain: EffectSpeed, effect: EffectSpeed },

    #[error("chain is resolving")]
    ChainResolving,

    #[error("no trigger is waiting for this effect")]
    NoTriggerOffer,

    #[error("effect already used this turn")]
    AlreadyUsedThisTurn,

    #[error("effect already used this duel")]
    AlreadyUsedThisDuel,

    #[error("expected {expected} targets, got {got}")]
    TargetCountMismatch { expected: usize, got: usize },

    #[error("illegal target {0}")]
    IllegalTarget(InstanceId),

    #[error("no free zone to place the card")]
    ZoneFull,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InternalError {
    #[error("catalog has no card {0}")]
    CatalogMiss(CatalogId),

    #[error("effect {index} of card {catalog_id} is undefined at resolution")]
    UndefinedEffect { catalog_id: CatalogId, index: usize },

    #[error("instance {0} appears in more than one zone")]
    DuplicateInstance(InstanceId),

    #[error("instance {0} is referenced but not tracked")]
    DanglingInstance(InstanceId),

    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    #[error("session runtime is gone")]
    RuntimeClosed,
}

impl InternalError {
    pub fn inconsistent(reason: impl Into<String>) -> Self {
        Self::Inconsistent(reason.into())
    }
}
