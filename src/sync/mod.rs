//! 세션 하나 안의 변경을 직렬화하는 두 가지 실행 방식.
//!
//! - `SharedSession`: 락을 잡은 쪽만 처리하고 나머지는 `SessionBusy` 로 거부
//! - `SessionHandle`: 세션을 소유한 tokio 태스크에 채널로 넣어 순서대로 처리

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{timeout_at, Instant},
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    card::types::PlayerKind,
    exception::{GameError, GameplayError, InternalError},
    game::{
        action::Action,
        session::DuelSession,
        snapshot::{StateSnapshot, Viewer},
    },
};

const COMMAND_BUFFER: usize = 32;

/// 여러 스레드가 나눠 쓰는 세션. 처리 중에 들어온 행동은 기다리지 않고 거부합니다.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<DuelSession>>,
    cancel: Arc<AtomicBool>,
}

impl SharedSession {
    pub fn new(session: DuelSession) -> Self {
        let cancel = session.cancel_token();
        Self {
            inner: Arc::new(Mutex::new(session)),
            cancel,
        }
    }

    pub fn try_submit(&self, player_id: Uuid, action: Action) -> Result<StateSnapshot, GameError> {
        match self.inner.try_lock() {
            Some(mut session) => {
                let result = session.submit_action(player_id, action);
                // 처리 중에 들어온 중단 요청은 락을 놓기 전에 반영합니다
                if self.cancel.load(Ordering::SeqCst) && !session.status().is_terminal() {
                    session.abandon();
                }
                result
            }
            None => {
                debug!("session busy, rejecting {:?}", action.kind());
                Err(GameplayError::SessionBusy.into())
            }
        }
    }

    /// 중단은 락을 기다리지 않습니다. 처리 중인 행동이 있으면 그 행동은 버려지고,
    /// 락을 쥔 쪽이 놓기 전에 세션을 `Abandoned` 로 옮깁니다.
    pub fn abandon(&self) {
        self.cancel.store(true, Ordering::SeqCst);
        if let Some(mut session) = self.inner.try_lock() {
            session.abandon();
        }
    }

    pub fn snapshot(&self, viewer: Viewer) -> StateSnapshot {
        self.inner.lock().snapshot(viewer)
    }

    pub fn with<R>(&self, f: impl FnOnce(&DuelSession) -> R) -> R {
        f(&self.inner.lock())
    }
}

enum Command {
    Submit {
        player_id: Uuid,
        action: Action,
        reply: oneshot::Sender<Result<StateSnapshot, GameError>>,
    },
    Snapshot {
        viewer: Viewer,
        reply: oneshot::Sender<StateSnapshot>,
    },
    Abandon {
        reply: oneshot::Sender<bool>,
    },
}

/// 세션 태스크로 명령을 보내는 핸들. 복제해서 여러 곳에서 써도 처리 순서는 도착 순서입니다.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Uuid,
    tx: mpsc::Sender<Command>,
    cancel: Arc<AtomicBool>,
}

fn closed<T>(_: T) -> GameError {
    InternalError::RuntimeClosed.into()
}

impl SessionHandle {
    /// 세션을 태스크로 옮깁니다. 모든 핸들이 사라지면 태스크가 끝나고 세션을 돌려줍니다.
    pub fn spawn(session: DuelSession) -> (Self, JoinHandle<DuelSession>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let handle = Self {
            session_id: session.id(),
            tx,
            cancel: session.cancel_token(),
        };
        let task = tokio::spawn(run(session, rx));
        (handle, task)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub async fn submit(&self, player_id: Uuid, action: Action) -> Result<StateSnapshot, GameError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Submit {
                player_id,
                action,
                reply,
            })
            .await
            .map_err(closed)?;
        rx.await.map_err(closed)?
    }

    pub async fn snapshot(&self, viewer: Viewer) -> Result<StateSnapshot, GameError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { viewer, reply })
            .await
            .map_err(closed)?;
        rx.await.map_err(closed)
    }

    /// 플래그를 먼저 세우므로 이미 줄 서 있던 행동들도 반영되지 않습니다.
    pub async fn abandon(&self) -> Result<bool, GameError> {
        self.cancel.store(true, Ordering::SeqCst);
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Abandon { reply }).await.map_err(closed)?;
        rx.await.map_err(closed)
    }
}

async fn run(mut session: DuelSession, mut rx: mpsc::Receiver<Command>) -> DuelSession {
    let window = session.timing().response_timeout();
    info!("session {} runtime started", session.id());
    // 지금 열린 응답 윈도우의 주인과 마감 시각. 스냅샷이나 거부된 행동으로는 늘어나지 않습니다.
    let mut open_window: Option<(PlayerKind, Instant)> = None;

    loop {
        let command = match session.awaiting_response() {
            Some(holder) => {
                let deadline = match open_window {
                    Some((current, deadline)) if current == holder => deadline,
                    _ => {
                        let deadline = Instant::now() + window;
                        open_window = Some((holder, deadline));
                        deadline
                    }
                };
                match timeout_at(deadline, rx.recv()).await {
                    Ok(command) => command,
                    Err(_) => {
                        debug!("response window of {} expired", holder);
                        open_window = None;
                        if let Err(err) = session.apply_response_timeout() {
                            warn!("implicit pass failed: {}", err);
                        }
                        continue;
                    }
                }
            }
            None => {
                open_window = None;
                rx.recv().await
            }
        };
        let Some(command) = command else {
            break;
        };

        match command {
            Command::Submit {
                player_id,
                action,
                reply,
            } => {
                let result = session.submit_action(player_id, action);
                if result.is_ok() {
                    open_window = None;
                }
                if reply.send(result).is_err() {
                    debug!("submitter of session {} went away", session.id());
                }
            }
            Command::Snapshot { viewer, reply } => {
                let _ = reply.send(session.snapshot(viewer));
            }
            Command::Abandon { reply } => {
                let _ = reply.send(session.abandon());
            }
        }
    }

    info!("session {} runtime stopped in {:?}", session.id(), session.status());
    session
}
