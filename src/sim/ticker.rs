//! 同步节拍器
//!
//! 触发端与消费端之间的请求/应答握手：上一个节拍未被确认前，
//! 下一次 `trigger` 不会返回，因此绝不会有两个节拍同时在途。

use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, TrySendError, sync_channel};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use super::time::SimTime;

/// 握手的另一端已退出（线程结束或提前中止）。
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("ticker {id} closed: the other half of the handshake is gone")]
pub struct TickerClosed {
    pub id: String,
}

/// 触发端：发出节拍并阻塞等待确认。
pub struct ClockTrigger {
    id: String,
    tick_tx: SyncSender<SimTime>,
    done_rx: Receiver<()>,
}

/// 消费端：接收节拍，处理完后调用 `done` 确认。
pub struct Ticker {
    id: String,
    tick_rx: Receiver<SimTime>,
    done_tx: SyncSender<()>,
    awaiting_ack: bool,
}

/// 创建一对同步节拍器。每个驱动器恰好持有一对，以其负载 ID 命名。
pub fn sync_ticker(id: impl Into<String>) -> (ClockTrigger, Ticker) {
    let id = id.into();
    // 节拍通道无缓冲：trigger 直到消费端开始接收才继续。
    let (tick_tx, tick_rx) = sync_channel(0);
    let (done_tx, done_rx) = sync_channel(1);
    (
        ClockTrigger {
            id: id.clone(),
            tick_tx,
            done_rx,
        },
        Ticker {
            id,
            tick_rx,
            done_tx,
            awaiting_ack: false,
        },
    )
}

impl ClockTrigger {
    /// 发出一个节拍并阻塞，直到消费端对它调用 `done`。
    pub fn trigger(&self, tick: SimTime) -> Result<(), TickerClosed> {
        debug!(ticker = %self.id, tick = ?tick, "triggering tick");
        self.tick_tx.send(tick).map_err(|_| TickerClosed {
            id: self.id.clone(),
        })?;
        self.done_rx.recv().map_err(|_| TickerClosed {
            id: self.id.clone(),
        })?;
        Ok(())
    }
}

impl Ticker {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// 阻塞等待下一个节拍。
    pub fn recv(&mut self) -> Result<SimTime, TickerClosed> {
        let tick = self.tick_rx.recv().map_err(|_| TickerClosed {
            id: self.id.clone(),
        })?;
        self.awaiting_ack = true;
        Ok(tick)
    }

    /// 限时等待下一个节拍；超时返回 `Ok(None)`。
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<SimTime>, TickerClosed> {
        match self.tick_rx.recv_timeout(timeout) {
            Ok(tick) => {
                self.awaiting_ack = true;
                Ok(Some(tick))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TickerClosed {
                id: self.id.clone(),
            }),
        }
    }

    /// 确认当前节拍已处理完。无在途节拍时为空操作，
    /// 因此重复确认不会让后续 `trigger` 提前返回。
    pub fn done(&mut self) {
        if !self.awaiting_ack {
            warn!(ticker = %self.id, "done() called with no tick awaiting ack; ignoring");
            return;
        }
        self.awaiting_ack = false;
        match self.done_tx.try_send(()) {
            Ok(()) => {}
            // 触发端已退出；确认无人接收也无妨。
            Err(TrySendError::Disconnected(())) => {}
            Err(TrySendError::Full(())) => {
                warn!(ticker = %self.id, "stale ack still buffered; dropping duplicate");
            }
        }
    }
}
