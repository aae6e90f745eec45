//! 仿真时钟
//!
//! 只允许前进的可设置逻辑时钟。

use std::sync::Mutex;
use thiserror::Error;

use super::time::{SimDuration, SimTime};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClockError {
    /// 时钟只能前进；允许设置相等的值。
    #[error("attempted to move clock from {current:?} back to {requested:?}")]
    OutOfOrder { current: SimTime, requested: SimTime },
}

/// 仿真时钟：持有单个时间戳，内部加锁，可跨线程读取。
#[derive(Debug, Default)]
pub struct SimulationClock {
    time: Mutex<SimTime>,
}

impl SimulationClock {
    pub fn new() -> SimulationClock {
        SimulationClock::default()
    }

    /// 读取当前时钟值。
    pub fn time(&self) -> SimTime {
        *self.time.lock().expect("simulation clock lock")
    }

    /// 将时钟推进到给定时间戳，返回新值与前后差值。
    /// 新值早于当前值时返回 `ClockError::OutOfOrder`，绝不静默截断。
    pub fn increase_clock_time_to(
        &self,
        t: SimTime,
    ) -> Result<(SimTime, SimDuration), ClockError> {
        let mut time = self.time.lock().expect("simulation clock lock");
        if t < *time {
            return Err(ClockError::OutOfOrder {
                current: *time,
                requested: t,
            });
        }
        let delta = t - *time;
        *time = t;
        Ok((t, delta))
    }

    /// 将时钟前进固定跨度，返回新值。每次发出节拍时恰好调用一次。
    pub fn increment_clock_by(&self, d: SimDuration) -> SimTime {
        let mut time = self.time.lock().expect("simulation clock lock");
        *time = *time + d;
        *time
    }
}
