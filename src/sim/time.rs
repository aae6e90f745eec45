//! 仿真时间类型
//!
//! 定义仿真时间、时间跨度及其单位转换。

use std::ops::{Add, Div, Sub};

/// 仿真时间（纳秒），从轨迹起点算起。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }
    pub fn as_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// 回退一个跨度；不足时停在零点。
    pub fn saturating_back(self, d: SimDuration) -> SimTime {
        SimTime(self.0.saturating_sub(d.0))
    }
}

/// 仿真时间跨度（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct SimDuration(pub u64);

impl SimDuration {
    pub const ZERO: SimDuration = SimDuration(0);
    pub fn from_micros(us: u64) -> SimDuration {
        SimDuration(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimDuration {
        SimDuration(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimDuration {
        SimDuration(s.saturating_mul(1_000_000_000))
    }
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// 转换为挂钟时长，用于节奏控制的真实休眠。
    pub fn to_std(self) -> std::time::Duration {
        std::time::Duration::from_nanos(self.0)
    }
}

impl Add<SimDuration> for SimTime {
    type Output = SimTime;
    fn add(self, rhs: SimDuration) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

// 相减饱和到零，调用方需自行保证大小关系。
impl Sub<SimTime> for SimTime {
    type Output = SimDuration;
    fn sub(self, rhs: SimTime) -> SimDuration {
        SimDuration(self.0.saturating_sub(rhs.0))
    }
}

// 整数除法向下取整，即一个跨度内完整包含的节拍数。
impl Div<SimDuration> for SimDuration {
    type Output = u64;
    fn div(self, rhs: SimDuration) -> u64 {
        if rhs.0 == 0 {
            return 0;
        }
        self.0 / rhs.0
    }
}
