//! 仿真核心模块
//!
//! 此模块包含驱动仿真的核心组件：仿真时间、只进时钟与同步节拍器。

// 子模块声明
mod clock;
mod ticker;
mod time;

// 重新导出公共接口
pub use clock::{ClockError, SimulationClock};
pub use ticker::{ClockTrigger, Ticker, TickerClosed, sync_ticker};
pub use time::{SimDuration, SimTime};
