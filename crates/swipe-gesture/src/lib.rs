//! 滑动手势识别
//!
//! 记录触摸起点与时间，触摸结束时按位移与耗时判定方向：
//! 超过时长上限视为滚动而非滑动；否则取位移较大的轴，位移超过阈值才触发对应回调。

mod classifier;
mod tracker;

pub use classifier::{SwipeConfig, SwipeDirection, TouchPoint, classify};
pub use tracker::{SwipeHandlers, SwipeTracker};
