use serde::Deserialize;
use std::time::Duration;

/// 屏幕坐标（像素），y 轴向下
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

impl TouchPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// 识别参数
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwipeConfig {
    /// 主轴位移必须严格大于该值
    pub threshold_px: f64,
    /// 耗时严格大于该值的手势被丢弃
    #[serde(with = "millis")]
    pub max_duration: Duration,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            threshold_px: 50.0,
            max_duration: Duration::from_millis(1000),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// 根据起止坐标与耗时判定方向
///
/// |dx| 与 |dy| 相等时走纵向分支。
pub fn classify(
    start: TouchPoint,
    end: TouchPoint,
    elapsed: Duration,
    config: &SwipeConfig,
) -> Option<SwipeDirection> {
    if elapsed > config.max_duration {
        return None;
    }

    let dx = end.x - start.x;
    let dy = end.y - start.y;

    if dx.abs() > dy.abs() {
        if dx.abs() <= config.threshold_px {
            return None;
        }
        Some(if dx > 0.0 {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        })
    } else {
        if dy.abs() <= config.threshold_px {
            return None;
        }
        Some(if dy > 0.0 {
            SwipeDirection::Down
        } else {
            SwipeDirection::Up
        })
    }
}
