use std::time::{Duration, Instant};

use tracing::trace;

use crate::classifier::{SwipeConfig, SwipeDirection, TouchPoint, classify};

type Callback = Box<dyn FnMut() + Send>;

/// 各方向的回调，未设置的方向静默忽略
#[derive(Default)]
pub struct SwipeHandlers {
    pub on_left: Option<Callback>,
    pub on_right: Option<Callback>,
    pub on_up: Option<Callback>,
    pub on_down: Option<Callback>,
}

impl SwipeHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_left(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_left = Some(Box::new(f));
        self
    }

    pub fn on_right(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_right = Some(Box::new(f));
        self
    }

    pub fn on_up(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_up = Some(Box::new(f));
        self
    }

    pub fn on_down(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_down = Some(Box::new(f));
        self
    }

    fn dispatch(&mut self, direction: SwipeDirection) {
        let handler = match direction {
            SwipeDirection::Left => &mut self.on_left,
            SwipeDirection::Right => &mut self.on_right,
            SwipeDirection::Up => &mut self.on_up,
            SwipeDirection::Down => &mut self.on_down,
        };
        if let Some(f) = handler {
            f();
        }
    }
}

/// 单指触摸跟踪器
#[derive(Default)]
pub struct SwipeTracker {
    config: SwipeConfig,
    handlers: SwipeHandlers,
    start: Option<(TouchPoint, Instant)>,
}

impl SwipeTracker {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            handlers: SwipeHandlers::default(),
            start: None,
        }
    }

    pub fn with_handlers(mut self, handlers: SwipeHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn touch_start(&mut self, point: TouchPoint) {
        self.touch_start_at(point, Instant::now());
    }

    pub fn touch_start_at(&mut self, point: TouchPoint, at: Instant) {
        self.start = Some((point, at));
    }

    pub fn touch_end(&mut self, point: TouchPoint) -> Option<SwipeDirection> {
        self.touch_end_at(point, Instant::now())
    }

    /// 结束手势并触发回调；没有对应的起点时返回 None
    pub fn touch_end_at(&mut self, point: TouchPoint, at: Instant) -> Option<SwipeDirection> {
        let (start, started_at) = self.start.take()?;
        let elapsed = at.checked_duration_since(started_at).unwrap_or(Duration::ZERO);

        let direction = classify(start, point, elapsed, &self.config);
        trace!(
            dx = point.x - start.x,
            dy = point.y - start.y,
            elapsed_ms = elapsed.as_millis() as u64,
            direction = ?direction,
            "Touch gesture classified"
        );

        if let Some(direction) = direction {
            self.handlers.dispatch(direction);
        }
        direction
    }

    /// 系统取消触摸（来电、弹窗等）
    pub fn touch_cancel(&mut self) {
        self.start = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }
}
