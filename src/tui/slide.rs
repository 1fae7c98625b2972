//! # Slide Transition
//!
//! A time-driven change handler: the incoming view slides in from the right
//! on push, the outgoing view slides out to the right on pop. Progress is
//! expressed through `Container::set_translation` and advanced by the event
//! loop's tick via `Navigator::advance`.

use std::time::Duration;

use log::debug;

use crate::core::bundle::Bundle;
use crate::core::change::{ChangeCompletion, ChangeHandler};
use crate::core::error::ChangeError;
use crate::core::view::{Container, ViewId};

const KEY_DURATION_MS: &str = "duration_ms";

struct Running {
    from: Option<ViewId>,
    to: Option<ViewId>,
    is_push: bool,
    elapsed: Duration,
    completion: ChangeCompletion,
}

pub struct SlideChangeHandler {
    duration: Duration,
    running: Option<Running>,
}

impl SlideChangeHandler {
    pub const KIND: &'static str = "slide";

    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            running: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Registry factory; the real duration arrives through `restore_state`.
    pub fn build() -> Box<dyn ChangeHandler> {
        Box::new(Self::new(Duration::ZERO))
    }

    fn progress(&self, elapsed: Duration) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn apply(container: &mut Container, running: &Running, progress: f32) {
        if running.is_push {
            if let Some(to) = running.to {
                container.set_translation(to, 1.0 - progress);
            }
        } else if let Some(from) = running.from {
            container.set_translation(from, progress);
        }
    }

    fn finish(&mut self, container: &mut Container) {
        let Some(running) = self.running.take() else {
            return;
        };
        if let Some(from) = running.from {
            container.remove_view(from);
        }
        if let Some(to) = running.to {
            container.add_view(to);
            container.set_translation(to, 0.0);
        }
        running.completion.complete();
    }
}

impl ChangeHandler for SlideChangeHandler {
    fn kind(&self) -> &'static str {
        Self::KIND
    }

    fn perform_change(
        &mut self,
        container: &mut Container,
        from: Option<ViewId>,
        to: Option<ViewId>,
        is_push: bool,
        completion: ChangeCompletion,
    ) -> Result<(), ChangeError> {
        if self.running.is_some() {
            return Err(ChangeError("slide already running".to_string()));
        }
        if let Some(to) = to {
            match from {
                // Popping reveals the destination underneath.
                Some(from) if !is_push => container.insert_view_below(to, from),
                _ => container.add_view(to),
            }
        }
        let running = Running {
            from,
            to,
            is_push,
            elapsed: Duration::ZERO,
            completion,
        };
        Self::apply(container, &running, 0.0);
        self.running = Some(running);

        if self.duration.is_zero() {
            self.finish(container);
        }
        Ok(())
    }

    fn advance(&mut self, container: &mut Container, elapsed: Duration) {
        let Some(running) = self.running.as_mut() else {
            return;
        };
        running.elapsed += elapsed;
        let total = running.elapsed;
        let progress = self.progress(total);
        if let Some(running) = self.running.as_ref() {
            Self::apply(container, running, progress);
        }
        if progress >= 1.0 {
            self.finish(container);
        }
    }

    fn cancel(&mut self, container: &mut Container, immediate: bool) {
        if immediate {
            debug!("Slide cancelled, jumping to end state");
            self.finish(container);
        }
    }

    fn copy(&self) -> Box<dyn ChangeHandler> {
        Box::new(Self::new(self.duration))
    }

    fn save_state(&self, bundle: &mut Bundle) {
        bundle.put(KEY_DURATION_MS, self.duration.as_millis() as u64);
    }

    fn restore_state(&mut self, bundle: &Bundle) {
        self.duration = Duration::from_millis(bundle.get_u64(KEY_DURATION_MS).unwrap_or(0));
    }
}
