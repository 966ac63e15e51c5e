//! Cooperative shutdown on Ctrl-C
//!
//! Long-running loops poll a shared [`StopFlag`] between units of work and
//! sleep through it, so an interrupt ends the current unit cleanly instead
//! of killing the process mid-write.

use crate::{CommentaryError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag raised by the first Ctrl-C; a second one kills the process
    pub fn on_ctrl_c() -> Result<Self> {
        let flag = StopFlag::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            if handler_flag.is_stopped() {
                std::process::exit(130);
            }
            log::warn!("Interrupt received, stopping after the current step");
            handler_flag.stop();
        })
        .map_err(|e| CommentaryError::Config(format!("Cannot install Ctrl-C handler: {}", e)))?;
        Ok(flag)
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` or until stopped; returns false when stopped
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(POLL_INTERVAL.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = StopFlag::new();
        let other = flag.clone();
        assert!(!other.is_stopped());
        flag.stop();
        assert!(other.is_stopped());
    }

    #[test]
    fn test_sleep_returns_early_when_stopped() {
        let flag = StopFlag::new();
        assert!(flag.sleep(Duration::from_millis(5)));

        let remote = flag.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            remote.stop();
        });
        let start = Instant::now();
        assert!(!flag.sleep(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }
}
