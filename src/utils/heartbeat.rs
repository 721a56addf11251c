use log::info;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const STOP_POLL: Duration = Duration::from_millis(100);

/// Background liveness signal
///
/// Logs an `alive` line every interval until stopped or dropped. It shares
/// nothing with the provisioning run it accompanies.
pub struct Heartbeat {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl Heartbeat {
    pub fn spawn(interval: Duration) -> Heartbeat {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            let mut beats = 0;
            let mut next = Instant::now();
            while !flag.load(Ordering::Relaxed) {
                if Instant::now() >= next {
                    beats += 1;
                    info!("[heartbeat] alive @ {:.0}", crate::utils::unix_seconds());
                    next = Instant::now() + interval;
                }
                thread::sleep(STOP_POLL.min(interval.max(Duration::from_millis(1))));
            }
            beats
        });

        Heartbeat {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the thread and return how many beats it emitted
    pub fn stop(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.store(true, Ordering::Relaxed);
        self.handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or(0)
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.shutdown();
    }
}
