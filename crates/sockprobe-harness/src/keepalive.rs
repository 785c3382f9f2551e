//! Idle state entered after the comprehensive matrix, so the process
//! stays up for its peer until it is interrupted.

use std::time::Duration;

pub const IDLE_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep until the process is killed.
pub fn idle_forever(interval: Duration) -> ! {
    loop {
        std::thread::sleep(interval);
    }
}
