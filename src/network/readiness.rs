use crate::network::AdminRpc;
use log::debug;
use std::thread;
use std::time::{Duration, Instant};

/// Block until the RPC port accepts connections or `timeout` elapses
///
/// The port is checked once immediately, so a zero timeout is a single probe.
pub fn wait_until_ready(
    rpc: &dyn AdminRpc,
    port: u16,
    timeout: Duration,
    poll: Duration,
) -> bool {
    let deadline = Instant::now() + timeout;
    let mut probes = 0u32;
    loop {
        probes += 1;
        if rpc.is_reachable(port) {
            debug!("RPC port {port} ready after {probes} probe(s)");
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            debug!("RPC port {port} still closed after {probes} probe(s)");
            return false;
        }
        thread::sleep(poll.min(deadline - now));
    }
}
