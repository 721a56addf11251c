use crate::error::{ProvisionError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn current_timestamp() -> Result<u64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ProvisionError::Io(format!("System time error: {e}")))?
        .as_millis();

    // Ensure the timestamp fits in u64
    u64::try_from(duration).map_err(|_| ProvisionError::Io("Timestamp overflow".to_string()))
}

/// Fractional seconds since the Unix epoch, as reported by the health probe
pub fn unix_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_milliseconds() {
        let ts = current_timestamp().unwrap();
        // later than 2020-01-01 in ms
        assert!(ts > 1_577_836_800_000);
        let secs = unix_seconds();
        assert!((secs * 1000.0) as u64 >= ts);
    }
}
