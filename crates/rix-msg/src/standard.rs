//! Scalar wrappers and the common header shared by stamped messages.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

crate::message! {
    /// Wall-clock timestamp split into whole seconds and nanoseconds.
    pub struct Time {
        pub sec: u32,
        pub nsec: u32,
    }
}

impl Time {
    /// Current wall-clock time. Clocks before the Unix epoch read as zero.
    pub fn now() -> Self {
        let since = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::from(since)
    }

    pub fn as_duration(&self) -> Duration {
        Duration::new(u64::from(self.sec), self.nsec)
    }
}

impl From<Duration> for Time {
    fn from(d: Duration) -> Self {
        Self {
            sec: u32::try_from(d.as_secs()).unwrap_or(u32::MAX),
            nsec: d.subsec_nanos(),
        }
    }
}

crate::message! {
    /// Sequence number, timestamp and coordinate frame of a stamped message.
    pub struct Header {
        pub seq: u32,
        pub stamp: Time,
        pub frame_id: String,
    }
}

crate::message! {
    pub struct UInt32 {
        pub data: u32,
    }
}

crate::message! {
    pub struct Float64 {
        pub data: f64,
    }
}

crate::message! {
    pub struct Bool {
        pub data: bool,
    }
}

crate::message! {
    pub struct Text {
        pub data: String,
    }
}
