//! Sink forwarding lines to the `log` facade.

use log::Level;

use super::LogSink;

/// Sink that re-emits every line through the [`log`] crate.
///
/// Useful when the host application already routes its `log` output to a
/// system logger: multiplexed lines then follow the same path. Lines go
/// out under the `logmux` target at a fixed level, `Info` by default.
#[derive(Debug, Clone)]
pub struct FacadeSink {
    level: Level,
}

impl FacadeSink {
    /// Create a sink emitting at `Info`.
    pub fn new() -> Self {
        Self { level: Level::Info }
    }

    /// Create a sink emitting at the given level.
    pub fn with_level(level: Level) -> Self {
        Self { level }
    }

    /// The level lines are emitted at.
    pub fn level(&self) -> Level {
        self.level
    }
}

impl Default for FacadeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for FacadeSink {
    fn append(&self, line: &str) {
        log::log!(target: "logmux", self.level, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_is_info() {
        assert_eq!(FacadeSink::new().level(), Level::Info);
        assert_eq!(FacadeSink::default().level(), Level::Info);
    }

    #[test]
    fn test_with_level_overrides() {
        assert_eq!(FacadeSink::with_level(Level::Debug).level(), Level::Debug);
    }
}
