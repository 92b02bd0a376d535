use std::time::Duration;

use tracing::warn;

pub const UPDATES_PER_SECOND_ENV: &str = "LINETRACE_UPDATES_PER_SECOND";
pub const CASE_INSENSITIVE_ENV: &str = "LINETRACE_CASE_INSENSITIVE";
pub const CHANNEL_CAPACITY_ENV: &str = "LINETRACE_CHANNEL_CAPACITY";

const DEFAULT_UPDATES_PER_SECOND: u32 = 15;
const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Upper bound on throttled UI refreshes while events stream in.
    pub updates_per_second: u32,
    /// Compare filenames without regard to case.
    pub case_insensitive_paths: bool,
    /// Buffer size for collaborators that feed messages through a channel.
    pub message_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            updates_per_second: DEFAULT_UPDATES_PER_SECOND,
            case_insensitive_paths: cfg!(any(target_os = "windows", target_os = "macos")),
            message_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by whatever `LINETRACE_*` variables are set.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_parse::<u32>(UPDATES_PER_SECOND_ENV) {
            config.updates_per_second = v;
        }
        if let Some(v) = env_parse::<bool>(CASE_INSENSITIVE_ENV) {
            config.case_insensitive_paths = v;
        }
        if let Some(v) = env_parse::<usize>(CHANNEL_CAPACITY_ENV) {
            config.message_capacity = v;
        }
        config
    }

    /// Delay between the first ingested message and the refresh it triggers.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(1) / self.updates_per_second.max(1)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable config value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_interval_is_a_fifteenth_of_a_second() {
        let config = SessionConfig::default();
        assert_eq!(config.refresh_interval(), Duration::from_secs(1) / 15);
    }

    #[test]
    fn zero_rate_does_not_divide_by_zero() {
        let config = SessionConfig {
            updates_per_second: 0,
            ..SessionConfig::default()
        };
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
