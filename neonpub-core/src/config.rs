use std::{env, str::FromStr, time::Duration};

use thiserror::Error;

/// Tunables of a neonpub instance.
#[derive(Debug, Clone)]
pub struct Config {
    /// How many reactions a participant may send per performance
    pub reaction_limit: u32,
    /// Messages longer than this (in characters) are truncated
    pub message_max_length: usize,
    /// Points awarded for a correct answer to a preset question
    pub quiz_points: i32,
    /// How many entries the venue leaderboard lists
    pub leaderboard_size: usize,
    /// How many entries the final leaderboard of a quiz session lists
    pub session_leaderboard_size: usize,
    /// How many queued requests the display snapshot includes
    pub display_queue_size: usize,
    /// How many leaderboard entries the display snapshot includes
    pub display_leaderboard_size: usize,
    /// Upper bound of any listing returned to clients
    pub listing_limit: usize,
    /// How many events may wait for a slow live channel before it is dropped
    pub channel_capacity: usize,
    /// How long a single write to a live channel may take
    pub channel_write_timeout: Duration,
    /// Bounds every database statement, connection checkout and video search request
    pub downstream_timeout: Duration,
    /// How long a login session stays valid
    pub session_duration_in_days: i64,
    /// The length of a venue join code
    pub join_code_length: usize,
    /// How many candidates a video search returns
    pub search_results: usize,
    /// Search a video automatically when a request comes without one
    pub auto_search: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value: {value}")]
    InvalidValue { name: &'static str, value: String },
}

impl Config {
    /// Reads overrides from `NEONPUB_*` environment variables, keeping defaults for the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            reaction_limit: var_or("NEONPUB_REACTION_LIMIT", defaults.reaction_limit)?,
            message_max_length: var_or("NEONPUB_MESSAGE_MAX_LENGTH", defaults.message_max_length)?,
            quiz_points: var_or("NEONPUB_QUIZ_POINTS", defaults.quiz_points)?,
            channel_capacity: var_or("NEONPUB_CHANNEL_CAPACITY", defaults.channel_capacity)?,
            channel_write_timeout: Duration::from_millis(var_or(
                "NEONPUB_CHANNEL_WRITE_TIMEOUT_MS",
                defaults.channel_write_timeout.as_millis() as u64,
            )?),
            downstream_timeout: Duration::from_millis(var_or(
                "NEONPUB_DOWNSTREAM_TIMEOUT_MS",
                defaults.downstream_timeout.as_millis() as u64,
            )?),
            session_duration_in_days: var_or(
                "NEONPUB_SESSION_DAYS",
                defaults.session_duration_in_days,
            )?,
            auto_search: var_or("NEONPUB_AUTO_SEARCH", defaults.auto_search)?,
            ..defaults
        })
    }
}

fn var_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reaction_limit: 3,
            message_max_length: 100,
            quiz_points: 10,
            leaderboard_size: 20,
            session_leaderboard_size: 10,
            display_queue_size: 10,
            display_leaderboard_size: 5,
            listing_limit: 100,
            channel_capacity: 64,
            channel_write_timeout: Duration::from_secs(3),
            downstream_timeout: Duration::from_secs(5),
            session_duration_in_days: 7,
            join_code_length: 8,
            search_results: 5,
            auto_search: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{var_or, ConfigError};

    #[test]
    fn missing_variable_falls_back() {
        let value: u32 = var_or("NEONPUB_TEST_SURELY_UNSET", 7).unwrap();
        assert_eq!(value, 7);
    }

    #[test]
    fn invalid_variable_is_reported() {
        std::env::set_var("NEONPUB_TEST_INVALID_LIMIT", "lots");
        let result: Result<u32, _> = var_or("NEONPUB_TEST_INVALID_LIMIT", 3);

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "NEONPUB_TEST_INVALID_LIMIT", .. })
        ));
    }
}
