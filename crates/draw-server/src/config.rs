//! Server configuration loaded from environment variables.

use std::str::FromStr;

use draw_core::bot::BotTiming;
use draw_core::poker::HAND_SIZE;
use draw_core::protocol::RoomConfig;

/// Everything the server needs at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served for everything outside `/ws` and `/api`.
    pub static_dir: String,
    /// Settings every new room starts with.
    pub room_defaults: RoomConfig,
    pub bot_timing: BotTiming,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            static_dir: "./public".to_string(),
            room_defaults: RoomConfig::default(),
            bot_timing: BotTiming::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Unparsable { var: &'static str, value: String },

    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl ServerConfig {
    /// Read `PORT`, `STATIC_DIR` and the `DRAW_*` variables.  Unset variables
    /// keep their defaults; set but malformed ones are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServerConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let room = defaults.room_defaults;
        let bots = defaults.bot_timing;

        let config = Self {
            port: parse_var(&lookup, "PORT", defaults.port)?,
            static_dir: lookup("STATIC_DIR").unwrap_or(defaults.static_dir),
            room_defaults: RoomConfig {
                max_seats: parse_var(&lookup, "DRAW_MAX_SEATS", room.max_seats)?,
                ante: parse_var(&lookup, "DRAW_ANTE", room.ante)?,
                min_bet: parse_var(&lookup, "DRAW_MIN_BET", room.min_bet)?,
                max_discard: parse_var(&lookup, "DRAW_MAX_DISCARD", room.max_discard)?,
                starting_stack: parse_var(&lookup, "DRAW_STARTING_STACK", room.starting_stack)?,
                rotate_dealer: parse_var(&lookup, "DRAW_ROTATE_DEALER", room.rotate_dealer)?,
            },
            bot_timing: BotTiming {
                delay_ms: parse_var(&lookup, "DRAW_BOT_DELAY_MS", bots.delay_ms)?,
                jitter_ms: parse_var(&lookup, "DRAW_BOT_JITTER_MS", bots.jitter_ms)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let room = &self.room_defaults;
        if room.max_discard > HAND_SIZE {
            return Err(ConfigError::Invalid {
                var: "DRAW_MAX_DISCARD",
                reason: format!("must be at most {HAND_SIZE}"),
            });
        }
        // five cards each plus a full round of discards must fit in 52
        if room.max_seats < 2 || room.max_seats * (HAND_SIZE + room.max_discard) > 52 {
            return Err(ConfigError::Invalid {
                var: "DRAW_MAX_SEATS",
                reason: format!(
                    "must be at least 2 and leave enough cards for {} discards each",
                    room.max_discard
                ),
            });
        }
        if room.min_bet == 0 {
            return Err(ConfigError::Invalid {
                var: "DRAW_MIN_BET",
                reason: "must be greater than 0".to_string(),
            });
        }
        if room.starting_stack == 0 {
            return Err(ConfigError::Invalid {
                var: "DRAW_STARTING_STACK",
                reason: "must be greater than 0".to_string(),
            });
        }
        // a full table's chips must fit in a u32 pot
        if room.max_seats as u64 * room.starting_stack as u64 > u32::MAX as u64 {
            return Err(ConfigError::Invalid {
                var: "DRAW_STARTING_STACK",
                reason: format!(
                    "{} seats of {} chips exceed the pot limit of {}",
                    room.max_seats,
                    room.starting_stack,
                    u32::MAX
                ),
            });
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Unparsable { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, "./public");
        assert_eq!(config.room_defaults, RoomConfig::default());
        assert_eq!(config.bot_timing, BotTiming::default());
    }

    #[test]
    fn variables_override_defaults() {
        let config = load(&[
            ("PORT", "9000"),
            ("STATIC_DIR", "/srv/www"),
            ("DRAW_ANTE", "5"),
            ("DRAW_MAX_SEATS", "4"),
            ("DRAW_ROTATE_DEALER", "true"),
            ("DRAW_BOT_DELAY_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.static_dir, "/srv/www");
        assert_eq!(config.room_defaults.ante, 5);
        assert_eq!(config.room_defaults.max_seats, 4);
        assert!(config.room_defaults.rotate_dealer);
        assert_eq!(config.bot_timing.delay_ms, 0);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = load(&[("DRAW_ANTE", "ten")]).unwrap_err();
        assert!(matches!(err, ConfigError::Unparsable { var: "DRAW_ANTE", .. }));
        assert!(err.to_string().contains("ten"));
    }

    #[test]
    fn table_limits_are_validated() {
        assert!(matches!(
            load(&[("DRAW_MAX_SEATS", "1")]),
            Err(ConfigError::Invalid { var: "DRAW_MAX_SEATS", .. })
        ));
        assert!(matches!(
            load(&[("DRAW_MAX_SEATS", "7")]),
            Err(ConfigError::Invalid { var: "DRAW_MAX_SEATS", .. })
        ));
        assert!(matches!(
            load(&[("DRAW_MIN_BET", "0")]),
            Err(ConfigError::Invalid { var: "DRAW_MIN_BET", .. })
        ));
        let huge = u32::MAX.to_string();
        assert!(matches!(
            load(&[("DRAW_STARTING_STACK", huge.as_str())]),
            Err(ConfigError::Invalid { var: "DRAW_STARTING_STACK", .. })
        ));
        assert!(matches!(
            load(&[("DRAW_MAX_SEATS", "2"), ("DRAW_STARTING_STACK", "2000000000")]),
            Ok(_)
        ));
    }
}
