use serde::Deserialize;

/// Top-level server configuration, loaded from `doodledash.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub game: GameConfig,
    pub limits: LimitsConfig,
    pub listing: ListingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8787".to_string(),
            game: GameConfig::default(),
            limits: LimitsConfig::default(),
            listing: ListingConfig::default(),
        }
    }
}

/// Turn-engine timing and capacity knobs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Word-selection window in seconds.
    pub word_selection_secs: u64,
    /// Drawing window in seconds; also the scoring time base.
    pub round_time_secs: u64,
    /// Score-display pause between rounds, in seconds.
    pub round_end_delay_secs: u64,
    /// Each player draws this many turns per game.
    pub turns_per_player: u32,
    /// How many words the drawer picks from.
    pub word_choices: usize,
    pub max_players: usize,
    /// How long a round stays paused waiting for a dropped drawer.
    pub drawer_reconnect_grace_secs: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            word_selection_secs: 20,
            round_time_secs: 80,
            round_end_delay_secs: 5,
            turns_per_player: 3,
            word_choices: 2,
            max_players: 10,
            drawer_reconnect_grace_secs: 30,
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub player_message_buffer: usize,
    pub ws_rate_limit_per_sec: f64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            player_message_buffer: 256,
            ws_rate_limit_per_sec: 50.0,
        }
    }
}

/// Room-listing defaults for clients that send no coordinates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub default_lat: f64,
    pub default_lon: f64,
    pub default_radius_km: f64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            // Kozhikode city center
            default_lat: 11.2488,
            default_lon: 75.7839,
            default_radius_km: 100.0,
        }
    }
}

impl ServerConfig {
    /// Validate configuration, exiting on fatal issues.
    pub fn validate(&self) {
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            tracing::error!(
                addr = %self.listen_addr,
                "listen_addr is not a valid socket address"
            );
            std::process::exit(1);
        }

        if self.game.word_selection_secs == 0 {
            tracing::error!("game.word_selection_secs must be > 0");
            std::process::exit(1);
        }
        if self.game.round_time_secs == 0 {
            tracing::error!("game.round_time_secs must be > 0");
            std::process::exit(1);
        }
        if self.game.turns_per_player == 0 {
            tracing::error!("game.turns_per_player must be > 0");
            std::process::exit(1);
        }
        if self.game.word_choices < 2 {
            tracing::error!("game.word_choices must be >= 2");
            std::process::exit(1);
        }
        if self.game.max_players < 2 {
            tracing::error!("game.max_players must be >= 2");
            std::process::exit(1);
        }

        if self.limits.max_ws_connections == 0 {
            tracing::error!("limits.max_ws_connections must be > 0");
            std::process::exit(1);
        }
        if self.limits.player_message_buffer == 0 {
            tracing::error!("limits.player_message_buffer must be > 0");
            std::process::exit(1);
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            tracing::error!("limits.ws_rate_limit_per_sec must be > 0");
            std::process::exit(1);
        }

        if self.listing.default_radius_km <= 0.0 {
            tracing::error!("listing.default_radius_km must be > 0");
            std::process::exit(1);
        }
    }

    /// Load config from `doodledash.toml` if it exists, then apply env var
    /// overrides.
    pub fn load() -> Self {
        let mut config = match std::fs::read_to_string("doodledash.toml") {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded configuration from doodledash.toml");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse doodledash.toml: {e}, using defaults");
                    ServerConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No doodledash.toml found, using defaults");
                ServerConfig::default()
            },
        };

        // Environment variable overrides
        if let Ok(addr) = std::env::var("DOODLEDASH_LISTEN_ADDR")
            && !addr.is_empty()
        {
            config.listen_addr = addr;
        }
        if let Ok(val) = std::env::var("DOODLEDASH_ROUND_TIME_SECS")
            && let Ok(n) = val.parse::<u64>()
        {
            config.game.round_time_secs = n;
        }
        if let Ok(val) = std::env::var("DOODLEDASH_TURNS_PER_PLAYER")
            && let Ok(n) = val.parse::<u32>()
        {
            config.game.turns_per_player = n;
        }
        if let Ok(val) = std::env::var("DOODLEDASH_MAX_WS_CONNECTIONS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.limits.max_ws_connections = n;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8787");
        assert_eq!(cfg.game.word_selection_secs, 20);
        assert_eq!(cfg.game.round_time_secs, 80);
        assert_eq!(cfg.game.turns_per_player, 3);
        assert_eq!(cfg.game.word_choices, 2);
        assert_eq!(cfg.game.max_players, 10);
    }

    #[test]
    fn parse_minimal_toml() {
        let toml_str = r#"
listen_addr = "127.0.0.1:9090"

[game]
round_time_secs = 60
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.listen_addr, "127.0.0.1:9090");
        assert_eq!(cfg.game.round_time_secs, 60);
        // untouched sections keep defaults
        assert_eq!(cfg.game.turns_per_player, 3);
        assert_eq!(cfg.limits.max_ws_connections, 200);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
listen_addr = "0.0.0.0:3000"

[game]
word_selection_secs = 15
round_time_secs = 45
round_end_delay_secs = 3
turns_per_player = 2
word_choices = 3
max_players = 6
drawer_reconnect_grace_secs = 20

[limits]
max_ws_connections = 500
player_message_buffer = 512
ws_rate_limit_per_sec = 100.0

[listing]
default_lat = 51.5
default_lon = -0.12
default_radius_km = 50.0
"#;
        let cfg: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.game.word_selection_secs, 15);
        assert_eq!(cfg.game.turns_per_player, 2);
        assert_eq!(cfg.game.word_choices, 3);
        assert_eq!(cfg.limits.max_ws_connections, 500);
        assert!((cfg.listing.default_radius_km - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_accepts_default_config() {
        ServerConfig::default().validate();
    }

    #[test]
    fn validate_rejects_invalid_addr() {
        let cfg = ServerConfig {
            listen_addr: "not-an-address".to_string(),
            ..ServerConfig::default()
        };
        // validate() calls process::exit, so test the underlying check
        assert!(cfg.listen_addr.parse::<std::net::SocketAddr>().is_err());
    }

    #[test]
    fn missing_sections_use_defaults() {
        let cfg: ServerConfig = toml::from_str(r#"listen_addr = "0.0.0.0:8080""#).unwrap();
        assert_eq!(cfg.game.round_time_secs, 80);
        assert_eq!(cfg.limits.player_message_buffer, 256);
        assert!((cfg.listing.default_lat - 11.2488).abs() < f64::EPSILON);
    }
}
