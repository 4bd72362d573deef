//! Shared configuration for desktop and ESP32 builds.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use garage_sentry::config::{Config, MqttConfig, TimingConfig};
//!
//! // Use defaults: three doors on GPIO13/12/14, 5 minute alerts
//! let config = Config::default();
//! assert_eq!(config.doors.len(), 3);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_mqtt(MqttConfig::default().with_host("192.168.1.100"))
//!     .with_timing(TimingConfig::default().with_max_open_ms(60_000));
//! ```

use heapless::String as HString;
use heapless::Vec;

use crate::debounce::DebounceSettings;

/// Maximum length for short config strings (hostnames, client IDs)
pub const MAX_SHORT_STRING: usize = 64;

/// Maximum length for longer config strings (topics)
pub const MAX_LONG_STRING: usize = 128;

/// Maximum number of doors a configuration can describe.
pub const MAX_DOORS: usize = 5;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Type alias for longer config strings
pub type LongString = HString<MAX_LONG_STRING>;

// ============================================================================
// Helper for creating heapless strings
// ============================================================================

fn truncated<const N: usize>(s: &str) -> HString<N> {
    let mut hs = HString::new();
    // Cut on a char boundary at or below N bytes
    let end = s
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= N)
        .last()
        .unwrap_or(0);
    let _ = hs.push_str(&s[..end]);
    hs
}

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    truncated(s)
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// MQTT client configuration
    pub mqtt: MqttConfig,
    /// Device identification
    pub device: DeviceConfig,
    /// Debounce, alert and heartbeat timing
    pub timing: TimingConfig,
    /// Reconnect backoff and offline publishing
    pub reconnect: ReconnectConfig,
    /// Monitored doors, in door-number order
    pub doors: DoorList,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            wifi: WifiConfig::default(),
            mqtt: MqttConfig::default(),
            device: DeviceConfig::default(),
            timing: TimingConfig::default(),
            reconnect: ReconnectConfig::default(),
            doors: default_doors(),
        }
    }
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set MQTT configuration
    pub fn with_mqtt(mut self, mqtt: MqttConfig) -> Self {
        self.mqtt = mqtt;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }

    /// Set timing configuration
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set reconnect configuration
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Whether the device should bring up WiFi and MQTT at all.
    pub fn is_online(&self) -> bool {
        self.wifi.enabled && self.wifi.is_configured() && self.mqtt.enabled
    }

    /// Replace the door list
    pub fn with_doors(mut self, doors: DoorList) -> Self {
        self.doors = doors;
        self
    }
}

// ============================================================================
// MQTT Config
// ============================================================================

/// MQTT client configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MqttConfig {
    /// Broker hostname or IP
    pub host: ShortString,
    /// Broker port
    pub port: u16,
    /// Client ID (should be unique per device)
    pub client_id: ShortString,
    /// Username for authentication (empty = no auth)
    pub username: ShortString,
    /// Password for authentication
    pub password: ShortString,
    /// Keep-alive interval in seconds
    pub keep_alive_secs: u16,
    /// Whether MQTT is enabled
    pub enabled: bool,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            host: short_string("localhost"),
            port: 1883,
            client_id: short_string("garage-sentry"),
            username: ShortString::new(),
            password: ShortString::new(),
            keep_alive_secs: 30,
            enabled: true,
        }
    }
}

impl MqttConfig {
    /// Set the broker host
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = short_string(host);
        self
    }

    /// Set the broker port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the client ID
    pub fn with_client_id(mut self, id: &str) -> Self {
        self.client_id = short_string(id);
        self
    }

    /// Set authentication credentials
    pub fn with_auth(mut self, username: &str, password: &str) -> Self {
        self.username = short_string(username);
        self.password = short_string(password);
        self
    }

    /// Set the keep-alive interval
    pub fn with_keep_alive_secs(mut self, secs: u16) -> Self {
        self.keep_alive_secs = secs;
        self
    }

    /// Enable or disable MQTT
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if authentication is configured
    pub fn has_auth(&self) -> bool {
        !self.username.is_empty()
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        !self.ssid.is_empty()
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Device name used as the second topic segment
    /// (`SENSOR/<name>/PORT/1`)
    pub name: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("GARAGE"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }
}

// ============================================================================
// Timing Config
// ============================================================================

/// Debounce, alert and heartbeat timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingConfig {
    /// Time a reed switch must hold a level before it counts
    pub bounce_delay_ms: u32,
    /// Open-duration alert interval; repeats while the door stays open
    pub max_open_ms: u32,
    /// Interval between `ACTIVE` heartbeats while connected
    pub heartbeat_ms: u32,
    /// Status LED half period
    pub status_blink_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bounce_delay_ms: 150,
            max_open_ms: 300_000,
            heartbeat_ms: 60_000,
            status_blink_ms: 500,
        }
    }
}

impl TimingConfig {
    /// Set the debounce window
    pub fn with_bounce_delay_ms(mut self, ms: u32) -> Self {
        self.bounce_delay_ms = ms;
        self
    }

    /// Set the open-duration alert interval
    pub fn with_max_open_ms(mut self, ms: u32) -> Self {
        self.max_open_ms = ms;
        self
    }

    /// Set the heartbeat interval
    pub fn with_heartbeat_ms(mut self, ms: u32) -> Self {
        self.heartbeat_ms = ms;
        self
    }

    /// Set the status LED half period
    pub fn with_status_blink_ms(mut self, ms: u32) -> Self {
        self.status_blink_ms = ms;
        self
    }

    /// Minutes added to a door's open total per alert.
    pub fn minutes_per_alert(&self) -> u32 {
        self.max_open_ms / 60_000
    }
}

// ============================================================================
// Reconnect Config
// ============================================================================

/// What to do with a publish while the session is down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum OfflinePolicy {
    /// Log and discard.
    Drop,
    /// Hold in a bounded queue and flush on reconnect; oldest evicted first.
    #[default]
    Queue,
}

impl OfflinePolicy {
    /// Returns the policy as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OfflinePolicy::Drop => "drop",
            OfflinePolicy::Queue => "queue",
        }
    }
}

/// Reconnect backoff configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconnectConfig {
    /// Delay before the first retry after a failure
    pub initial_backoff_ms: u32,
    /// Ceiling for the doubling backoff
    pub max_backoff_ms: u32,
    /// Publishing behaviour while disconnected
    pub offline_policy: OfflinePolicy,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 10_000,
            max_backoff_ms: 60_000,
            offline_policy: OfflinePolicy::Queue,
        }
    }
}

impl ReconnectConfig {
    /// Set the initial backoff
    pub fn with_initial_backoff_ms(mut self, ms: u32) -> Self {
        self.initial_backoff_ms = ms;
        self
    }

    /// Set the backoff ceiling
    pub fn with_max_backoff_ms(mut self, ms: u32) -> Self {
        self.max_backoff_ms = ms;
        self
    }

    /// Set the offline publish policy
    pub fn with_offline_policy(mut self, policy: OfflinePolicy) -> Self {
        self.offline_policy = policy;
        self
    }
}

// ============================================================================
// Door Config
// ============================================================================

/// Fixed-capacity list of doors.
pub type DoorList = Vec<DoorConfig, MAX_DOORS>;

/// One monitored door
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DoorConfig {
    /// GPIO the reed switch is wired to
    pub pin: u8,
    /// Indicator pixel for this door
    pub indicator_channel: u8,
    /// Debounce flags for the channel
    pub settings: DebounceSettings,
}

impl DoorConfig {
    /// Door on `pin` shown on `indicator_channel`, default debounce flags.
    pub const fn new(pin: u8, indicator_channel: u8) -> Self {
        Self {
            pin,
            indicator_channel,
            settings: DebounceSettings::NORMAL,
        }
    }

    /// Set the debounce flags
    pub fn with_settings(mut self, settings: DebounceSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// The stock wiring: GPIO13, GPIO12 and GPIO14 on pixels 0, 1 and 2.
pub fn default_doors() -> DoorList {
    DoorList::from_slice(&[
        DoorConfig::new(13, 0),
        DoorConfig::new(12, 1),
        DoorConfig::new(14, 2),
    ])
    .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
