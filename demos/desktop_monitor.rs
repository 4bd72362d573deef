//! Desktop monitor example for testing against a real MQTT broker.
//!
//! This example runs the full monitor with simulated reed switches,
//! allowing you to:
//! - Watch `SENSOR/GARAGE/...` and `ALERT/GARAGE/...` on your broker
//! - See the reconnect backoff by stopping and restarting the broker
//! - Exercise the open-too-long alert with a short alert interval
//!
//! Door 1 opens 5 seconds after start, stays open long enough for two
//! alerts, then closes.
//!
//! # Usage
//!
//! ```sh
//! MQTT_HOST=localhost cargo run --example desktop_monitor --features mqtt
//! mosquitto_sub -h localhost -t 'SENSOR/#' -t 'ALERT/#' -v
//! ```

use std::time::{Duration, Instant};

use garage_sentry::hal::{MockIndicator, MockInputs, MockOutput};
use garage_sentry::services::{HostLink, MqttRuntimeConfig, RumqttSession};
use garage_sentry::{Config, GarageMonitor, MqttConfig, TimingConfig};
use log::info;

/// Reed switch pin of door 1 in the default wiring
const DOOR_1: u8 = 13;

/// Loop interval in milliseconds
const LOOP_INTERVAL_MS: u64 = 10;

/// Alert interval for the demo (one minute instead of five)
const DEMO_MAX_OPEN_MS: u32 = 60_000;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().init();

    let host = std::env::var("MQTT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let config = Config::default()
        .with_mqtt(MqttConfig::default().with_host(&host))
        .with_timing(TimingConfig::default().with_max_open_ms(DEMO_MAX_OPEN_MS));

    let session = RumqttSession::new(
        MqttRuntimeConfig::from_config(&config.mqtt),
        tokio::runtime::Handle::current(),
    );

    let mut monitor = match GarageMonitor::new(
        &config,
        MockInputs::new(),
        session,
        HostLink,
        MockIndicator::new(),
        MockOutput::new(),
    ) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("monitor setup failed: {}", e);
            return;
        }
    };

    let epoch = Instant::now();
    let now_ms = || epoch.elapsed().as_millis() as u32;

    if let Err(e) = monitor.start(now_ms()) {
        eprintln!("monitor start failed: {}", e);
        return;
    }
    info!("monitoring {} doors, broker {}", monitor.doors().len(), host);

    let open_at = 5_000;
    let close_at = open_at + 2 * DEMO_MAX_OPEN_MS + 10_000;

    let mut interval = tokio::time::interval(Duration::from_millis(LOOP_INTERVAL_MS));
    loop {
        interval.tick().await;
        let now = now_ms();

        // Simulated door: reed switch opens high
        let open = (open_at..close_at).contains(&now);
        if monitor.inputs_mut().level(DOOR_1) != open {
            info!("simulated door 1 {}", if open { "opening" } else { "closing" });
            monitor.inputs_mut().set(DOOR_1, open);
        }

        monitor.poll(now);
    }
}
