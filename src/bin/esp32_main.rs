//! ESP32 garage door monitor.
//!
//! This is the main entry point for the physical hardware. It runs a
//! cooperative loop that:
//! - Debounces the three door reed switches
//! - Publishes open/close events and open-too-long alerts over MQTT
//! - Sends an `ACTIVE` heartbeat every minute
//! - Blinks the status LED
//! - Keeps WiFi and MQTT reconnecting in the background
//!
//! # Build
//!
//! ```bash
//! WIFI_SSID=... WIFI_PASSWORD=... MQTT_HOST=192.168.1.10 \
//!     cargo build --release --features esp32-mqtt --bin esp32_main
//! ```

use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use garage_sentry::hal::esp32::{pins, Esp32Clock, Esp32Inputs, Esp32Mqtt, Esp32StatusLed, Esp32Wifi};
use garage_sentry::traits::{Clock, MqttClient, NetworkLink, NoIndicator, Offline};
use garage_sentry::{Config, DeviceConfig, GarageMonitor, MqttConfig, WifiConfig};
use log::{info, warn};

/// Main loop interval in milliseconds
const LOOP_INTERVAL_MS: u32 = 10;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("================================");
    info!("  garage-sentry");
    info!("================================");

    // =========================================================================
    // Configuration
    // =========================================================================
    let mut mqtt = MqttConfig::default().with_host(option_env!("MQTT_HOST").unwrap_or("localhost"));
    if let (Some(user), Some(pass)) = (option_env!("MQTT_USER"), option_env!("MQTT_PASSWORD")) {
        mqtt = mqtt.with_auth(user, pass);
    }
    let config = Config::default()
        .with_wifi(
            WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_mqtt(mqtt)
        .with_device(DeviceConfig::default().with_name(option_env!("DEVICE_NAME").unwrap_or("GARAGE")));


    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // =========================================================================
    // Hardware
    // =========================================================================
    let status = Esp32StatusLed::new(pins::STATUS_LED)?;
    info!(
        "[OK] Doors on GPIO{}/{}/{}, status LED on GPIO{}",
        pins::DOOR_1,
        pins::DOOR_2,
        pins::DOOR_3,
        pins::STATUS_LED
    );

    // =========================================================================
    // Network
    // =========================================================================
    if !config.is_online() {
        if !config.wifi.is_configured() {
            warn!("WiFi not configured (set WIFI_SSID); running offline");
        } else {
            warn!("WiFi or MQTT disabled; running offline");
        }
        return run(&config, Offline, Offline, status);
    }

    let wifi = Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?;
    let session = Esp32Mqtt::new(&config.mqtt);
    run(&config, session, wifi, status)
}

fn run<M: MqttClient, L: NetworkLink>(
    config: &Config,
    session: M,
    link: L,
    status: Esp32StatusLed,
) -> anyhow::Result<()> {
    let clock = Esp32Clock::new();
    let mut monitor = GarageMonitor::new(config, Esp32Inputs::new(), session, link, NoIndicator, status)
        .map_err(|e| anyhow::anyhow!("monitor setup failed: {}", e))?;
    monitor
        .start(clock.now_ms())
        .map_err(|e| anyhow::anyhow!("monitor start failed: {}", e))?;
    info!("[OK] Monitoring {} doors", monitor.doors().len());

    loop {
        monitor.poll(clock.now_ms());
        FreeRtos::delay_ms(LOOP_INTERVAL_MS);
    }
}
