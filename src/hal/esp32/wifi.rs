//! WiFi station link for ESP32.
//!
//! Wraps the non-blocking `EspWifi` driver. Association is started with
//! [`NetworkLink::reconnect`] and never waited on; link transitions are
//! detected by sampling the driver in [`NetworkLink::poll_event`].
//!
//! # Example
//!
//! ```ignore
//! use garage_sentry::hal::esp32::Esp32Wifi;
//! use garage_sentry::config::WifiConfig;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("MyNetwork")
//!     .with_password("secret123");
//!
//! let wifi = Esp32Wifi::new(modem, sysloop, nvs, &config)?;
//! // Association runs in the background; the monitor sees LinkEvent::Up
//! ```

use crate::config::WifiConfig;
use crate::traits::{LinkEvent, NetworkLink};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sys::EspError;
use esp_idf_svc::wifi::{ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};
use std::net::Ipv4Addr;

/// WiFi station link.
pub struct Esp32Wifi<'a> {
    wifi: EspWifi<'a>,
    reported_up: bool,
    associating: bool,
}

impl<'a> Esp32Wifi<'a> {
    /// Initialise the driver in station mode and start the first
    /// association attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot be created, configured or
    /// started. A failed association is not an error; it is retried by the
    /// connectivity manager.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let mut wifi = EspWifi::new(modem, sysloop, nvs)?;

        // Create heapless strings for esp-idf
        let mut ssid_buf: heapless::String<32> = heapless::String::new();
        let _ = ssid_buf.push_str(config.ssid.as_str());

        let mut pass_buf: heapless::String<64> = heapless::String::new();
        let _ = pass_buf.push_str(config.password.as_str());

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: ssid_buf,
            password: pass_buf,
            ..Default::default()
        }))?;

        info!("wifi: starting");
        wifi.start()?;

        info!("wifi: connecting to '{}'", config.ssid);
        let associating = match wifi.connect() {
            Ok(()) => true,
            Err(e) => {
                warn!("wifi: initial connect failed: {:?}", e);
                false
            }
        };

        Ok(Self {
            wifi,
            reported_up: false,
            associating,
        })
    }

    /// Get the current IP address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi.sta_netif().get_ip_info().ok().map(|info| info.ip)
    }

    /// Get the underlying WiFi driver for advanced operations.
    pub fn driver(&self) -> &EspWifi<'a> {
        &self.wifi
    }
}

impl NetworkLink for Esp32Wifi<'_> {
    type Error = EspError;

    fn reconnect(&mut self) -> Result<(), EspError> {
        // Drop a half-open association before trying again
        self.associating = false;
        let _ = self.wifi.disconnect();
        self.wifi.connect()
    }

    fn is_up(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
            && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    fn is_associating(&self) -> bool {
        self.associating
    }

    fn poll_event(&mut self) -> Option<LinkEvent> {
        let up = self.is_up();
        if up == self.reported_up {
            return None;
        }
        self.reported_up = up;
        self.associating = false;
        if up {
            if let Some(ip) = self.ip_addr() {
                info!("wifi: connected, IP {}", ip);
            }
            Some(LinkEvent::Up)
        } else {
            Some(LinkEvent::Down)
        }
    }
}
