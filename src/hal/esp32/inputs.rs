//! Reed switch inputs via esp-idf-hal pin drivers.

use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use esp_idf_hal::sys::EspError;
use heapless::Vec;
use log::debug;

use crate::traits::{InputBank, PullMode};

/// Number of input pins the bank can drive.
pub const MAX_INPUTS: usize = 8;

/// Why a pin could not be configured.
#[derive(Debug)]
pub enum InputError {
    /// The pin is already claimed or the bank is full.
    Unavailable(u8),
    /// The GPIO driver rejected the pin.
    Driver(EspError),
}

impl From<EspError> for InputError {
    fn from(e: EspError) -> Self {
        Self::Driver(e)
    }
}

/// GPIO input bank addressed by raw GPIO number.
///
/// Pins are claimed lazily when the debouncer registers a channel. Reading
/// a pin that was never configured returns low.
#[derive(Default)]
pub struct Esp32Inputs {
    pins: Vec<(u8, PinDriver<'static, AnyIOPin, Input>), MAX_INPUTS>,
}

impl Esp32Inputs {
    /// Creates an empty input bank.
    pub fn new() -> Self {
        Self::default()
    }
}

impl InputBank for Esp32Inputs {
    type Error = InputError;

    fn configure(&mut self, pin: u8, mode: PullMode) -> Result<(), InputError> {
        if self.pins.is_full() || self.pins.iter().any(|(p, _)| *p == pin) {
            return Err(InputError::Unavailable(pin));
        }

        // SAFETY: each GPIO number is claimed at most once by this bank,
        // and the pin map in `hal::esp32::pins` reserves these for doors.
        let io = unsafe { AnyIOPin::new(i32::from(pin)) };
        let mut driver = PinDriver::input(io)?;
        driver.set_pull(match mode {
            PullMode::Floating => Pull::Floating,
            PullMode::PullUp => Pull::Up,
            PullMode::PullDown => Pull::Down,
        })?;

        debug!("gpio {}: input, {}", pin, mode.as_str());
        self.pins
            .push((pin, driver))
            .map_err(|_| InputError::Unavailable(pin))
    }

    fn read(&mut self, pin: u8) -> bool {
        self.pins
            .iter()
            .find(|(p, _)| *p == pin)
            .is_some_and(|(_, driver)| driver.is_high())
    }
}
