//! Status LED output.

use esp_idf_hal::sys::{
    gpio_config, gpio_config_t, gpio_int_type_t_GPIO_INTR_DISABLE, gpio_mode_t_GPIO_MODE_OUTPUT,
    gpio_pulldown_t_GPIO_PULLDOWN_DISABLE, gpio_pullup_t_GPIO_PULLUP_DISABLE, gpio_set_level,
    ESP_OK,
};

use crate::traits::StatusOutput;

/// Status LED on a plain GPIO.
#[derive(Debug)]
pub struct Esp32StatusLed {
    pin: u8,
}

impl Esp32StatusLed {
    /// Configure `pin` as an output, initially low.
    ///
    /// # Errors
    ///
    /// Returns an error if the GPIO driver rejects the configuration.
    pub fn new(pin: u8) -> anyhow::Result<Self> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: gpio_config only reads the descriptor we pass in.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            anyhow::bail!("gpio {}: output config failed ({})", pin, ret);
        }
        let mut led = Self { pin };
        led.set_level(false);
        Ok(led)
    }
}

impl StatusOutput for Esp32StatusLed {
    fn set_level(&mut self, high: bool) {
        // SAFETY: writes to the output pin configured in `new`.
        unsafe {
            gpio_set_level(self.pin as i32, u32::from(high));
        }
    }
}
