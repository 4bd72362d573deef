//! Visual indicator abstraction for per-door status pixels.
//!
//! The original hardware uses one WS2812B pixel per door: red while the
//! door is open, green while closed. The core only ever calls
//! [`Indicator::set_color`] and [`Indicator::show`].

/// An RGB colour value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rgb {
    /// Red component.
    pub r: u8,
    /// Green component.
    pub g: u8,
    /// Blue component.
    pub b: u8,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);
    /// Colour shown while a door is open.
    pub const OPEN: Rgb = Rgb::new(150, 0, 0);
    /// Colour shown while a door is closed.
    pub const CLOSED: Rgb = Rgb::new(0, 150, 0);

    /// Creates a colour from its components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Indicator trait for door status pixels.
///
/// # Example
///
/// ```ignore
/// use garage_sentry::traits::{Indicator, Rgb};
///
/// struct Strip { /* ... */ }
///
/// impl Indicator for Strip {
///     fn set_color(&mut self, channel: u8, color: Rgb) { /* buffer */ }
///     fn show(&mut self) { /* latch the buffer out */ }
/// }
/// ```
pub trait Indicator {
    /// Set the colour of one pixel. Takes effect on the next [`show`](Self::show).
    fn set_color(&mut self, channel: u8, color: Rgb);

    /// Push buffered colours out to the hardware.
    fn show(&mut self);
}

/// Indicator that discards everything, for builds without pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl Indicator for NoIndicator {
    fn set_color(&mut self, _channel: u8, _color: Rgb) {}

    fn show(&mut self) {}
}
