#![deny(unsafe_code)]
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod config;
pub mod gps;
pub mod lora;
pub mod nmea;
pub mod payload;

// Board support, only available when building for the ESP32-C3
#[cfg(feature = "embedded")]
pub mod i2c;
#[cfg(feature = "embedded")]
pub mod pins;
#[cfg(feature = "embedded")]
pub mod spi;
#[cfg(feature = "embedded")]
pub mod state;
