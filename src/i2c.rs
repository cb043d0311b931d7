use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use esp_hal::{
    gpio::AnyPin,
    i2c::master::{Config, I2c},
    peripherals::I2C0,
    Async,
};
use fugit::RateExtU32;
use static_cell::StaticCell;

pub type I2cBus = Mutex<NoopRawMutex, I2c<'static, Async>>;

/// The GPS receiver's handle on the shared bus
pub type GpsDevice = I2cDevice<'static, NoopRawMutex, I2c<'static, Async>>;

static I2C_BUS: StaticCell<I2cBus> = StaticCell::new();

pub fn init(i2c: I2C0, sda: AnyPin, scl: AnyPin) -> &'static mut I2cBus {
    // The receiver's DDC port tops out at 400kHz fast mode
    let config = Config {
        frequency: 400.kHz(),
        ..Config::default()
    };

    let i2c = I2c::new(i2c, config)
        .with_sda(sda)
        .with_scl(scl)
        .into_async();

    I2C_BUS.init(Mutex::new(i2c))
}
