#![deny(unsafe_code)]
#![no_main]
#![no_std]

use defmt::info;
use embassy_embedded_hal::shared_bus::asynch::{i2c::I2cDevice, spi::SpiDevice};
use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_backtrace as _;
use esp_hal::{
    gpio::{Level, Output},
    timer::timg::TimerGroup,
};
use esp_println as _;

use gps_lora_beacon::{gps, i2c, lora, pins, spi, state};

#[embassy_executor::task]
async fn print_state() -> ! {
    loop {
        info!("{:?}", *state::STATE.lock().await);
        Timer::after_millis(5_000).await;
    }
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    info!("Initializing");

    let peripherals = esp_hal::init(esp_hal::Config::default());

    let pins = pins::get_beacon_pins_v001(peripherals);

    let timg0 = TimerGroup::new(pins.timg);

    esp_hal_embassy::init(timg0.timer0);

    info!("Initializing complete");

    // Setup I2C bus, the GPS is the only device on it
    let i2c_bus = i2c::init(pins.i2c, pins.gps_sda, pins.gps_scl);
    let gps_i2c = I2cDevice::new(i2c_bus);

    spawner.spawn(gps::sample(gps_i2c)).unwrap();

    // Setup SPI bus
    let spi_bus = spi::init(
        pins.dma,
        pins.spi,
        pins.lora_clk,
        pins.lora_mosi,
        pins.lora_miso,
    )
    .unwrap();

    let lora_spi_csb = Output::new(pins.lora_nss, Level::High);
    let lora_spi = SpiDevice::new(spi_bus, lora_spi_csb);

    let lora_rst = Output::new(pins.lora_rst, Level::High);

    spawner.spawn(lora::transmit(lora_spi, lora_rst)).unwrap();

    // Finally set up the task to print state
    spawner.spawn(print_state()).ok();
}
