#![deny(unsafe_code)]
#![no_main]
#![no_std]

// Bench tool: no radio, just print every sentence the GPS hands us

use defmt::info;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_executor::Spawner;
use embassy_time::Timer;
use esp_backtrace as _;
use esp_hal::timer::timg::TimerGroup;
use esp_println as _;

use gps_lora_beacon::{gps, i2c, pins, state};

#[embassy_executor::task]
async fn print_sentences() -> ! {
    let mut last_accepted = 0;

    loop {
        {
            let state = state::STATE.lock().await;
            if state.accepted != last_accepted {
                last_accepted = state.accepted;
                info!("{=[u8]:a}", &state.sentence[..]);
            }
        }
        Timer::after_millis(200).await;
    }
}

#[esp_hal_embassy::main]
async fn main(spawner: Spawner) {
    info!("Initializing");

    let peripherals = esp_hal::init(esp_hal::Config::default());

    let pins = pins::get_beacon_pins_bread(peripherals);

    let timg0 = TimerGroup::new(pins.timg);

    esp_hal_embassy::init(timg0.timer0);

    info!("Initializing complete");

    let i2c_bus = i2c::init(pins.i2c, pins.gps_sda, pins.gps_scl);
    let gps_i2c = I2cDevice::new(i2c_bus);

    spawner.spawn(gps::sample(gps_i2c)).unwrap();
    spawner.spawn(print_sentences()).ok();
}
