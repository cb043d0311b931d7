#![deny(unsafe_code)]

use esp_hal::{
    gpio::{AnyPin, Pin},
    peripherals::{Peripherals, DMA, I2C0, SPI2, TIMG0},
};

pub struct BeaconPins {
    pub gps_sda: AnyPin,
    pub gps_scl: AnyPin,

    pub lora_rst: AnyPin,

    pub lora_nss: AnyPin,
    pub lora_mosi: AnyPin,
    pub lora_miso: AnyPin,
    pub lora_clk: AnyPin,

    pub timg: TIMG0,
    pub i2c: I2C0,
    pub dma: DMA,
    pub spi: SPI2,
}

pub fn get_beacon_pins_v001(p: Peripherals) -> BeaconPins {
    BeaconPins {
        gps_sda: p.GPIO4.degrade(),
        gps_scl: p.GPIO5.degrade(),

        lora_rst: p.GPIO6.degrade(),

        lora_nss: p.GPIO8.degrade(),
        lora_clk: p.GPIO21.degrade(),
        lora_miso: p.GPIO20.degrade(),
        lora_mosi: p.GPIO10.degrade(),

        timg: p.TIMG0,
        i2c: p.I2C0,
        dma: p.DMA,
        spi: p.SPI2,
    }
}

// Breadboard build, GPS on the header next to the USB port
pub fn get_beacon_pins_bread(p: Peripherals) -> BeaconPins {
    BeaconPins {
        gps_sda: p.GPIO2.degrade(),
        gps_scl: p.GPIO3.degrade(),

        lora_rst: p.GPIO1.degrade(),

        lora_nss: p.GPIO9.degrade(),
        lora_clk: p.GPIO21.degrade(),
        lora_miso: p.GPIO20.degrade(),
        lora_mosi: p.GPIO10.degrade(),

        timg: p.TIMG0,
        i2c: p.I2C0,
        dma: p.DMA,
        spi: p.SPI2,
    }
}
