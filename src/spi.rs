use embassy_embedded_hal::shared_bus::asynch::spi::SpiDevice;
use embassy_sync::{blocking_mutex::raw::NoopRawMutex, mutex::Mutex};
use fugit::RateExtU32;
use static_cell::StaticCell;

use esp_hal::{
    dma::{Dma, DmaPriority, DmaRxBuf, DmaTxBuf},
    dma_buffers,
    gpio::{AnyPin, Output},
    peripherals::{DMA, SPI2},
    spi::{
        master::{Config, Spi, SpiDmaBus},
        SpiMode,
    },
    Async,
};

pub type SpiBus = Mutex<NoopRawMutex, SpiDmaBus<'static, Async>>;

/// The radio's handle on the shared bus, chip select included
pub type RadioDevice = SpiDevice<'static, NoopRawMutex, SpiDmaBus<'static, Async>, Output<'static>>;

static SPI_BUS: StaticCell<SpiBus> = StaticCell::new();

pub fn init(
    dma: DMA,
    spi: SPI2,
    sck: AnyPin,
    mosi: AnyPin,
    miso: AnyPin,
) -> Option<&'static mut SpiBus> {
    let dma = Dma::new(dma);
    let dma_channel = dma.channel0;

    // Register transfers are two bytes each, nothing needs a big buffer
    let (rx_buffer, rx_descriptors, tx_buffer, tx_descriptors) = dma_buffers!(256);
    let dma_rx_buf = DmaRxBuf::new(rx_descriptors, rx_buffer).ok()?;
    let dma_tx_buf = DmaTxBuf::new(tx_descriptors, tx_buffer).ok()?;

    // The SX1278 tops out at 10MHz, 1MHz leaves plenty of margin on the wiring
    let spi_config = Config {
        frequency: 1.MHz(),
        mode: SpiMode::Mode0,
        ..Config::default()
    };

    let spi = Spi::new_with_config(spi, spi_config)
        .with_sck(sck)
        .with_mosi(mosi)
        .with_miso(miso)
        .with_dma(dma_channel.configure(false, DmaPriority::Priority0))
        .with_buffers(dma_rx_buf, dma_tx_buf)
        .into_async();

    Some(SPI_BUS.init(Mutex::new(spi)))
}
