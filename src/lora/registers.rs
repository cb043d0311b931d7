//! SX1276/77/78 register map and single-register access over SPI.

use core::future::Future;

use embedded_hal_async::spi::SpiDevice;

pub const REG_FIFO: u8 = 0x00;
pub const REG_OP_MODE: u8 = 0x01;
pub const REG_FRF_MSB: u8 = 0x06;
pub const REG_FRF_MID: u8 = 0x07;
pub const REG_FRF_LSB: u8 = 0x08;
pub const REG_PA_CONFIG: u8 = 0x09;
pub const REG_OCP: u8 = 0x0B;
pub const REG_LNA: u8 = 0x0C;
pub const REG_FIFO_ADDR_PTR: u8 = 0x0D;
pub const REG_FIFO_TX_BASE_ADDR: u8 = 0x0E;
pub const REG_FIFO_RX_BASE_ADDR: u8 = 0x0F;
pub const REG_IRQ_FLAGS: u8 = 0x12;
pub const REG_PAYLOAD_LENGTH: u8 = 0x22;
pub const REG_MAX_PAYLOAD_LENGTH: u8 = 0x23;
pub const REG_MODEM_CONFIG_3: u8 = 0x26;
pub const REG_SYNC_WORD: u8 = 0x39;
pub const REG_PA_DAC: u8 = 0x4D;

// RegOpMode: bit 7 selects LoRa, bits 2..0 the transceiver mode. Bit 7 can
// only be flipped while the chip is asleep.
pub const LONG_RANGE_MODE: u8 = 0x80;
pub const MODE_MASK: u8 = 0x07;
pub const MODE_SLEEP: u8 = 0x00;
pub const MODE_STANDBY: u8 = 0x01;
pub const MODE_TX: u8 = 0x03;

pub const FSK_SLEEP: u8 = MODE_SLEEP;
pub const LORA_SLEEP: u8 = LONG_RANGE_MODE | MODE_SLEEP;
pub const LORA_STANDBY: u8 = LONG_RANGE_MODE | MODE_STANDBY;
pub const LORA_TX: u8 = LONG_RANGE_MODE | MODE_TX;

pub const IRQ_TX_DONE: u8 = 0x08;
pub const IRQ_ALL: u8 = 0xFF;

pub const PA_BOOST: u8 = 0x80;
pub const LNA_BOOST_HF: u8 = 0x03;
pub const AGC_AUTO_ON: u8 = 0x04;
pub const PA_DAC_DEFAULT: u8 = 0x84;
pub const PA_DAC_HIGH_POWER: u8 = 0x87;
pub const OCP_ON: u8 = 0x20;

/// Top bit of the address byte marks a write
const WRITE_FLAG: u8 = 0x80;

/// Single register access to the radio.
///
/// The controller only ever talks to the chip through this, so it can be run
/// against an in-memory register file.
pub trait Registers {
    type Error;

    fn read_register(&mut self, address: u8) -> impl Future<Output = Result<u8, Self::Error>>;

    /// Returns whatever the chip clocked out during the data byte.
    fn write_register(
        &mut self,
        address: u8,
        value: u8,
    ) -> impl Future<Output = Result<u8, Self::Error>>;
}

/// Registers reached through two byte SPI transfers: address, then data.
pub struct SpiRegisters<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> SpiRegisters<SPI> {
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    pub fn release(self) -> SPI {
        self.spi
    }
}

impl<SPI: SpiDevice> Registers for SpiRegisters<SPI> {
    type Error = SPI::Error;

    async fn read_register(&mut self, address: u8) -> Result<u8, Self::Error> {
        let mut rx = [0u8; 2];
        self.spi.transfer(&mut rx, &[address & !WRITE_FLAG, 0]).await?;
        Ok(rx[1])
    }

    async fn write_register(&mut self, address: u8, value: u8) -> Result<u8, Self::Error> {
        let mut rx = [0u8; 2];
        self.spi.transfer(&mut rx, &[address | WRITE_FLAG, value]).await?;
        Ok(rx[1])
    }
}


#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use embedded_hal_async::spi::{self, ErrorType, Operation, SpiDevice};
    use futures::executor::block_on;

    use super::*;

    /// Records every transfer and answers the data byte with `reply`.
    struct RecordingSpi {
        sent: Vec<[u8; 2]>,
        reply: u8,
    }

    impl ErrorType for RecordingSpi {
        type Error = spi::ErrorKind;
    }

    impl SpiDevice for RecordingSpi {
        async fn transaction(
            &mut self,
            operations: &mut [Operation<'_, u8>],
        ) -> Result<(), Self::Error> {
            for operation in operations {
                match operation {
                    Operation::Transfer(read, write) => {
                        self.sent.push([write[0], write[1]]);
                        read[0] = 0;
                        read[1] = self.reply;
                    }
                    _ => return Err(spi::ErrorKind::Other),
                }
            }
            Ok(())
        }
    }

    #[test]
    fn read_sends_address_then_placeholder() {
        let mut registers = SpiRegisters::new(RecordingSpi {
            sent: Vec::new(),
            reply: 0x81,
        });

        let value = block_on(registers.read_register(REG_OP_MODE)).unwrap();

        assert_eq!(value, 0x81);
        assert_eq!(registers.release().sent, [[REG_OP_MODE, 0]]);
    }

    #[test]
    fn write_sets_address_top_bit() {
        let mut registers = SpiRegisters::new(RecordingSpi {
            sent: Vec::new(),
            reply: 0x00,
        });

        block_on(registers.write_register(REG_SYNC_WORD, 0x12)).unwrap();

        assert_eq!(registers.release().sent, [[0x80 | REG_SYNC_WORD, 0x12]]);
    }

    #[test]
    fn fake_keeps_lora_bit_outside_sleep() {
        let mut fake = mock::FakeSx127x::new(MODE_STANDBY);

        block_on(fake.write_register(REG_OP_MODE, LORA_SLEEP)).unwrap();
        assert_eq!(fake.reg(REG_OP_MODE), FSK_SLEEP);

        block_on(fake.write_register(REG_OP_MODE, LORA_SLEEP)).unwrap();
        assert_eq!(fake.reg(REG_OP_MODE), LORA_SLEEP);
    }
}
