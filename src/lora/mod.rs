//! SX127x LoRa transmitter driven straight through its register map.
//!
//! ```text
//!  reset ──► FSK sleep ──► LoRa sleep ──► LoRa standby ◄──┐
//!   (boot mode unknown)   (configure here)     │           │
//!                                              ▼           │
//!                                       LoRa transmit ─────┘
//! ```
//!
//! Frequency, FIFO and PA registers are only written while asleep. After a
//! transmit the chip must drop back to standby by itself; if it doesn't the
//! whole init sequence is run again.
//!
//! Nothing about the chip's registers is cached here. Every decision comes
//! from a fresh register read.

pub mod registers;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::config::{LoraConfig, PAYLOAD_SIZE};
use registers::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioMode {
    LegacySleep,
    LoraSleep,
    LoraStandby,
    LoraTransmit,
    /// Any other RegOpMode value, e.g. an FSK mode straight after reset
    Other(u8),
}

impl RadioMode {
    pub fn from_register(value: u8) -> Self {
        match value {
            FSK_SLEEP => Self::LegacySleep,
            LORA_SLEEP => Self::LoraSleep,
            LORA_STANDBY => Self::LoraStandby,
            LORA_TX => Self::LoraTransmit,
            other => Self::Other(other),
        }
    }

    pub fn register(self) -> u8 {
        match self {
            Self::LegacySleep => FSK_SLEEP,
            Self::LoraSleep => LORA_SLEEP,
            Self::LoraStandby => LORA_STANDBY,
            Self::LoraTransmit => LORA_TX,
            Self::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoraError<E> {
    /// The SPI transaction did not complete
    Bus(E),
    /// The reset line could not be driven
    Reset,
    /// The chip did not settle in the mode it was told to
    ModeMismatch { expected: RadioMode, found: RadioMode },
    /// TX_DONE never showed up within the poll limit
    TxTimeout { polls: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxStatus {
    Sent,
    /// The chip didn't return to standby and was re-initialised. The packet
    /// may not have gone out.
    Recovered,
}

/// Values for the power amplifier registers at a requested output power.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaSettings {
    /// Level field of RegPaConfig (already offset and adjusted)
    pub level: u8,
    pub dac: u8,
    pub ocp_trim: u8,
}

impl PaSettings {
    /// PA_BOOST output covers 2 to 20 dBm. Past 17 dBm the high power DAC
    /// adds 3 dB on top of the configured level.
    pub fn for_power(power_dbm: u8) -> Self {
        let mut level = power_dbm.clamp(2, 20);

        let (dac, milliamps) = if level > 17 {
            level -= 3;
            (PA_DAC_HIGH_POWER, 140u16)
        } else {
            (PA_DAC_DEFAULT, 100u16)
        };

        let ocp_trim = (if milliamps <= 120 {
            (milliamps - 45) / 5
        } else if milliamps <= 240 {
            (milliamps + 30) / 10
        } else {
            27
        }) as u8;

        Self {
            level: level - 2,
            dac,
            ocp_trim,
        }
    }

    pub fn pa_config(&self) -> u8 {
        PA_BOOST | (self.level & 0x0F)
    }
}

pub struct LoraController<R, RST, D> {
    registers: R,
    reset: RST,
    delay: D,
    config: LoraConfig,
}

impl<R, RST, D> LoraController<R, RST, D>
where
    R: Registers,
    RST: OutputPin,
    D: DelayNs,
{
    pub fn new(registers: R, reset: RST, delay: D, config: LoraConfig) -> Self {
        Self {
            registers,
            reset,
            delay,
            config,
        }
    }

    pub fn release(self) -> (R, RST, D) {
        (self.registers, self.reset, self.delay)
    }

    async fn read(&mut self, address: u8) -> Result<u8, LoraError<R::Error>> {
        self.registers
            .read_register(address)
            .await
            .map_err(LoraError::Bus)
    }

    async fn write(&mut self, address: u8, value: u8) -> Result<(), LoraError<R::Error>> {
        self.registers
            .write_register(address, value)
            .await
            .map(|_| ())
            .map_err(LoraError::Bus)
    }

    async fn pulse_reset(&mut self) -> Result<(), LoraError<R::Error>> {
        // NRESET low for at least 100us, then 5ms before the chip answers
        self.reset.set_low().map_err(|_| LoraError::Reset)?;
        self.delay.delay_us(100).await;
        self.reset.set_high().map_err(|_| LoraError::Reset)?;
        self.delay.delay_ms(5).await;
        Ok(())
    }

    pub async fn mode(&mut self) -> Result<RadioMode, LoraError<R::Error>> {
        Ok(RadioMode::from_register(self.read(REG_OP_MODE).await?))
    }

    /// Resets the chip, programs it while asleep and leaves it in standby.
    ///
    /// Fails with [`LoraError::ModeMismatch`] if standby can't be confirmed.
    /// There is no retry here.
    pub async fn init(&mut self) -> Result<(), LoraError<R::Error>> {
        self.pulse_reset().await?;

        let boot_mode = self.read(REG_OP_MODE).await?;
        info!("LoRa boot mode {:#x}", boot_mode);

        // The LoRa bit can only be changed from sleep
        if boot_mode & LONG_RANGE_MODE == 0 {
            self.write(REG_OP_MODE, FSK_SLEEP).await?;
        }
        self.write(REG_OP_MODE, LORA_SLEEP).await?;
        debug!("LoRa asleep, configuring");

        let channel = self.config.channel_word();
        self.write(REG_FRF_MSB, (channel >> 16) as u8).await?;
        self.write(REG_FRF_MID, (channel >> 8) as u8).await?;
        self.write(REG_FRF_LSB, channel as u8).await?;

        // One message at a time, so TX and RX both get the whole FIFO
        self.write(REG_FIFO_TX_BASE_ADDR, 0).await?;
        self.write(REG_FIFO_RX_BASE_ADDR, 0).await?;

        self.write(REG_PAYLOAD_LENGTH, PAYLOAD_SIZE as u8).await?;
        self.write(REG_MAX_PAYLOAD_LENGTH, PAYLOAD_SIZE as u8).await?;

        let tuning = self.config.tuning;
        if tuning.lna_boost {
            let lna = self.read(REG_LNA).await?;
            self.write(REG_LNA, lna | LNA_BOOST_HF).await?;
        }
        if tuning.auto_agc {
            self.write(REG_MODEM_CONFIG_3, AGC_AUTO_ON).await?;
        }

        self.write(REG_SYNC_WORD, self.config.sync_word).await?;

        let pa = PaSettings::for_power(self.config.power_dbm);
        if tuning.pa_dac {
            self.write(REG_PA_DAC, pa.dac).await?;
        }
        if tuning.over_current {
            self.write(REG_OCP, OCP_ON | (pa.ocp_trim & 0x1F)).await?;
        }
        self.write(REG_PA_CONFIG, pa.pa_config()).await?;

        self.write(REG_OP_MODE, LORA_STANDBY).await?;

        let mode = self.read(REG_OP_MODE).await?;
        if mode != LORA_STANDBY {
            warn!("LoRa init failed, mode is {:#x}", mode);
            return Err(LoraError::ModeMismatch {
                expected: RadioMode::LoraStandby,
                found: RadioMode::from_register(mode),
            });
        }

        info!(
            "LoRa on standby at {} Hz, {} dBm",
            self.config.frequency_hz,
            self.config.power_dbm
        );
        Ok(())
    }

    /// Sends one packet and waits for the chip to report it done.
    ///
    /// With the default poll policy this waits forever on a chip that never
    /// raises TX_DONE.
    pub async fn transmit(
        &mut self,
        payload: &[u8; PAYLOAD_SIZE],
    ) -> Result<TxStatus, LoraError<R::Error>> {
        self.write(REG_FIFO_ADDR_PTR, 0).await?;
        for &byte in payload.iter() {
            self.write(REG_FIFO, byte).await?;
        }

        // Edge triggered: the chip falls back to standby once the packet is out
        self.write(REG_OP_MODE, LORA_TX).await?;

        // The flags are always read at least once, so `Some(0)` acts as `Some(1)`
        let poll = self.config.poll;
        let max_polls = poll.max_polls.map(|max| max.max(1));
        let mut polls = 0u32;
        loop {
            let flags = self.read(REG_IRQ_FLAGS).await?;
            if flags & IRQ_TX_DONE != 0 {
                break;
            }

            polls += 1;
            if max_polls.is_some_and(|max| polls >= max) {
                error!("LoRa TX_DONE not seen after {} polls", polls);
                return Err(LoraError::TxTimeout { polls });
            }
            self.delay.delay_us(poll.interval_us).await;
        }

        let mode = self.read(REG_OP_MODE).await?;
        if mode == LORA_STANDBY {
            self.write(REG_IRQ_FLAGS, IRQ_ALL).await?;
            trace!("LoRa TX done");
            return Ok(TxStatus::Sent);
        }

        warn!("LoRa stuck in mode {:#x} after TX, re-initialising", mode);

        // Don't let a stale TX_DONE satisfy the next transmit
        self.write(REG_IRQ_FLAGS, IRQ_ALL).await?;
        self.init().await?;

        Ok(TxStatus::Recovered)
    }

    /// Runs [`Self::init`] until it succeeds, waiting `retry_ms` between
    /// attempts. Returns the number of failed attempts.
    pub async fn init_with_retry(&mut self, retry_ms: u32) -> u32 {
        let mut failures = 0;
        while let Err(err) = self.init().await {
            failures += 1;
            log_failure("LoRa init", &err);
            self.delay.delay_ms(retry_ms).await;
        }
        failures
    }

    /// Puts the chip to sleep.
    pub async fn close(&mut self) -> Result<(), LoraError<R::Error>> {
        self.write(REG_OP_MODE, LORA_SLEEP).await
    }
}

fn log_failure<E>(what: &str, err: &LoraError<E>) {
    match err {
        LoraError::Bus(_) => error!("{} failed: bus error", what),
        LoraError::Reset => error!("{} failed: reset line", what),
        LoraError::ModeMismatch { expected, found } => {
            error!("{} failed: expected {:?}, found {:?}", what, expected, found)
        }
        LoraError::TxTimeout { polls } => {
            error!("{} failed: no TX_DONE after {} polls", what, polls)
        }
    }
}

/// Sends the latest GPS sentence over and over, re-initialising the radio
/// whenever a transmit fails.
#[cfg(feature = "embedded")]
#[embassy_executor::task]
pub async fn transmit(spi: crate::spi::RadioDevice, lora_rst: esp_hal::gpio::Output<'static>) -> ! {
    use embassy_time::{Delay, Timer};

    use crate::{payload, state::STATE};

    const RETRY_MS: u32 = 1_000;

    let mut lora = LoraController::new(
        SpiRegisters::new(spi),
        lora_rst,
        Delay,
        LoraConfig::default(),
    );

    lora.init_with_retry(RETRY_MS).await;

    loop {
        let packet = payload::pack(&STATE.lock().await.sentence);

        match lora.transmit(&packet).await {
            Ok(TxStatus::Sent) => {
                info!("TX DONE");
                STATE.lock().await.sent += 1;
            }
            Ok(TxStatus::Recovered) => {
                warn!("TX not confirmed, radio was re-initialised");
                STATE.lock().await.faults += 1;
            }
            Err(err) => {
                log_failure("TX", &err);
                // Never transmit again on a radio that isn't back in standby
                let failures = lora.init_with_retry(RETRY_MS).await;
                STATE.lock().await.faults += 1 + failures;
            }
        }

        Timer::after_millis(crate::config::lora_defaults::TX_INTERVAL_MS).await;
    }
}
