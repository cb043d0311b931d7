//! Compile-time defaults for the GPS receiver and the LoRa radio.

/// Size of every radio packet. The FIFO payload length registers and the
/// application payload buffers are both sized from this.
pub const PAYLOAD_SIZE: usize = 64;

pub mod gps {
    /// I2C (DDC) address of the u-blox receiver
    pub const ADDRESS: u8 = 0x42;

    /// First of the two registers holding the 16-bit count of bytes
    /// waiting to be read, high byte first. A read without a register
    /// address streams from the data register.
    pub const REG_BYTES_HIGH: u8 = 0xFD;

    /// Value the data register returns when the receiver has nothing queued
    pub const NO_DATA: u8 = 0xFF;

    /// NMEA sentences are at most 82 bytes including CR/LF, plus a terminator
    pub const SENTENCE_CAPACITY: usize = 83;
}

pub mod lora_defaults {
    /// Same band the tracker has always used
    pub const FREQUENCY_HZ: u32 = 433_000_000;

    /// SX127x reference oscillator
    pub const CRYSTAL_HZ: u64 = 32_000_000;

    /// Private network sync word
    pub const SYNC_WORD: u8 = 0x12;

    /// Output power in dBm on the PA_BOOST pin
    pub const POWER_DBM: u8 = 17;

    /// Delay between transmit-done polls
    pub const POLL_INTERVAL_US: u32 = 100;

    /// Pause between packets
    pub const TX_INTERVAL_MS: u64 = 1_000;
}

/// Optional power amplifier tuning steps. Each is applied independently
/// during initialisation; all are off unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Tuning {
    /// Set the LNA boost bits on top of whatever the LNA register holds
    pub lna_boost: bool,
    /// Let the AGC loop pick the LNA gain
    pub auto_agc: bool,
    /// Enable the +20 dBm DAC setting above 17 dBm
    pub pa_dac: bool,
    /// Program the over-current trim for the selected power
    pub over_current: bool,
}

/// How long to wait for the radio to flag a finished transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PollPolicy {
    pub interval_us: u32,
    /// `None` keeps polling until the flag shows up
    pub max_polls: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_us: lora_defaults::POLL_INTERVAL_US,
            max_polls: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoraConfig {
    pub frequency_hz: u32,
    pub sync_word: u8,
    pub power_dbm: u8,
    pub tuning: Tuning,
    pub poll: PollPolicy,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self {
            frequency_hz: lora_defaults::FREQUENCY_HZ,
            sync_word: lora_defaults::SYNC_WORD,
            power_dbm: lora_defaults::POWER_DBM,
            tuning: Tuning::default(),
            poll: PollPolicy::default(),
        }
    }
}

impl LoraConfig {
    /// The 24-bit carrier word, Frf = f * 2^19 / Fxosc
    pub fn channel_word(&self) -> u32 {
        (((self.frequency_hz as u64) << 19) / lora_defaults::CRYSTAL_HZ) as u32
    }
}
