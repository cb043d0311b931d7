//! u-blox receiver on the I2C (DDC) bus.
//!
//! The receiver streams NMEA text out of its data register one byte per read.
//! [`NmeaFramer`] cuts that stream into sentences; checking them is left to
//! [`crate::nmea`].

use embedded_hal_async::i2c::I2c;

use crate::config::gps::{ADDRESS, NO_DATA, REG_BYTES_HIGH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpsError<E> {
    /// The I2C transaction did not complete
    Bus(E),
    /// A zero length buffer can't even hold the terminator
    NoCapacity,
}

// Startup configuration. Port 0 (DDC) at 19200 baud, NMEA in and out, then
// only RMC (course and velocity) and GGA (position and time) stay enabled.
const CONF_PROTOCOL_BAUD: &[u8] = b"$PUBX,41,0,0003,0002,19200,0*21\r\n";

const CONF_ENABLE_GPRMC: &[u8] = b"$PUBX,40,RMC,1,0,0,0,0,0*46\r\n";
const CONF_ENABLE_GPGGA: &[u8] = b"$PUBX,40,GGA,1,0,0,0,0,0*5B\r\n";

const CONF_DISABLE_GPGBS: &[u8] = b"$PUBX,40,GBS,0,0,0,0,0,0*4D\r\n";
const CONF_DISABLE_GPGLL: &[u8] = b"$PUBX,40,GLL,0,0,0,0,0,0*5C\r\n";
const CONF_DISABLE_GPGNS: &[u8] = b"$PUBX,40,GNS,0,0,0,0,0,0*41\r\n";
const CONF_DISABLE_GPGRS: &[u8] = b"$PUBX,40,GRS,0,0,0,0,0,0*5D\r\n";
const CONF_DISABLE_GPGSA: &[u8] = b"$PUBX,40,GSA,0,0,0,0,0,0*4E\r\n";
const CONF_DISABLE_GPGST: &[u8] = b"$PUBX,40,GST,0,0,0,0,0,0*5B\r\n";
const CONF_DISABLE_GPGSV: &[u8] = b"$PUBX,40,GSV,0,0,0,0,0,0*59\r\n";
const CONF_DISABLE_GPTXT: &[u8] = b"$PUBX,40,TXT,0,0,0,0,0,0*43\r\n";
const CONF_DISABLE_GPVLW: &[u8] = b"$PUBX,40,VLW,0,0,0,0,0,0*56\r\n";
const CONF_DISABLE_GPVTG: &[u8] = b"$PUBX,40,VTG,0,0,0,0,0,0*5E\r\n";
const CONF_DISABLE_GPZDA: &[u8] = b"$PUBX,40,ZDA,0,0,0,0,0,0*44\r\n";

/// Every command [`configure`] sends, in order.
pub const CONFIGURATION: [&[u8]; 14] = [
    CONF_PROTOCOL_BAUD,
    CONF_ENABLE_GPRMC,
    CONF_ENABLE_GPGGA,
    CONF_DISABLE_GPGBS,
    CONF_DISABLE_GPGLL,
    CONF_DISABLE_GPGNS,
    CONF_DISABLE_GPGRS,
    CONF_DISABLE_GPGSA,
    CONF_DISABLE_GPGST,
    CONF_DISABLE_GPGSV,
    CONF_DISABLE_GPTXT,
    CONF_DISABLE_GPVLW,
    CONF_DISABLE_GPVTG,
    CONF_DISABLE_GPZDA,
];

/// Sends the startup configuration. Stops at the first failed write.
pub async fn configure<I: I2c>(i2c: &mut I) -> Result<(), GpsError<I::Error>> {
    for (index, command) in CONFIGURATION.iter().enumerate() {
        debug!("GPS config command {} of {}", index + 1, CONFIGURATION.len());
        i2c.write(ADDRESS, command).await.map_err(GpsError::Bus)?;
    }

    info!("GPS configured");
    Ok(())
}

/// Number of bytes the receiver has queued for us.
pub async fn bytes_available<I: I2c>(i2c: &mut I) -> Result<u16, GpsError<I::Error>> {
    // Both count registers in one go, high byte first
    let mut count = [0u8; 2];
    i2c.write_read(ADDRESS, &[REG_BYTES_HIGH], &mut count)
        .await
        .map_err(GpsError::Bus)?;

    Ok(u16::from_be_bytes(count))
}

/// Splits the receiver's byte stream into sentences.
///
/// One sentence's end and the next one's `$` can land in different calls, so
/// the last byte read is carried over. A framer belongs to a single GPS
/// session and must not be shared.
#[derive(Debug, Default)]
pub struct NmeaFramer {
    last: u8,
}

impl NmeaFramer {
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    async fn next_byte<I: I2c>(&mut self, i2c: &mut I) -> Result<u8, GpsError<I::Error>> {
        let mut byte = [0u8; 1];
        i2c.read(ADDRESS, &mut byte).await.map_err(GpsError::Bus)?;
        self.last = byte[0];
        Ok(byte[0])
    }

    /// Reads the next sentence into `buffer`, starting at its `$`.
    ///
    /// At most `buffer.len() - 1` bytes are stored and the buffer is always
    /// left `0` terminated, even when a read fails half way. CR/LF are not
    /// copied. A sentence that doesn't fit is cut short without any error,
    /// so a full buffer and a complete sentence look the same.
    ///
    /// Returns the number of bytes stored.
    pub async fn read_sentence<I: I2c>(
        &mut self,
        i2c: &mut I,
        buffer: &mut [u8],
    ) -> Result<usize, GpsError<I::Error>> {
        let limit = match buffer.len() {
            0 => return Err(GpsError::NoCapacity),
            n => n - 1,
        };

        buffer[0] = 0;
        if limit == 0 {
            return Ok(0);
        }

        // Skip ahead to the start of a sentence, unless the last call
        // already swallowed its `$`
        let mut skipped = 0u32;
        while self.last != b'$' {
            self.next_byte(i2c).await?;
            skipped += 1;
        }
        if skipped > 1 {
            trace!("GPS skipped {} bytes to sync", skipped - 1);
        }

        let mut len = 0;
        loop {
            if self.last != NO_DATA {
                buffer[len] = self.last;
                len += 1;
                buffer[len] = 0;
            }

            let byte = self.next_byte(i2c).await?;
            if byte == b'\r' || byte == b'$' || len >= limit {
                break;
            }
        }

        Ok(len)
    }
}

/// Frames and checks sentences forever, keeping the latest good one in
/// [`crate::state::STATE`].
#[cfg(feature = "embedded")]
#[embassy_executor::task]
pub async fn sample(mut i2c: crate::i2c::GpsDevice) -> ! {
    use embassy_time::Timer;

    use crate::{config::gps::SENTENCE_CAPACITY, nmea, state::STATE};

    while configure(&mut i2c).await.is_err() {
        warn!("GPS configuration failed, retrying");
        Timer::after_millis(1_000).await;
    }

    let mut framer = NmeaFramer::new();
    let mut buffer = [0u8; SENTENCE_CAPACITY];

    loop {
        // Reading an empty receiver just returns NO_DATA, so don't spin on it
        match bytes_available(&mut i2c).await {
            Ok(0) => {
                Timer::after_millis(100).await;
                continue;
            }
            Ok(_) => {}
            Err(_) => {
                warn!("GPS byte count read failed");
                Timer::after_millis(100).await;
                continue;
            }
        }

        let len = match framer.read_sentence(&mut i2c, &mut buffer).await {
            Ok(len) => len,
            Err(_) => {
                warn!("GPS sentence read failed");
                continue;
            }
        };

        let mut state = STATE.lock().await;
        match nmea::check(&buffer[..len]) {
            Ok(_) => {
                state.sentence.clear();
                if state.sentence.extend_from_slice(&buffer[..len]).is_err() {
                    warn!("GPS sentence of {} bytes dropped", len);
                    continue;
                }
                state.accepted += 1;
            }
            Err(err) => {
                debug!("GPS sentence rejected: {:?}", err);
                state.rejected += 1;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted receiver for unit tests

    use std::{collections::VecDeque, vec::Vec};

    use embedded_hal_async::i2c::{self, ErrorKind, ErrorType, I2c, Operation};

    use crate::config::gps::{ADDRESS, REG_BYTES_HIGH};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BusError;

    impl i2c::Error for BusError {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    /// Hands out `stream` one byte per read. Running dry, or reaching
    /// `fail_at` reads, fails the transaction. `fail_writes_at` does the same
    /// for command writes and `fail_count` for the byte count read.
    #[derive(Default)]
    pub struct ScriptedGps {
        pub stream: VecDeque<u8>,
        pub fail_at: Option<usize>,
        pub fail_writes_at: Option<usize>,
        pub fail_count: bool,
        pub reads: usize,
        pub writes: Vec<Vec<u8>>,
        pub pending: u16,
    }

    impl ScriptedGps {
        pub fn new(stream: &[u8]) -> Self {
            Self {
                stream: stream.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl ErrorType for ScriptedGps {
        type Error = BusError;
    }

    impl I2c for ScriptedGps {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            assert_eq!(address, ADDRESS);

            let mut register = None;
            for operation in operations {
                match operation {
                    Operation::Write(bytes) => {
                        if bytes.len() == 1 {
                            register = Some(bytes[0]);
                        } else {
                            if self.fail_writes_at == Some(self.writes.len()) {
                                return Err(BusError);
                            }
                            self.writes.push(bytes.to_vec());
                        }
                    }
                    Operation::Read(buffer) if register == Some(REG_BYTES_HIGH) => {
                        if self.fail_count {
                            return Err(BusError);
                        }
                        buffer.copy_from_slice(&self.pending.to_be_bytes());
                    }
                    Operation::Read(buffer) => {
                        for slot in buffer.iter_mut() {
                            if self.fail_at == Some(self.reads) {
                                return Err(BusError);
                            }
                            *slot = self.stream.pop_front().ok_or(BusError)?;
                            self.reads += 1;
                        }
                    }
                }
            }

            Ok(())
        }
    }
}
