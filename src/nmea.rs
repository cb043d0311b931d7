//! NMEA 0183 sentence validation.
//!
//! A sentence looks like `$<talker>,<field>,...,<field>*HH\r\n`. `HH` is the
//! XOR of every byte between `$` and `*`, commas left out, written as two
//! uppercase hex digits. The checksum is optional on the wire but a sentence
//! without one is never accepted here.
//!
//! Sentences are handled as byte slices. A slice may carry a `0` terminator
//! (as left by [`crate::gps::NmeaFramer`]); anything after the first `0` is
//! ignored.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NmeaError {
    /// First byte is not `$`
    MissingStart,
    /// No `*` before the end of the sentence
    MissingChecksum,
    /// The two bytes after `*` are not uppercase hex digits
    BadHexDigit,
    /// The transmitted checksum is `00`, which is refused
    ZeroChecksum,
    /// The transmitted checksum differs from the one computed
    Mismatch { expected: u8, computed: u8 },
}

/// The sentence up to, not including, its terminator.
fn terminated(sentence: &[u8]) -> &[u8] {
    match sentence.iter().position(|&b| b == 0) {
        Some(end) => &sentence[..end],
        None => sentence,
    }
}

/// XOR of every byte in `content`, skipping field separators.
pub fn checksum(content: &[u8]) -> u8 {
    content
        .iter()
        .filter(|&&b| b != b',')
        .fold(0, |sum, &b| sum ^ b)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Parses exactly two uppercase hex digits, most significant first.
pub fn parse_hex_byte(digits: &[u8]) -> Option<u8> {
    match digits {
        [high, low] => Some(hex_digit(*high)? << 4 | hex_digit(*low)?),
        _ => None,
    }
}

/// Validates `sentence` and returns its checksum, or why it was refused.
pub fn check(sentence: &[u8]) -> Result<u8, NmeaError> {
    let sentence = terminated(sentence);

    if sentence.first() != Some(&b'$') {
        return Err(NmeaError::MissingStart);
    }

    let star = sentence
        .iter()
        .position(|&b| b == b'*')
        .ok_or(NmeaError::MissingChecksum)?;

    let digits = sentence
        .get(star + 1..star + 3)
        .ok_or(NmeaError::BadHexDigit)?;
    let expected = parse_hex_byte(digits).ok_or(NmeaError::BadHexDigit)?;

    // A checksum of 00 is only produced by a sentence with nothing between
    // `$` and `*`. Receivers never emit those, so treat it as garbage.
    if expected == 0 {
        return Err(NmeaError::ZeroChecksum);
    }

    let computed = checksum(&sentence[1..star]);
    if computed != expected {
        return Err(NmeaError::Mismatch { expected, computed });
    }

    Ok(computed)
}

/// `true` only for a `$`-prefixed sentence whose checksum matches.
pub fn validate(sentence: &[u8]) -> bool {
    check(sentence).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_GGA: &[u8] = b"$GPGGA,,,,,,,,,,,,,,*56\r\n";

    #[test]
    fn accepts_empty_gga() {
        assert!(validate(EMPTY_GGA));
        assert_eq!(check(EMPTY_GGA), Ok(0x56));
    }

    #[test]
    fn accepts_real_fix() {
        let rmc = b"$GPRMC,083559.00,A,4717.11437,N,00833.91522,E,0.004,77.52,091202,,,A*57";
        assert_eq!(check(rmc), Ok(0x57));
    }

    #[test]
    fn rejects_corrupted_checksum_digits() {
        for corrupt in [
            &b"$GPGGA,,,,,,,,,,,,,,*57\r\n"[..],
            b"$GPGGA,,,,,,,,,,,,,,*65\r\n",
            b"$GPGGA,,,,,,,,,,,,,,*5G\r\n",
            b"$GPGGA,,,,,,,,,,,,,,*5\r\n",
            b"$GPGGA,,,,,,,,,,,,,,*",
        ] {
            assert!(!validate(corrupt));
        }
    }

    #[test]
    fn reports_mismatch() {
        assert_eq!(
            check(b"$GPGGA,,,,,,,,,,,,,,*57"),
            Err(NmeaError::Mismatch {
                expected: 0x57,
                computed: 0x56
            })
        );
    }

    #[test]
    fn lowercase_hex_is_refused() {
        let sentence = b"$PUBX,40,GGA,1,0,0,0,0,0*5b\r\n";
        assert_eq!(check(sentence), Err(NmeaError::BadHexDigit));
    }

    #[test]
    fn needs_leading_dollar() {
        assert_eq!(check(b"GPGGA,,,,,,,,,,,,,,*56"), Err(NmeaError::MissingStart));
        assert_eq!(check(b""), Err(NmeaError::MissingStart));
    }

    #[test]
    fn needs_checksum() {
        assert_eq!(check(b"$GPGGA,,,,,,,,,,,,,,\r\n"), Err(NmeaError::MissingChecksum));
    }

    #[test]
    fn stops_at_terminator() {
        let mut buffer = [0u8; 40];
        buffer[..EMPTY_GGA.len()].copy_from_slice(EMPTY_GGA);
        assert!(validate(&buffer));

        // The `*` sits after the terminator, so it is never seen
        assert_eq!(check(b"$GPGGA,\0*56"), Err(NmeaError::MissingChecksum));
    }

    #[test]
    fn empty_content_has_zero_checksum() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b",,,,"), 0);
        assert_eq!(check(b"$*00\r\n"), Err(NmeaError::ZeroChecksum));
    }

    #[test]
    fn checksum_ignores_field_order() {
        // XOR commutes, so reordering fields never changes the sum
        assert_eq!(checksum(b"GPGGA,12,AB"), checksum(b"GPGGA,AB,12"));
        assert_eq!(checksum(b"GPGGA,12,AB"), checksum(b"GPGGA,12,AB"));
        // but any changed byte does
        assert_ne!(checksum(b"GPGGA,12,AB"), checksum(b"GPGGA,13,AB"));
    }

    #[test]
    fn parses_two_digits_msb_first() {
        assert_eq!(parse_hex_byte(b"00"), Some(0x00));
        assert_eq!(parse_hex_byte(b"0F"), Some(0x0F));
        assert_eq!(parse_hex_byte(b"F0"), Some(0xF0));
        assert_eq!(parse_hex_byte(b"A5"), Some(0xA5));
        assert_eq!(parse_hex_byte(b"5"), None);
        assert_eq!(parse_hex_byte(b"123"), None);
        assert_eq!(parse_hex_byte(b"x1"), None);
    }
}
