//! Wire-level constants and scaling rules
//!
//! Shared by the decoder and the emulator's encoder. Raw fields are
//! little-endian. Decoding multiplies the raw value by its scale; encoding
//! divides by the same scale, rounds half away from zero and saturates to
//! the raw type's range. A round trip therefore lands within half a scale
//! step of the original value.

/// Serial sync pattern preceding every info packet
pub const SYNC: [u8; 4] = [0x55, 0x00, 0xAA, 0x00];

/// Protocol version tag following the sync pattern
pub const PROTOCOL_VERSION: u8 = 0x54;

/// Sync bytes plus version tag
pub const HEADER_SIZE: usize = SYNC.len() + 1;

/// Smallest accepted length byte
pub const MIN_LENGTH: u8 = 4;

/// Largest accepted length byte
pub const MAX_LENGTH: u8 = 48;

/// Receive buffer capacity; index 0 holds the length byte
pub const RX_BUFFER_SIZE: usize = 64;

/// Trailing checksum size
pub const CHECKSUM_SIZE: usize = 2;

/// Info packet data size, length byte included
pub const INFO_PACKET_SIZE: usize = 36;

/// Length byte of a complete info packet
pub const INFO_PACKET_LENGTH: u8 = INFO_PACKET_SIZE as u8 + 1;

/// Largest serial frame on the wire: header, length byte, data, checksum
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_LENGTH as usize + 1;

/// Packet type tag of a regular info packet
pub const PACKET_TYPE_INFO: u8 = 0x01;

/// Size of one slow variant
pub const SLOW_PACKET_SIZE: usize = 11;

/// Number of slow variants in the rotation
pub const SLOW_VARIANT_COUNT: u8 = 10;

/// Serial link baud rate
pub const BAUD_RATE: u32 = 19_200;

/// Byte offsets inside the receive buffer (index 0 = length byte)
pub mod offset {
    pub const PACKET_TYPE: usize = 1;
    pub const RUNLEVEL: usize = 2;
    pub const IGN_ANGLE: usize = 3;
    pub const FUEL_FLOW: usize = 5;
    pub const PERIOD: usize = 6;
    pub const INJ_TIME: usize = 8;
    pub const KNOCK: usize = 10;
    pub const TPS: usize = 11;
    pub const DBW: usize = 12;
    pub const MAP: usize = 13;
    pub const LAMBDA: usize = 14;
    pub const CYL_NO: usize = 15;
    pub const TRANSIENT: usize = 16;
    pub const SPEED: usize = 17;
    pub const KNOCK_VOLTAGE_CYL: usize = 18;
    pub const KNOCK_RETARD_CYL: usize = 19;
    pub const TIMER_DIFF: usize = 20;
    pub const DEBUG1: usize = 21;
    pub const DEBUG2: usize = 22;
    pub const SLOW_ID: usize = 24;
    pub const SLOW: usize = 25;
}

/// Serial scale factors (engineering value = raw × scale)
pub mod scale {
    /// Ignition angle, degrees
    pub const IGN_ANGLE: f32 = 0.25;
    /// Fuel flow, l/h
    pub const FUEL_FLOW: f32 = 1.0 / 16.0;
    /// Injector time, ms
    pub const INJ_TIME_MS: f32 = 0.004;
    /// Knock sensor, volts
    pub const KNOCK_V: f32 = 5.0 / 256.0;
    /// Throttle positions
    pub const PERCENT_255: f32 = 100.0 / 255.0;
    /// Idle valve, PWM and fuel composition percentages
    pub const PERCENT_256: f32 = 100.0 / 256.0;
    /// Manifold and back pressure, kPa
    pub const PRESSURE_KPA: f32 = 2.0;
    /// Lambda
    pub const LAMBDA: f32 = 1.0 / 128.0;
    /// Battery voltage, trip distance and consumption, oil pressure
    pub const TENTH: f32 = 0.1;
    /// Trip fuel, litres
    pub const HUNDREDTH: f32 = 0.01;
    /// Raw ADC count to volts
    pub const ADC_VOLTS: f32 = 5.0 / 256.0;
}

/// Engine speed numerator: rpm = PERIOD_DIVIDEND / period
pub const PERIOD_DIVIDEND: f32 = 1.0e7;

/// Round half away from zero; NaN maps to zero
pub fn round_half_away(value: f32) -> i32 {
    if value.is_nan() {
        0
    } else if value >= 0.0 {
        (value + 0.5) as i32
    } else {
        (value - 0.5) as i32
    }
}

/// Quantize an engineering value into a raw `u8`
pub fn to_u8(value: f32, scale: f32) -> u8 {
    round_half_away(value / scale).clamp(0, u8::MAX as i32) as u8
}

/// Quantize an engineering value into a raw `i8`
pub fn to_i8(value: f32, scale: f32) -> i8 {
    round_half_away(value / scale).clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Quantize an engineering value into a raw `u16`
pub fn to_u16(value: f32, scale: f32) -> u16 {
    round_half_away(value / scale).clamp(0, u16::MAX as i32) as u16
}

/// Quantize an engineering value into a raw `i16`
pub fn to_i16(value: f32, scale: f32) -> i16 {
    round_half_away(value / scale).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Engine speed from the crank period field; a zero period means stopped
pub fn rpm_from_period(period: u16) -> f32 {
    if period == 0 {
        0.0
    } else {
        PERIOD_DIVIDEND / period as f32
    }
}

/// Crank period field for an engine speed
///
/// Non-positive (or NaN) speeds encode as 0. Anything slower than the
/// field can express saturates at `u16::MAX`.
pub fn period_from_rpm(rpm: f32) -> u16 {
    if rpm.is_nan() || rpm <= 0.0 {
        return 0;
    }
    round_half_away(PERIOD_DIVIDEND / rpm).clamp(1, u16::MAX as i32) as u16
}

/// Read a little-endian `u16` at `at`
#[inline]
pub fn read_u16(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Read a little-endian `i16` at `at`
#[inline]
pub fn read_i16(buf: &[u8], at: usize) -> i16 {
    i16::from_le_bytes([buf[at], buf[at + 1]])
}

/// Write a little-endian `u16` at `at`
#[inline]
pub fn write_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

/// Write a little-endian `i16` at `at`
#[inline]
pub fn write_i16(buf: &mut [u8], at: usize, value: i16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_packet_fits_length_range() {
        assert!(INFO_PACKET_LENGTH >= MIN_LENGTH && INFO_PACKET_LENGTH <= MAX_LENGTH);
        assert_eq!(offset::SLOW + SLOW_PACKET_SIZE, INFO_PACKET_SIZE);
        assert!((MAX_LENGTH as usize) < RX_BUFFER_SIZE);
    }

    #[test]
    fn test_rpm_from_period() {
        assert_eq!(rpm_from_period(10_000), 1000.0);
        assert_eq!(rpm_from_period(0), 0.0);
    }

    #[test]
    fn test_period_from_rpm() {
        assert_eq!(period_from_rpm(1000.0), 10_000);
        assert_eq!(period_from_rpm(0.0), 0);
        assert_eq!(period_from_rpm(-50.0), 0);
        assert_eq!(period_from_rpm(f32::NAN), 0);
        // 1e7 / 100 rpm does not fit, saturate
        assert_eq!(period_from_rpm(100.0), u16::MAX);
    }

    #[test]
    fn test_round_half_away() {
        assert_eq!(round_half_away(2.5), 3);
        assert_eq!(round_half_away(-2.5), -3);
        assert_eq!(round_half_away(2.49), 2);
        assert_eq!(round_half_away(f32::NAN), 0);
    }

    #[test]
    fn test_quantize_saturates() {
        assert_eq!(to_u8(300.0, 1.0), 255);
        assert_eq!(to_u8(-4.0, 1.0), 0);
        assert_eq!(to_i8(-200.0, 1.0), -128);
        assert_eq!(to_u16(1.0e9, 1.0), u16::MAX);
        assert_eq!(to_i16(-1.0e9, 0.1), i16::MIN);
    }

    #[test]
    fn test_throttle_scale_endpoints() {
        assert_eq!(255.0 * scale::PERCENT_255, 100.0);
        assert_eq!(0.0 * scale::PERCENT_255, 0.0);
        assert_eq!(to_u8(100.0, scale::PERCENT_255), 255);
    }

    #[test]
    fn test_le_helpers() {
        let mut buf = [0u8; 4];
        write_u16(&mut buf, 1, 0xBEEF);
        assert_eq!(buf, [0x00, 0xEF, 0xBE, 0x00]);
        assert_eq!(read_u16(&buf, 1), 0xBEEF);

        write_i16(&mut buf, 0, -2);
        assert_eq!(read_i16(&buf, 0), -2);
    }
}
