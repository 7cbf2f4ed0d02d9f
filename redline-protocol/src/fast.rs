//! Fast channels
//!
//! The block of engine values present in every info packet, from the
//! runlevel byte up to the diagnostic word.

use crate::wire::{self, offset, scale, INFO_PACKET_SIZE};

/// Per-cylinder diagnostic bytes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    /// Knock sensor voltage of the cylinder reported in `cyl_no`
    pub knock_voltage_per_cyl: u8,
    /// Knock retard of that cylinder
    pub knock_retard_per_cyl: u8,
    /// Timer difference of that cylinder
    pub timer_diff_per_cyl: i8,
    pub debug1: u8,
    pub debug2: i16,
}

/// Values refreshed by every info packet
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FastChannels {
    pub runlevel: u8,
    /// Ignition advance, degrees
    pub ign_angle: f32,
    /// Fuel flow, l/h
    pub fuel_flow: f32,
    /// Engine speed, derived from the crank period
    pub rpm: f32,
    /// Injector pulse width, ms
    pub inj_time_ms: f32,
    /// Knock sensor voltage, V
    pub knock_v: f32,
    /// Throttle pedal position, %
    pub tps: f32,
    /// Electronic throttle actual position, %
    pub dbw_pos: f32,
    /// Manifold absolute pressure, kPa
    pub map_kpa: f32,
    pub lambda: f32,
    /// Cylinder the per-cylinder diagnostics refer to
    pub cyl_no: u8,
    /// Transient fuel correction
    pub transient_corr: i8,
    /// Vehicle speed, km/h
    pub speed: f32,
    pub diagnostics: Diagnostics,
}

impl FastChannels {
    /// Not-yet-received state
    pub const UNSET: Self = Self {
        runlevel: 0,
        ign_angle: f32::NAN,
        fuel_flow: f32::NAN,
        rpm: f32::NAN,
        inj_time_ms: f32::NAN,
        knock_v: f32::NAN,
        tps: f32::NAN,
        dbw_pos: f32::NAN,
        map_kpa: f32::NAN,
        lambda: f32::NAN,
        cyl_no: 0,
        transient_corr: 0,
        speed: f32::NAN,
        diagnostics: Diagnostics {
            knock_voltage_per_cyl: 0,
            knock_retard_per_cyl: 0,
            timer_diff_per_cyl: 0,
            debug1: 0,
            debug2: 0,
        },
    };

    /// Decode from an info packet buffer (index 0 = length byte)
    pub fn decode(buf: &[u8; INFO_PACKET_SIZE]) -> Self {
        Self {
            runlevel: buf[offset::RUNLEVEL],
            ign_angle: wire::read_i16(buf, offset::IGN_ANGLE) as f32 * scale::IGN_ANGLE,
            fuel_flow: buf[offset::FUEL_FLOW] as f32 * scale::FUEL_FLOW,
            rpm: wire::rpm_from_period(wire::read_u16(buf, offset::PERIOD)),
            inj_time_ms: wire::read_u16(buf, offset::INJ_TIME) as f32 * scale::INJ_TIME_MS,
            knock_v: buf[offset::KNOCK] as f32 * scale::KNOCK_V,
            tps: buf[offset::TPS] as f32 * scale::PERCENT_255,
            dbw_pos: buf[offset::DBW] as f32 * scale::PERCENT_255,
            map_kpa: buf[offset::MAP] as f32 * scale::PRESSURE_KPA,
            lambda: buf[offset::LAMBDA] as f32 * scale::LAMBDA,
            cyl_no: buf[offset::CYL_NO],
            transient_corr: buf[offset::TRANSIENT] as i8,
            speed: buf[offset::SPEED] as f32,
            diagnostics: Diagnostics {
                knock_voltage_per_cyl: buf[offset::KNOCK_VOLTAGE_CYL],
                knock_retard_per_cyl: buf[offset::KNOCK_RETARD_CYL],
                timer_diff_per_cyl: buf[offset::TIMER_DIFF] as i8,
                debug1: buf[offset::DEBUG1],
                debug2: wire::read_i16(buf, offset::DEBUG2),
            },
        }
    }

    /// Encode into an info packet buffer, leaving every other byte alone
    pub fn encode(&self, buf: &mut [u8; INFO_PACKET_SIZE]) {
        buf[offset::RUNLEVEL] = self.runlevel;
        wire::write_i16(buf, offset::IGN_ANGLE, wire::to_i16(self.ign_angle, scale::IGN_ANGLE));
        buf[offset::FUEL_FLOW] = wire::to_u8(self.fuel_flow, scale::FUEL_FLOW);
        wire::write_u16(buf, offset::PERIOD, wire::period_from_rpm(self.rpm));
        wire::write_u16(buf, offset::INJ_TIME, wire::to_u16(self.inj_time_ms, scale::INJ_TIME_MS));
        buf[offset::KNOCK] = wire::to_u8(self.knock_v, scale::KNOCK_V);
        buf[offset::TPS] = wire::to_u8(self.tps, scale::PERCENT_255);
        buf[offset::DBW] = wire::to_u8(self.dbw_pos, scale::PERCENT_255);
        buf[offset::MAP] = wire::to_u8(self.map_kpa, scale::PRESSURE_KPA);
        buf[offset::LAMBDA] = wire::to_u8(self.lambda, scale::LAMBDA);
        buf[offset::CYL_NO] = self.cyl_no;
        buf[offset::TRANSIENT] = self.transient_corr as u8;
        buf[offset::SPEED] = wire::to_u8(self.speed, 1.0);
        buf[offset::KNOCK_VOLTAGE_CYL] = self.diagnostics.knock_voltage_per_cyl;
        buf[offset::KNOCK_RETARD_CYL] = self.diagnostics.knock_retard_per_cyl;
        buf[offset::TIMER_DIFF] = self.diagnostics.timer_diff_per_cyl as u8;
        buf[offset::DEBUG1] = self.diagnostics.debug1;
        wire::write_i16(buf, offset::DEBUG2, self.diagnostics.debug2);
    }
}

impl Default for FastChannels {
    fn default() -> Self {
        Self::UNSET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(at: usize, bytes: &[u8]) -> [u8; INFO_PACKET_SIZE] {
        let mut buf = [0u8; INFO_PACKET_SIZE];
        buf[at..at + bytes.len()].copy_from_slice(bytes);
        buf
    }

    #[test]
    fn test_period_decodes_to_rpm() {
        // 10000 = 0x2710
        let buf = buffer_with(offset::PERIOD, &[0x10, 0x27]);
        assert_eq!(FastChannels::decode(&buf).rpm, 1000.0);
    }

    #[test]
    fn test_zero_period_is_stopped() {
        let buf = buffer_with(offset::PERIOD, &[0x00, 0x00]);
        assert_eq!(FastChannels::decode(&buf).rpm, 0.0);
    }

    #[test]
    fn test_throttle_endpoints() {
        let full = buffer_with(offset::TPS, &[255]);
        assert_eq!(FastChannels::decode(&full).tps, 100.0);

        let closed = buffer_with(offset::TPS, &[0]);
        assert_eq!(FastChannels::decode(&closed).tps, 0.0);
    }

    #[test]
    fn test_signed_fields() {
        let mut buf = [0u8; INFO_PACKET_SIZE];
        // -10 degrees = -40 quarter degrees
        buf[offset::IGN_ANGLE..offset::IGN_ANGLE + 2].copy_from_slice(&(-40i16).to_le_bytes());
        buf[offset::TRANSIENT] = 0xFE;
        buf[offset::TIMER_DIFF] = 0x80;

        let fast = FastChannels::decode(&buf);
        assert_eq!(fast.ign_angle, -10.0);
        assert_eq!(fast.transient_corr, -2);
        assert_eq!(fast.diagnostics.timer_diff_per_cyl, -128);
    }

    #[test]
    fn test_encode_touches_only_fast_bytes() {
        let mut buf = [0xA5u8; INFO_PACKET_SIZE];
        let mut fast = FastChannels::UNSET;
        fast.rpm = 1000.0;
        fast.encode(&mut buf);

        assert_eq!(buf[0], 0xA5);
        assert_eq!(buf[offset::PACKET_TYPE], 0xA5);
        assert_eq!(buf[offset::SLOW_ID], 0xA5);
        assert_eq!(wire::read_u16(&buf, offset::PERIOD), 10_000);
        // NaN channels encode as zero
        assert_eq!(buf[offset::TPS], 0);
    }
}
