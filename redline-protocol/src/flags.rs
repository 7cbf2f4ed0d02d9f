//! ECU status flag registers
//!
//! Each register is one byte of slow variant 1 (or 7 for the gearbox
//! state). Bit 0 is the least significant bit. Unknown bits are retained
//! so a decode/encode pass never loses information.

use bitflags::bitflags;

bitflags! {
    /// Sensor and actuator faults
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlagMajor: u8 {
        /// Crank position sensor
        const CRANK_SENSOR = 1 << 0;
        /// Detonation sensor
        const DETONATION = 1 << 1;
        /// Drive-by-wire throttle
        const DBW = 1 << 2;
        /// Absolute pressure sensor
        const ABSOLUTE_PRESSURE = 1 << 3;
        /// NO sensor
        const NO_SENSOR = 1 << 4;
        /// Coolant temperature sensor
        const COOLANT = 1 << 5;
        /// Oil pressure
        const OIL_PRESSURE = 1 << 6;
        /// Fuel pressure
        const FUEL_PRESSURE = 1 << 7;
    }
}

bitflags! {
    /// Secondary sensor faults
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlagMinor: u8 {
        const LAMBDA = 1 << 0;
        const INTAKE_TEMP = 1 << 1;
        const FUEL_TEMP = 1 << 2;
        const OIL_TEMP = 1 << 3;
        const VVT = 1 << 4;
        const EGR = 1 << 5;
    }
}

bitflags! {
    /// Operating-mode notifications
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlagNotify: u8 {
        const TABLE_SWITCH = 1 << 0;
        const INJ_TIME_LIMIT = 1 << 1;
        const MARKER = 1 << 2;
        const AFTER_START_ENRICH = 1 << 3;
        const PHASED_MODE = 1 << 4;
        const WRITE_PENDING = 1 << 5;
        const METHANOL = 1 << 6;
        const IDLE_CUTOFF = 1 << 7;
    }
}

bitflags! {
    /// Motorsport function notifications
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlagNotify2: u8 {
        const LAUNCH = 1 << 0;
        const FLAT_SHIFT = 1 << 1;
        const ANTI_LAG = 1 << 2;
    }
}

bitflags! {
    /// Engine protection interventions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlagProtection: u8 {
        const RPM = 1 << 0;
        const OVERBOOST = 1 << 1;
        const LAMBDA = 1 << 2;
        const INJ_DUTY = 1 << 3;
        const COOLANT = 1 << 4;
        const EGT = 1 << 5;
        const OIL_TEMP = 1 << 6;
    }
}

bitflags! {
    /// Automatic transmission state
    ///
    /// Bits 5..=7 hold the selector position, see [`AtState::selector`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AtState: u8 {
        const PART_LOCK = 1 << 0;
        const FULL_LOCK = 1 << 1;
        const SHIFTING = 1 << 2;
        const RETARD = 1 << 3;
    }
}

/// Bit position of the gear selector field
const SELECTOR_SHIFT: u8 = 5;

impl AtState {
    /// Gear selector position (0-7)
    pub fn selector(self) -> u8 {
        self.bits() >> SELECTOR_SHIFT
    }

    /// Replace the selector position, keeping the lock bits
    pub fn with_selector(self, selector: u8) -> Self {
        let bits = (self.bits() & !(0x07 << SELECTOR_SHIFT)) | ((selector & 0x07) << SELECTOR_SHIFT);
        Self::from_bits_retain(bits)
    }
}

#[cfg(feature = "defmt")]
mod format {
    use super::*;

    macro_rules! impl_format {
        ($($ty:ident),*) => {
            $(
                impl defmt::Format for $ty {
                    fn format(&self, f: defmt::Formatter) {
                        defmt::write!(f, "{=str}({=u8:#04x})", stringify!($ty), self.bits())
                    }
                }
            )*
        };
    }

    impl_format!(FlagMajor, FlagMinor, FlagNotify, FlagNotify2, FlagProtection, AtState);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_numbering_is_lsb_first() {
        assert_eq!(FlagMajor::CRANK_SENSOR.bits(), 0x01);
        assert_eq!(FlagMajor::FUEL_PRESSURE.bits(), 0x80);
        assert_eq!(FlagNotify::PHASED_MODE.bits(), 0x10);
        assert_eq!(FlagProtection::OIL_TEMP.bits(), 0x40);
    }

    #[test]
    fn test_unknown_bits_retained() {
        let minor = FlagMinor::from_bits_retain(0xC1);
        assert!(minor.contains(FlagMinor::LAMBDA));
        assert_eq!(minor.bits(), 0xC1);
    }

    #[test]
    fn test_at_selector() {
        let state = AtState::from_bits_retain(0b1010_0011);
        assert!(state.contains(AtState::PART_LOCK | AtState::FULL_LOCK));
        assert!(!state.contains(AtState::SHIFTING));
        assert_eq!(state.selector(), 5);

        let state = state.with_selector(2);
        assert_eq!(state.selector(), 2);
        assert_eq!(state.bits(), 0b0100_0011);
    }
}
