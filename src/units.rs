/// Physical quantities reported by the inverter.
///
/// The Fronius Solar API reports power in watts, current in amperes and
/// voltage in volts. The dashboard shows power in kilowatts, so the only
/// conversion that ever happens is `Watts -> Kilowatts`.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Quantity newtypes
// ---------------------------------------------------------------------------

macro_rules! quantity {
    ($name:ident, $suffix:literal, $precision:literal) => {
        #[derive(Copy, Clone, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub f64);

        impl $name {
            pub const ZERO: Self = Self(0.0);

            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.*} {}", $precision, self.0, $suffix)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", self.0, $suffix)
            }
        }

        impl From<$name> for f64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

quantity!(Watts, "W", 0);
quantity!(Kilowatts, "kW", 2);
quantity!(Amperes, "A", 2);
quantity!(Volts, "V", 2);

impl From<Watts> for Kilowatts {
    fn from(watts: Watts) -> Self {
        Self(watts.0 / 1000.0)
    }
}
