//! This module defines various unit types and their conversions.
//!
//! Every quantity is a thin wrapper around an `f64`. Arithmetic is only implemented between units
//! where the result is physically meaningful, so e.g. multiplying a [`Power`] by a number of
//! [`Hours`] gives an [`Energy`].
use serde::{Deserialize, Serialize};

macro_rules! unit_struct {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            PartialOrd,
            Default,
            Serialize,
            Deserialize,
            derive_more::Add,
            derive_more::Sub,
            derive_more::Display,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Create a new instance of the unit type from an `f64` value.
            pub const fn new(val: f64) -> Self {
                Self(val)
            }

            /// Return the value of the unit type as an `f64`.
            pub const fn value(self) -> f64 {
                self.0
            }

            /// Whether the underlying value is finite (i.e. not infinite or NaN).
            pub fn is_finite(self) -> bool {
                self.0.is_finite()
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name(self.0 / rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                $name(iter.map(|x| x.0).sum())
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::new(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::new(self.0 / rhs.0)
            }
        }
    };
}

/// Represents a dimensionless quantity, e.g. an efficiency or a capacity factor.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    PartialOrd,
    Default,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::Display,
)]
pub struct Dimensionless(pub f64);

impl Dimensionless {
    /// Create a new dimensionless value
    pub const fn new(val: f64) -> Self {
        Self(val)
    }

    /// Return the value as an `f64`
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Whether the underlying value is finite (i.e. not infinite or NaN).
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless(self.0 / rhs.0)
    }
}

// Base quantities
unit_struct!(Money, "An amount of money (currency units).");
unit_struct!(Energy, "An amount of energy (kWh).");
unit_struct!(Power, "A rate of energy transfer or an installed capacity (kW).");
unit_struct!(Hours, "A duration in hours.");

// Derived quantities
unit_struct!(MoneyPerPower, "Capital cost per unit of rated power (currency/kW).");
unit_struct!(MoneyPerEnergy, "Cost per unit of energy (currency/kWh).");

// Division rules
impl_div!(Energy, Hours, Power);
impl_div!(Energy, Power, Hours);
impl_div!(Money, Power, MoneyPerPower);
impl_div!(Money, Energy, MoneyPerEnergy);

// Multiplication rules
impl_mul!(Power, Hours, Energy);
impl_mul!(MoneyPerPower, Power, Money);
impl_mul!(MoneyPerEnergy, Energy, Money);
