//! Concrete machine value types.
//!
//! A `ValueType` is a point in the (lane class × lane width × lane count)
//! grid: scalar integers, floats and booleans, plus their SIMD vector
//! forms. Type inference never invents types outside this grid; the four
//! derivation steps (`half_width`, `double_width`, `half_vector`,
//! `double_vector`) are partial maps that return `None` when they would
//! leave it.

use std::fmt;

/// Scalar class of a lane.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub enum LaneClass {
    /// Signless integer lanes (`i8`..`i64`).
    Int,
    /// IEEE 754 float lanes (`f32`, `f64`).
    Float,
    /// Boolean lanes (`b1`, `b8`..`b64`).
    Bool,
}

impl LaneClass {
    /// Minimum valid lane width in bits for this class.
    pub const fn min_bits(self) -> u16 {
        match self {
            LaneClass::Int => 8,
            LaneClass::Float => 32,
            LaneClass::Bool => 1,
        }
    }

    /// Maximum valid lane width in bits for this class.
    pub const fn max_bits(self) -> u16 {
        64
    }

    /// Check that `bits` is a valid lane width for this class.
    pub fn valid_bits(self, bits: u16) -> bool {
        match self {
            LaneClass::Int => matches!(bits, 8 | 16 | 32 | 64),
            LaneClass::Float => matches!(bits, 32 | 64),
            LaneClass::Bool => matches!(bits, 1 | 8 | 16 | 32 | 64),
        }
    }
}

/// Maximum number of lanes in a vector type.
pub const MAX_LANES: u16 = 256;

/// A concrete machine type: `lanes` copies of a `class` lane of `bits`
/// bits. `lanes == 1` is a scalar.
///
/// Compared, hashed and ordered by value; the `Ord` impl gives typesets a
/// stable, human-predictable enumeration order (class, then width, then
/// lane count).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ValueType {
    /// Scalar class of each lane.
    pub class: LaneClass,
    /// Width of one lane in bits.
    pub bits: u16,
    /// Number of lanes (power of two, `1..=MAX_LANES`).
    pub lanes: u16,
}

impl ValueType {
    /// Construct a type, checking it lies on the valid grid.
    pub fn new(class: LaneClass, bits: u16, lanes: u16) -> Option<Self> {
        if !class.valid_bits(bits) {
            return None;
        }
        if !lanes.is_power_of_two() || lanes > MAX_LANES {
            return None;
        }
        Some(ValueType { class, bits, lanes })
    }

    /// Scalar integer type of the given width.
    pub fn int(bits: u16) -> Option<Self> {
        Self::new(LaneClass::Int, bits, 1)
    }

    /// Scalar float type of the given width.
    pub fn float(bits: u16) -> Option<Self> {
        Self::new(LaneClass::Float, bits, 1)
    }

    /// Scalar boolean type of the given width.
    pub fn bool(bits: u16) -> Option<Self> {
        Self::new(LaneClass::Bool, bits, 1)
    }

    /// Vector type with this type's lane and the given lane count.
    pub fn by(self, lanes: u16) -> Option<Self> {
        Self::new(self.class, self.bits, lanes)
    }

    /// Is this a scalar (single-lane) type?
    pub fn is_scalar(self) -> bool {
        self.lanes == 1
    }

    /// Same lane count, half the lane width. `None` off-grid (`b1` has no
    /// narrower form, `i8`/`f32` neither).
    pub fn half_width(self) -> Option<Self> {
        if self.bits == 1 {
            return None;
        }
        Self::new(self.class, self.bits / 2, self.lanes)
    }

    /// Same lane count, double the lane width.
    pub fn double_width(self) -> Option<Self> {
        if self.bits == 1 {
            // b1 -> b2 is off-grid; the boolean ladder restarts at b8.
            return None;
        }
        Self::new(self.class, self.bits * 2, self.lanes)
    }

    /// Same lane type, half the lane count. Scalars have no half vector.
    pub fn half_vector(self) -> Option<Self> {
        if self.lanes == 1 {
            return None;
        }
        Self::new(self.class, self.bits, self.lanes / 2)
    }

    /// Same lane type, double the lane count.
    pub fn double_vector(self) -> Option<Self> {
        if self.lanes >= MAX_LANES {
            return None;
        }
        Self::new(self.class, self.bits, self.lanes * 2)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.class {
            LaneClass::Int => 'i',
            LaneClass::Float => 'f',
            LaneClass::Bool => 'b',
        };
        write!(f, "{prefix}{}", self.bits)?;
        if self.lanes > 1 {
            write!(f, "x{}", self.lanes)?;
        }
        Ok(())
    }
}
