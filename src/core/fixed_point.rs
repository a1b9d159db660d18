use std::fmt;
use std::ops::{Add, Sub};

use serde::Serialize;

const FRACTION_BITS: u32 = 14;
const F: i64 = 1 << FRACTION_BITS;

// 17.14: an i32 scaled by 2^14
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Fp(i32);

impl Fp {
    pub const ZERO: Fp = Fp(0);
    pub const SCALE: i32 = F as i32;

    pub const fn from_int(n: i32) -> Self {
        Fp(n * Self::SCALE)
    }

    pub const fn from_raw(raw: i32) -> Self {
        Fp(raw)
    }

    pub const fn raw(self) -> i32 {
        self.0
    }

    // Toward zero, as in C
    pub fn to_int_trunc(self) -> i32 {
        self.0 / Self::SCALE
    }

    pub fn to_int_round(self) -> i32 {
        let half = Self::SCALE / 2;
        if self.0 >= 0 {
            (self.0 + half) / Self::SCALE
        } else {
            (self.0 - half) / Self::SCALE
        }
    }

    pub fn add_int(self, n: i32) -> Self {
        Fp(self.0 + n * Self::SCALE)
    }

    pub fn mul(self, other: Fp) -> Self {
        Fp(((self.0 as i64 * other.0 as i64) / F) as i32)
    }

    pub fn mul_int(self, n: i32) -> Self {
        Fp(self.0 * n)
    }

    /// Panics if `other` is zero.
    pub fn div(self, other: Fp) -> Self {
        Fp(((self.0 as i64 * F) / other.0 as i64) as i32)
    }

    pub fn div_int(self, n: i32) -> Self {
        Fp(self.0 / n)
    }
}

impl Add for Fp {
    type Output = Fp;

    fn add(self, rhs: Fp) -> Fp {
        Fp(self.0 + rhs.0)
    }
}

impl Sub for Fp {
    type Output = Fp;

    fn sub(self, rhs: Fp) -> Fp {
        Fp(self.0 - rhs.0)
    }
}

impl fmt::Debug for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fp({:.4})", self.0 as f64 / F as f64)
    }
}

impl fmt::Display for Fp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0 as f64 / F as f64)
    }
}
