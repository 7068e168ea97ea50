use std::cmp::Ordering;
use std::fmt::Display;
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

///
/// A point in virtual time, or a span of virtual time used as a delay.
///
/// Time is unit-less; models pick their own scale (ns, cycles, seconds).
/// Times are totally ordered, so they can key heaps and sorted maps.
///
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);
    pub const MAX: SimTime = SimTime(f64::MAX);
    pub const INFINITY: SimTime = SimTime(f64::INFINITY);

    pub const fn new(time: f64) -> Self {
        Self(time)
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    /// Whether the time is finite, and thus can be scheduled at.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
    }

    pub fn min(&self, other: Self) -> Self {
        Ord::min(*self, other)
    }

    pub fn max(&self, other: Self) -> Self {
        Ord::max(*self, other)
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for SimTime {
    fn from(time: f64) -> Self {
        Self(time)
    }
}

impl From<u32> for SimTime {
    fn from(time: u32) -> Self {
        Self(f64::from(time))
    }
}

impl From<SimTime> for f64 {
    fn from(time: SimTime) -> Self {
        time.0
    }
}

macro_rules! arith {
    ($trait:ident, $fn:ident, $op:tt, $rhs:ty, |$r:ident| $val:expr) => {
        impl $trait<$rhs> for SimTime {
            type Output = SimTime;

            fn $fn(self, $r: $rhs) -> SimTime {
                SimTime(self.0 $op $val)
            }
        }
    };
}

macro_rules! arith_assign {
    ($trait:ident, $fn:ident, $op:tt, $rhs:ty, |$r:ident| $val:expr) => {
        impl $trait<$rhs> for SimTime {
            fn $fn(&mut self, $r: $rhs) {
                self.0 $op $val;
            }
        }
    };
}

arith!(Add, add, +, SimTime, |rhs| rhs.0);
arith!(Sub, sub, -, SimTime, |rhs| rhs.0);
arith!(Add, add, +, f64, |rhs| rhs);
arith!(Sub, sub, -, f64, |rhs| rhs);
arith!(Mul, mul, *, f64, |rhs| rhs);
arith!(Div, div, /, f64, |rhs| rhs);

arith_assign!(AddAssign, add_assign, +=, SimTime, |rhs| rhs.0);
arith_assign!(SubAssign, sub_assign, -=, SimTime, |rhs| rhs.0);
arith_assign!(AddAssign, add_assign, +=, f64, |rhs| rhs);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_order() {
        let mut times = vec![
            SimTime::from(3.0),
            SimTime::ZERO,
            SimTime::from(1.5),
            SimTime::MAX,
        ];
        times.sort();
        assert_eq!(
            times,
            vec![
                SimTime::ZERO,
                SimTime::from(1.5),
                SimTime::from(3.0),
                SimTime::MAX
            ]
        );
        assert_eq!(SimTime::from(2.0).cmp(&SimTime::from(2.0)), Ordering::Equal);
        assert_eq!(SimTime::from(4.0).min(SimTime::from(1.0)), SimTime::from(1.0));
    }

    #[test]
    fn arithmetic() {
        let mut t = SimTime::from(1.0) + 2.0;
        assert_eq!(t, SimTime::from(3.0));
        t -= SimTime::from(0.5);
        assert_eq!(t.as_f64(), 2.5);
        assert_eq!((t * 2.0).to_string(), "5");
        assert_eq!(SimTime::from(9u32) / 3.0, SimTime::from(3.0));
        assert!(!SimTime::INFINITY.is_valid());
    }
}
