use std::cmp::Ordering;
use std::fmt;

/// An exact rational number kept in lowest terms with a positive denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fraction {
    num: i64,
    den: i64,
}

impl Fraction {
    /// Returns `None` for a zero denominator or when normalizing overflows.
    pub fn new(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let divisor = i64::try_from(gcd(num, den)).ok()?;
        let sign = if den < 0 { -1 } else { 1 };
        Some(Self {
            num: num.checked_mul(sign)? / divisor,
            den: den.checked_mul(sign)? / divisor,
        })
    }

    pub fn integer(value: i64) -> Self {
        Self { num: value, den: 1 }
    }

    pub fn numerator(&self) -> i64 {
        self.num
    }

    pub fn denominator(&self) -> i64 {
        self.den
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    pub fn shifted(self, by: i64) -> Option<Self> {
        let num = by.checked_mul(self.den)?.checked_add(self.num)?;
        Some(Self { num, den: self.den })
    }
}

fn gcd(a: i64, b: i64) -> u64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    // gcd(0, 0) never happens since the denominator is non-zero
    a.max(1)
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        // denominators are positive, so cross-multiplying keeps the order
        let lhs = i128::from(self.num) * i128::from(other.den);
        let rhs = i128::from(other.num) * i128::from(self.den);
        lhs.cmp(&rhs)
    }
}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reduces_and_normalizes_sign() {
        let f = Fraction::new(6, -4).unwrap();
        assert_eq!(f.numerator(), -3);
        assert_eq!(f.denominator(), 2);
        assert_eq!(f.to_string(), "-3/2");
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!(Fraction::new(1, 0).is_none());
    }

    #[test]
    fn zero_is_an_integer() {
        let zero = Fraction::new(0, -7).unwrap();
        assert!(zero.is_integer());
        assert_eq!(zero, Fraction::integer(0));
        assert_eq!(zero.to_string(), "0");
    }

    #[test]
    fn ordering_follows_value() {
        let half = Fraction::new(1, 2).unwrap();
        let third = Fraction::new(1, 3).unwrap();
        let minus_one = Fraction::integer(-1);
        assert!(third < half);
        assert!(minus_one < third);
    }

    #[test]
    fn shift_keeps_denominator() {
        let f = Fraction::new(3, 2).unwrap().shifted(-1).unwrap();
        assert_eq!(f, Fraction::new(1, 2).unwrap());
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        assert!(Fraction::new(i64::MIN, -1).is_none());
        assert!(Fraction::integer(i64::MAX).shifted(1).is_none());

        let big = Fraction::new(i64::MAX, 2).unwrap();
        let smaller = Fraction::new(i64::MAX - 1, 3).unwrap();
        assert!(smaller < big);
        assert_eq!(Fraction::new(i64::MIN, 2).unwrap().numerator(), i64::MIN / 2);
    }
}
