use std::cmp::Ordering;
use std::fmt;

use super::fraction::Fraction;

/// `a·x² + b·x + c = 0` with integer coefficients and `a != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quadratic {
    pub a: i64,
    pub b: i64,
    pub c: i64,
}

/// Real roots of a quadratic, smaller root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Roots {
    Double(Fraction),
    Distinct(Fraction, Fraction),
}

impl Roots {
    fn from_pair(x: Fraction, y: Fraction) -> Self {
        match x.cmp(&y) {
            Ordering::Equal => Roots::Double(x),
            Ordering::Less => Roots::Distinct(x, y),
            Ordering::Greater => Roots::Distinct(y, x),
        }
    }

    /// `(-b ± s) / den`
    fn formula(b: i64, s: i64, den: i64) -> Option<Self> {
        let minus_b = b.checked_neg()?;
        let x = Fraction::new(minus_b.checked_sub(s)?, den)?;
        let y = Fraction::new(minus_b.checked_add(s)?, den)?;
        Some(Self::from_pair(x, y))
    }

    pub fn shifted(&self, by: i64) -> Option<Self> {
        Some(match *self {
            Roots::Double(x) => Roots::Double(x.shifted(by)?),
            Roots::Distinct(x, y) => Roots::Distinct(x.shifted(by)?, y.shifted(by)?),
        })
    }

    pub fn max_denominator(&self) -> i64 {
        match self {
            Roots::Double(x) => x.denominator(),
            Roots::Distinct(x, y) => x.denominator().max(y.denominator()),
        }
    }

    fn key(&self) -> (Fraction, Fraction) {
        match *self {
            Roots::Double(x) => (x, x),
            Roots::Distinct(x, y) => (x, y),
        }
    }
}

impl Ord for Roots {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Roots {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Roots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Roots::Double(x) => write!(f, "x = {}", x),
            Roots::Distinct(x, y) => write!(f, "x₁ = {}, x₂ = {}", x, y),
        }
    }
}

pub fn exact_sqrt(n: i64) -> Option<i64> {
    if n < 0 {
        return None;
    }
    let guess = (n as f64).sqrt().round() as i64;
    (guess.saturating_sub(1)..=guess.saturating_add(1))
        .find(|s| *s >= 0 && s.checked_mul(*s) == Some(n))
}

/// `b² - 4ac` when `sign` is -1, `b² + 4ac` when it is 1.
fn discriminant_with(a: i64, b: i64, c: i64, sign: i64) -> Option<i64> {
    let four_ac = a.checked_mul(c)?.checked_mul(4)?.checked_mul(sign)?;
    b.checked_mul(b)?.checked_add(four_ac)
}

impl Quadratic {
    /// `None` when `b² - 4ac` does not fit in an `i64`.
    pub fn discriminant(&self) -> Option<i64> {
        discriminant_with(self.a, self.b, self.c, -1)
    }

    /// Rational roots, or `None` when the roots are complex, irrational or
    /// too large to compute exactly.
    pub fn solve(&self) -> Option<Roots> {
        if self.a == 0 {
            return None;
        }
        let s = exact_sqrt(self.discriminant()?)?;
        Roots::formula(self.b, s, self.a.checked_mul(2)?)
    }
}

impl fmt::Display for Quadratic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.a {
            1 => write!(f, "x²")?,
            -1 => write!(f, "-x²")?,
            a => write!(f, "{}x²", a)?,
        }
        match self.b {
            0 => {}
            1 => write!(f, " + x")?,
            -1 => write!(f, " - x")?,
            b if b > 0 => write!(f, " + {}x", b)?,
            b => write!(f, " - {}x", -b)?,
        }
        match self.c {
            0 => {}
            c if c > 0 => write!(f, " + {}", c)?,
            c => write!(f, " - {}", -c)?,
        }
        write!(f, " = 0")
    }
}

/// A typical slip made while solving a quadratic with the root formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mistake {
    /// `b² + 4ac` under the root
    DiscriminantSign,
    /// `-b ± √D` without dividing by `2a`
    MissingDenominator,
    /// dividing by `a` instead of `2a`
    DenominatorWithoutTwo,
    SwappedCoefficients,
    /// `b ± √D` instead of `-b ± √D`
    NegatedB,
    ShiftedUp,
    ShiftedDown,
}

impl Mistake {
    pub const ALL: [Mistake; 7] = [
        Mistake::DiscriminantSign,
        Mistake::MissingDenominator,
        Mistake::DenominatorWithoutTwo,
        Mistake::SwappedCoefficients,
        Mistake::NegatedB,
        Mistake::ShiftedUp,
        Mistake::ShiftedDown,
    ];

    /// The roots a student would get by making this mistake, if they are rational.
    pub fn apply(self, eq: &Quadratic, correct: &Roots) -> Option<Roots> {
        let Quadratic { a, b, c } = *eq;
        match self {
            Mistake::DiscriminantSign => {
                let s = exact_sqrt(discriminant_with(a, b, c, 1)?)?;
                Roots::formula(b, s, a.checked_mul(2)?)
            }
            Mistake::MissingDenominator => {
                let s = exact_sqrt(eq.discriminant()?)?;
                Roots::formula(b, s, 1)
            }
            Mistake::DenominatorWithoutTwo => {
                let s = exact_sqrt(eq.discriminant()?)?;
                Roots::formula(b, s, a)
            }
            Mistake::SwappedCoefficients => Quadratic { a, b: c, c: b }.solve(),
            Mistake::NegatedB => {
                let s = exact_sqrt(eq.discriminant()?)?;
                Roots::formula(b.checked_neg()?, s, a.checked_mul(2)?)
            }
            Mistake::ShiftedUp => correct.shifted(1),
            Mistake::ShiftedDown => correct.shifted(-1),
        }
    }
}
