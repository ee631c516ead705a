use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use crate::evaluation::{EvaluationError, EvaluationResult};

/// Largest power of `x` the evaluator will build.
pub(crate) const MAX_DEGREE: i64 = 64;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub(crate) struct Rational {
    num: i128,
    den: i128,
}

impl Rational {
    pub(crate) const ZERO: Rational = Rational { num: 0, den: 1 };
    pub(crate) const ONE: Rational = Rational { num: 1, den: 1 };

    pub(crate) fn new(num: i128, den: i128) -> EvaluationResult<Self> {
        if den == 0 {
            return Err(EvaluationError::unsupported("division by zero"));
        }
        // Keeps `num` and `den` negatable, so `abs` and sign flips below never overflow.
        if num == i128::MIN || den == i128::MIN {
            return Err(overflow());
        }
        let divisor = gcd(num, den);
        let sign = if den < 0 { -1 } else { 1 };
        Ok(Self {
            num: sign * num / divisor,
            den: sign * den / divisor,
        })
    }

    pub(crate) fn integer(value: i128) -> Self {
        Self { num: value, den: 1 }
    }

    pub(crate) fn is_zero(self) -> bool {
        self.num == 0
    }

    pub(crate) fn is_negative(self) -> bool {
        self.num < 0
    }

    pub(crate) fn as_integer(self) -> Option<i128> {
        (self.den == 1).then_some(self.num)
    }

    pub(crate) fn numerator(self) -> i128 {
        self.num
    }

    pub(crate) fn denominator(self) -> i128 {
        self.den
    }

    pub(crate) fn neg(self) -> EvaluationResult<Self> {
        let num = self.num.checked_neg().ok_or_else(overflow)?;
        Ok(Self { num, den: self.den })
    }

    pub(crate) fn abs(self) -> Self {
        Self {
            num: self.num.abs(),
            den: self.den,
        }
    }

    pub(crate) fn add(self, other: Self) -> EvaluationResult<Self> {
        let num = self
            .num
            .checked_mul(other.den)
            .and_then(|left| other.num.checked_mul(self.den).map(|right| (left, right)))
            .and_then(|(left, right)| left.checked_add(right))
            .ok_or_else(overflow)?;
        let den = self.den.checked_mul(other.den).ok_or_else(overflow)?;
        Self::new(num, den)
    }

    pub(crate) fn mul(self, other: Self) -> EvaluationResult<Self> {
        let num = self.num.checked_mul(other.num).ok_or_else(overflow)?;
        let den = self.den.checked_mul(other.den).ok_or_else(overflow)?;
        Self::new(num, den)
    }

    pub(crate) fn recip(self) -> EvaluationResult<Self> {
        Self::new(self.den, self.num)
    }

    pub(crate) fn div(self, other: Self) -> EvaluationResult<Self> {
        self.mul(other.recip()?)
    }

    pub(crate) fn pow(self, exponent: i64) -> EvaluationResult<Self> {
        let base = if exponent < 0 { self.recip()? } else { self };
        let mut result = Self::ONE;
        for _ in 0..exponent.unsigned_abs() {
            result = result.mul(base)?;
        }
        Ok(result)
    }
}

impl Display for Rational {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(a: i128, b: i128) -> i128 {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        (a, b) = (b, a % b);
    }
    if a == 0 { 1 } else { a }
}

fn overflow() -> EvaluationError {
    EvaluationError::unsupported("coefficient overflow")
}

/// Elementary function factor of a term. `One` means no function.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub(crate) enum Func {
    One,
    Cos,
    Exp,
    Log,
    Sin,
}

impl Func {
    pub(crate) fn name(self) -> Option<&'static str> {
        match self {
            Func::One => None,
            Func::Cos => Some("cos"),
            Func::Exp => Some("exp"),
            Func::Log => Some("log"),
            Func::Sin => Some("sin"),
        }
    }
}

/// A finite sum of terms `coefficient * x**power * func(x)`, with like terms
/// combined and zero terms dropped.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Expr {
    terms: BTreeMap<(Func, i64), Rational>,
}

impl Expr {
    pub(crate) fn zero() -> Self {
        Self::default()
    }

    pub(crate) fn constant(value: Rational) -> Self {
        Self::term(value, 0, Func::One)
    }

    pub(crate) fn x() -> Self {
        Self::term(Rational::ONE, 1, Func::One)
    }

    pub(crate) fn term(coefficient: Rational, power: i64, func: Func) -> Self {
        let mut expr = Self::zero();
        if !coefficient.is_zero() {
            expr.terms.insert((func, power), coefficient);
        }
        expr
    }

    pub(crate) fn terms(&self) -> impl Iterator<Item = (Func, i64, Rational)> + '_ {
        self.terms
            .iter()
            .map(|(&(func, power), &coefficient)| (func, power, coefficient))
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    /// The value of this expression when it has no `x` dependence.
    pub(crate) fn as_constant(&self) -> Option<Rational> {
        match self.terms.len() {
            0 => Some(Rational::ZERO),
            1 => self.terms.get(&(Func::One, 0)).copied(),
            _ => None,
        }
    }

    pub(crate) fn is_bare_x(&self) -> bool {
        self.terms.len() == 1 && self.terms.get(&(Func::One, 1)) == Some(&Rational::ONE)
    }

    /// The single `c * x**n` term this expression consists of, if any.
    fn as_monomial(&self) -> Option<(Rational, i64)> {
        if self.terms.len() != 1 {
            return None;
        }
        let (&(func, power), &coefficient) = self.terms.iter().next()?;
        (func == Func::One).then_some((coefficient, power))
    }

    pub(crate) fn add(&self, other: &Expr) -> EvaluationResult<Expr> {
        let mut sum = self.clone();
        for (func, power, coefficient) in other.terms() {
            sum.add_term(coefficient, power, func)?;
        }
        Ok(sum)
    }

    pub(crate) fn neg(&self) -> EvaluationResult<Expr> {
        let terms = self
            .terms
            .iter()
            .map(|(&key, &coefficient)| coefficient.neg().map(|negated| (key, negated)))
            .collect::<EvaluationResult<BTreeMap<_, _>>>()?;
        Ok(Expr { terms })
    }

    pub(crate) fn sub(&self, other: &Expr) -> EvaluationResult<Expr> {
        self.add(&other.neg()?)
    }

    pub(crate) fn scale(&self, factor: Rational) -> EvaluationResult<Expr> {
        let mut scaled = Expr::zero();
        for (func, power, coefficient) in self.terms() {
            scaled.add_term(coefficient.mul(factor)?, power, func)?;
        }
        Ok(scaled)
    }

    pub(crate) fn mul(&self, other: &Expr) -> EvaluationResult<Expr> {
        let mut product = Expr::zero();
        for (left_func, left_power, left_coefficient) in self.terms() {
            for (right_func, right_power, right_coefficient) in other.terms() {
                let func = match (left_func, right_func) {
                    (Func::One, func) | (func, Func::One) => func,
                    (left, right) => {
                        return Err(EvaluationError::unsupported(format!(
                            "product of {}(x) and {}(x)",
                            left.name().unwrap_or("1"),
                            right.name().unwrap_or("1"),
                        )));
                    }
                };
                product.add_term(
                    left_coefficient.mul(right_coefficient)?,
                    left_power + right_power,
                    func,
                )?;
            }
        }
        Ok(product)
    }

    pub(crate) fn div(&self, divisor: &Expr) -> EvaluationResult<Expr> {
        let Some((coefficient, power)) = divisor.as_monomial() else {
            if divisor.is_zero() {
                return Err(EvaluationError::unsupported("division by zero"));
            }
            return Err(EvaluationError::unsupported(
                "division by a sum or by a function of x",
            ));
        };
        let inverse = Expr::term(coefficient.recip()?, -power, Func::One);
        self.mul(&inverse)
    }

    pub(crate) fn pow(&self, exponent: &Expr) -> EvaluationResult<Expr> {
        let exponent = exponent
            .as_constant()
            .and_then(Rational::as_integer)
            .ok_or_else(|| EvaluationError::unsupported("exponent must be an integer constant"))?;
        let exponent = i64::try_from(exponent)
            .ok()
            .filter(|value| value.abs() <= MAX_DEGREE)
            .ok_or_else(|| EvaluationError::unsupported("exponent is too large"))?;

        if let Some((coefficient, power)) = self.as_monomial() {
            let power = power * exponent;
            check_degree(power)?;
            return Ok(Expr::term(coefficient.pow(exponent)?, power, Func::One));
        }
        if exponent == 0 {
            return Ok(Expr::constant(Rational::ONE));
        }
        if exponent < 0 && self.is_zero() {
            return Err(EvaluationError::unsupported("division by zero"));
        }
        if exponent < 0 {
            return Err(EvaluationError::unsupported(
                "negative power of a sum or of a function of x",
            ));
        }

        let mut result = Expr::constant(Rational::ONE);
        for _ in 0..exponent {
            result = result.mul(self)?;
        }
        Ok(result)
    }

    pub(crate) fn apply(func: Func, argument: &Expr) -> EvaluationResult<Expr> {
        if !argument.is_bare_x() {
            return Err(EvaluationError::unsupported(format!(
                "{}() is only supported with argument x",
                func.name().unwrap_or("?")
            )));
        }
        Ok(Expr::term(Rational::ONE, 0, func))
    }

    pub(crate) fn add_term(
        &mut self,
        coefficient: Rational,
        power: i64,
        func: Func,
    ) -> EvaluationResult<()> {
        check_degree(power)?;
        let key = (func, power);
        let updated = match self.terms.get(&key) {
            Some(existing) => existing.add(coefficient)?,
            None => coefficient,
        };
        if updated.is_zero() {
            self.terms.remove(&key);
        } else {
            self.terms.insert(key, updated);
        }
        Ok(())
    }
}

fn check_degree(power: i64) -> EvaluationResult<()> {
    if power.abs() > MAX_DEGREE {
        return Err(EvaluationError::unsupported(format!(
            "power of x exceeds {MAX_DEGREE}"
        )));
    }
    Ok(())
}

impl Display for Expr {
    /// Polynomial terms first by descending degree, then function terms.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }

        let mut ordered: Vec<_> = self.terms().collect();
        ordered.sort_by(|left, right| display_order(*left, *right));

        for (index, (func, power, coefficient)) in ordered.into_iter().enumerate() {
            let magnitude = format_term(func, power, coefficient.abs());
            match (index, coefficient.is_negative()) {
                (0, false) => f.write_str(&magnitude)?,
                (0, true) => write!(f, "-{magnitude}")?,
                (_, false) => write!(f, " + {magnitude}")?,
                (_, true) => write!(f, " - {magnitude}")?,
            }
        }
        Ok(())
    }
}

/// Higher powers of `x` first. At equal power a function factor outranks a
/// bare power, so `x*log(x)` prints ahead of `x`.
fn display_order(left: (Func, i64, Rational), right: (Func, i64, Rational)) -> Ordering {
    let (left_func, left_power, _) = left;
    let (right_func, right_power, _) = right;
    right_power
        .cmp(&left_power)
        .then((right_func != Func::One).cmp(&(left_func != Func::One)))
        .then(left_func.cmp(&right_func))
}

fn power_of_x(power: i64) -> String {
    if power == 1 {
        "x".to_string()
    } else {
        format!("x**{power}")
    }
}

fn format_term(func: Func, power: i64, magnitude: Rational) -> String {
    let mut numerator = Vec::new();
    if magnitude.numerator() != 1 {
        numerator.push(magnitude.numerator().to_string());
    }
    if power > 0 {
        numerator.push(power_of_x(power));
    }
    if let Some(name) = func.name() {
        numerator.push(format!("{name}(x)"));
    }

    let mut denominator = Vec::new();
    if magnitude.denominator() != 1 {
        denominator.push(magnitude.denominator().to_string());
    }
    if power < 0 {
        denominator.push(power_of_x(-power));
    }

    let numerator = if numerator.is_empty() {
        "1".to_string()
    } else {
        numerator.join("*")
    };
    match denominator.len() {
        0 => numerator,
        1 => format!("{numerator}/{}", denominator[0]),
        _ => format!("{numerator}/({})", denominator.join("*")),
    }
}

#[cfg(test)]
mod tests {
    use super::{Expr, Func, Rational};

    fn r(num: i128, den: i128) -> Rational {
        Rational::new(num, den).unwrap()
    }

    #[test]
    fn rationals_normalize_sign_and_gcd() {
        assert_eq!(r(2, -4), r(-1, 2));
        assert_eq!(r(6, 3).as_integer(), Some(2));
        assert_eq!(r(1, 3).add(r(1, 6)).unwrap(), r(1, 2));
        assert!(Rational::new(1, 0).is_err());
    }

    #[test]
    fn extreme_values_are_overflow_errors() {
        assert!(Rational::new(i128::MIN, 1).is_err());
        assert!(Rational::new(1, i128::MIN).is_err());
        assert!(r(i128::MAX, 1).neg().is_ok());
        let huge = Rational::integer(-(1_i128 << 64));
        assert!(huge.mul(Rational::integer(1_i128 << 63)).is_err());
    }

    #[test]
    fn like_terms_combine_and_cancel() {
        let x = Expr::x();
        let doubled = x.add(&x).unwrap();
        assert_eq!(doubled.to_string(), "2*x");
        assert!(doubled.sub(&doubled).unwrap().is_zero());
    }

    #[test]
    fn display_orders_by_power_then_function_terms_first() {
        let mut expr = Expr::term(Rational::ONE, 0, Func::Sin);
        expr.add_term(Rational::integer(-1), 1, Func::Cos).unwrap();
        expr.add_term(r(1, 3), 3, Func::One).unwrap();
        expr.add_term(Rational::ONE, 1, Func::One).unwrap();
        assert_eq!(expr.to_string(), "x**3/3 - x*cos(x) + x + sin(x)");
    }

    #[test]
    fn negative_powers_render_in_the_denominator() {
        assert_eq!(Expr::term(Rational::ONE, -1, Func::One).to_string(), "1/x");
        assert_eq!(Expr::term(r(3, 2), -2, Func::One).to_string(), "3/(2*x**2)");
        assert_eq!(Expr::term(r(-1, 4), 2, Func::One).to_string(), "-x**2/4");
    }

    #[test]
    fn product_of_two_functions_is_unsupported() {
        let sin = Expr::term(Rational::ONE, 0, Func::Sin);
        let cos = Expr::term(Rational::ONE, 0, Func::Cos);
        assert!(sin.mul(&cos).is_err());
    }
}
