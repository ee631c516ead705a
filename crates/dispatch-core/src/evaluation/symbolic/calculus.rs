use crate::evaluation::symbolic::algebra::{Expr, Func, Rational};
use crate::evaluation::{EvaluationError, EvaluationResult};

pub(crate) fn differentiate(expr: &Expr) -> EvaluationResult<Expr> {
    let mut derivative = Expr::zero();
    for (func, power, coefficient) in expr.terms() {
        // Power rule on the x**n factor.
        if power != 0 {
            derivative.add_term(coefficient.mul(Rational::integer(power.into()))?, power - 1, func)?;
        }
        // Chain through the function factor.
        match func {
            Func::One => {}
            Func::Sin => derivative.add_term(coefficient, power, Func::Cos)?,
            Func::Cos => derivative.add_term(coefficient.neg()?, power, Func::Sin)?,
            Func::Exp => derivative.add_term(coefficient, power, Func::Exp)?,
            Func::Log => derivative.add_term(coefficient, power - 1, Func::One)?,
        }
    }
    Ok(derivative)
}

pub(crate) fn integrate(expr: &Expr) -> EvaluationResult<Expr> {
    let mut antiderivative = Expr::zero();
    for (func, power, coefficient) in expr.terms() {
        let integral = integrate_term(func, power)?.scale(coefficient)?;
        antiderivative = antiderivative.add(&integral)?;
    }
    Ok(antiderivative)
}

/// Antiderivative of `x**power * func(x)` with unit coefficient.
fn integrate_term(func: Func, power: i64) -> EvaluationResult<Expr> {
    match func {
        Func::One if power == -1 => Ok(Expr::term(Rational::ONE, 0, Func::Log)),
        Func::One => Ok(Expr::term(
            Rational::ONE.div(Rational::integer((power + 1).into()))?,
            power + 1,
            Func::One,
        )),
        Func::Log if power == -1 => Err(EvaluationError::unsupported(
            "integral of log(x)/x has no closed form here",
        )),
        Func::Log => {
            // x**(n+1)*log(x)/(n+1) - x**(n+1)/(n+1)**2
            let next = Rational::integer((power + 1).into());
            let mut result = Expr::term(Rational::ONE.div(next)?, power + 1, Func::Log);
            result.add_term(Rational::ONE.div(next.mul(next)?)?.neg()?, power + 1, Func::One)?;
            Ok(result)
        }
        _ if power < 0 => Err(EvaluationError::unsupported(format!(
            "integral of x**{power}*{}(x) is not elementary",
            func.name().unwrap_or("1")
        ))),
        Func::Sin | Func::Cos | Func::Exp => integrate_by_parts(func, power),
    }
}

/// Reduces `x**power * func(x)` for sin, cos and exp, lowering the power by one
/// each step until the plain function remains.
fn integrate_by_parts(func: Func, power: i64) -> EvaluationResult<Expr> {
    // u = x**power, dv = func(x) dx
    let (antiderivative_func, antiderivative_sign) = match func {
        Func::Sin => (Func::Cos, Rational::integer(-1)),
        Func::Cos => (Func::Sin, Rational::ONE),
        Func::Exp => (Func::Exp, Rational::ONE),
        Func::One | Func::Log => {
            return Err(EvaluationError::unsupported(
                "integration by parts needs sin, cos or exp",
            ));
        }
    };

    let uv = Expr::term(antiderivative_sign, power, antiderivative_func);
    if power == 0 {
        return Ok(uv);
    }

    // ∫ v du = sign * power * ∫ x**(power-1) * antiderivative_func(x) dx
    let factor = antiderivative_sign.mul(Rational::integer(power.into()))?;
    let remainder = integrate_term(antiderivative_func, power - 1)?.scale(factor)?;
    uv.sub(&remainder)
}
