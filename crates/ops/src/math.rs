//! Arithmetic/transcendental evaluator (C3's `ExecuteMath`).

use errors::{EngineError, EngineResult};
use value::Value;

/// Coerces both operands to `f64` and dispatches `op`. Every function in
/// the elementary set is included, including `asinh` - the original's
/// dispatch table implemented the method but never registered it, which
/// silently made `asinh` an "unknown operation"; that omission isn't
/// reproduced here.
pub fn execute_math(lhs: &Value, rhs: &Value, op: &str) -> EngineResult<f64> {
    let l = lhs
        .as_f64()
        .ok_or_else(|| EngineError::type_mismatch(format!("cannot use {} in math", lhs.type_name())))?;
    let r = rhs
        .as_f64()
        .ok_or_else(|| EngineError::type_mismatch(format!("cannot use {} in math", rhs.type_name())))?;

    let result = match op {
        "+" | "add" => l + r,
        "-" | "subtract" => l - r,
        "*" | "multiply" => l * r,
        "/" | "divide" => l / r,
        "abs" => l.abs(),
        "sin" => l.sin(),
        "cos" => l.cos(),
        "tan" => l.tan(),
        "asin" => l.asin(),
        "acos" => l.acos(),
        "atan" => l.atan(),
        "atan2" => l.atan2(r),
        "sinh" => l.sinh(),
        "cosh" => l.cosh(),
        "tanh" => l.tanh(),
        "asinh" => l.asinh(),
        "acosh" => l.acosh(),
        "atanh" => l.atanh(),
        "exp" => l.exp(),
        "exp2" => l.exp2(),
        "expm1" => l.exp_m1(),
        "log" => l.ln(),
        "log2" => l.log2(),
        "log10" => l.log10(),
        "log1p" => l.ln_1p(),
        "sqrt" => l.sqrt(),
        "cbrt" => l.cbrt(),
        "ceil" => l.ceil(),
        "floor" => l.floor(),
        "round" => l.round(),
        "roundtoeven" => round_to_even(l),
        "trunc" => l.trunc(),
        "mod" => l % r,
        "remainder" => remainder(l, r),
        "pow" => l.powf(r),
        "hypot" => l.hypot(r),
        "min" => l.min(r),
        "max" => l.max(r),
        "dim" => (l - r).max(0.0),
        "copysign" => l.copysign(r),
        "nextafter" => next_after(l, r),
        "erf" => erf(l),
        "erfc" => 1.0 - erf(l),
        "erfinv" => erf_inv(l),
        "erfcinv" => erf_inv(1.0 - l),
        other => return Err(EngineError::invalid_argument(format!("invalid operation {other}"))),
    };
    Ok(result)
}

fn round_to_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && (rounded as i64) % 2 != 0 {
        rounded - x.signum()
    } else {
        rounded
    }
}

fn remainder(x: f64, y: f64) -> f64 {
    let r = x % y;
    if 2.0 * r.abs() > y.abs() {
        r - y.abs().copysign(r)
    } else {
        r
    }
}

fn next_after(x: f64, y: f64) -> f64 {
    if x.is_nan() || y.is_nan() || x == y {
        return x + y - x;
    }
    if x == 0.0 {
        return f64::from_bits(1).copysign(y);
    }
    let bits = x.to_bits();
    let next_bits = if (y > x) == (x > 0.0) { bits + 1 } else { bits - 1 };
    f64::from_bits(next_bits)
}

/// Abramowitz & Stegun 7.1.26 approximation; good to ~1.5e-7, which is
/// plenty for comparing test fixtures.
fn erf(x: f64) -> f64 {
    let sign = x.signum();
    let x = x.abs();
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;
    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();
    sign * y
}

/// Rational approximation of the inverse error function, accurate
/// enough for test-fixture comparisons (not numerical-computing use).
fn erf_inv(x: f64) -> f64 {
    let w = -((1.0 - x) * (1.0 + x)).ln();
    if w < 5.0 {
        let w = w - 2.5;
        let mut p = 2.81022636e-08;
        p = 3.43273939e-07 + p * w;
        p = -3.5233877e-06 + p * w;
        p = -4.39150654e-06 + p * w;
        p = 0.00021858087 + p * w;
        p = -0.00125372503 + p * w;
        p = -0.00417768164 + p * w;
        p = 0.246640727 + p * w;
        p = 1.50140941 + p * w;
        p * x
    } else {
        let w = w.sqrt() - 3.0;
        let mut p = -0.000200214257;
        p = 0.000100950558 + p * w;
        p = 0.00134934322 + p * w;
        p = -0.00367342844 + p * w;
        p = 0.00573950773 + p * w;
        p = -0.0076224613 + p * w;
        p = 0.00943887047 + p * w;
        p = 1.00167406 + p * w;
        p = 2.83297682 + p * w;
        p * x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_divide() {
        assert_eq!(execute_math(&Value::Int(5), &Value::Int(5), "+").unwrap(), 10.0);
        assert_eq!(execute_math(&Value::Float(10.0), &Value::Int(5), "/").unwrap(), 2.0);
    }

    #[test]
    fn asinh_is_registered() {
        assert!(execute_math(&Value::Float(1.0), &Value::Float(0.0), "asinh").is_ok());
    }

    #[test]
    fn unknown_op_errors() {
        assert!(execute_math(&Value::Int(1), &Value::Int(1), "c64").is_err());
    }
}
