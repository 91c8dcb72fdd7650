//! The arithmetic behind the demo service.

/// Why a calculation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CalcError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow")]
    Overflow,
}

pub trait Calculator: Send + Sync {
    fn add(&self, a: i64, b: i64) -> Result<i64, CalcError>;
    fn divide(&self, a: i64, b: i64) -> Result<i64, CalcError>;
}

/// Checked integer arithmetic. Never panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct Arithmetic;

impl Calculator for Arithmetic {
    fn add(&self, a: i64, b: i64) -> Result<i64, CalcError> {
        a.checked_add(b).ok_or(CalcError::Overflow)
    }

    fn divide(&self, a: i64, b: i64) -> Result<i64, CalcError> {
        if b == 0 {
            return Err(CalcError::DivisionByZero);
        }
        a.checked_div(b).ok_or(CalcError::Overflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divide_truncates_toward_zero() {
        assert_eq!(Arithmetic.divide(7, 2), Ok(3));
        assert_eq!(Arithmetic.divide(-7, 2), Ok(-3));
    }

    #[test]
    fn divide_by_zero_is_an_error() {
        assert_eq!(Arithmetic.divide(1, 0), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn min_by_minus_one_overflows() {
        assert_eq!(Arithmetic.divide(i64::MIN, -1), Err(CalcError::Overflow));
    }

    #[test]
    fn add_checks_overflow() {
        assert_eq!(Arithmetic.add(2, 3), Ok(5));
        assert_eq!(Arithmetic.add(i64::MAX, 1), Err(CalcError::Overflow));
    }
}
