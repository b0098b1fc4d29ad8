use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::keypad::{Key, Operator};

// Digits accepted before further input is ignored
pub const MAX_ENTRY_LEN: usize = 10;
// Decimal places kept for non-integral results
const RESULT_PRECISION: usize = 6;

pub const ERROR_MARKER: &str = "Error";

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CalcError {
    #[error("division by zero")]
    DivisionByZero,
    #[error("result out of range")]
    Overflow,
}

impl Operator {
    pub fn apply(self, lhs: f64, rhs: f64) -> Result<f64, CalcError> {
        let result = match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::Divide => {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                lhs / rhs
            }
        };

        if result.is_finite() {
            Ok(result)
        } else {
            Err(CalcError::Overflow)
        }
    }
}

/// What the display shows: a rendered number or the error marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Readout {
    Number(String),
    Error,
}

impl Readout {
    pub fn as_str(&self) -> &str {
        match self {
            Readout::Number(text) => text,
            Readout::Error => ERROR_MARKER,
        }
    }
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-function calculator with left-to-right chaining.
pub struct Calculator {
    readout: Readout,
    current_operand: f64,
    pending_operand: f64,
    pending_operation: Option<Operator>,
    awaiting_new_entry: bool,
}

impl Calculator {
    pub fn new() -> Self {
        Self {
            readout: Readout::Number(String::from("0")),
            current_operand: 0.0,
            pending_operand: 0.0,
            pending_operation: None,
            awaiting_new_entry: true,
        }
    }

    pub fn display(&self) -> &str {
        self.readout.as_str()
    }

    pub fn readout(&self) -> &Readout {
        &self.readout
    }

    pub fn current_operand(&self) -> f64 {
        self.current_operand
    }

    pub fn pending_operand(&self) -> f64 {
        self.pending_operand
    }

    pub fn pending_operation(&self) -> Option<Operator> {
        self.pending_operation
    }

    pub fn is_awaiting_new_entry(&self) -> bool {
        self.awaiting_new_entry
    }

    pub fn press(&mut self, key: Key) {
        match key {
            Key::Digit(digit) => self.input_digit(digit),
            Key::Operator(op) => self.input_operator(op),
            Key::Equals => self.equals(),
            Key::Clear => self.clear(),
        }
    }

    /// Feed a raw keypad symbol; symbols outside the alphabet are ignored.
    pub fn press_symbol(&mut self, symbol: char) {
        match Key::from_symbol(symbol) {
            Some(key) => self.press(key),
            None => warn!("Ignoring unknown key symbol {:?}", symbol),
        }
    }

    pub fn input_digit(&mut self, digit: u8) {
        let digit = match char::from_digit(u32::from(digit), 10) {
            Some(digit) => digit,
            None => {
                warn!("Ignoring out of range digit {}", digit);
                return;
            }
        };

        // Fresh entry, also after an error
        if self.awaiting_new_entry || self.readout == Readout::Error {
            self.readout = Readout::Number(digit.to_string());
            self.awaiting_new_entry = false;
            return;
        }

        if let Readout::Number(text) = &mut self.readout {
            if text.len() >= MAX_ENTRY_LEN {
                debug!("Entry full, dropping {}", digit);
            } else if text == "0" {
                *text = digit.to_string();
            } else {
                text.push(digit);
            }
        }
    }

    pub fn input_operator(&mut self, op: Operator) {
        self.commit_entry();

        if self.pending_operation.is_some() && !self.awaiting_new_entry {
            // A failed chain leaves the engine reset, with no operator armed
            if self.calculate().is_err() {
                return;
            }
        } else {
            self.pending_operand = self.current_operand;
        }

        self.pending_operation = Some(op);
        self.awaiting_new_entry = true;
    }

    pub fn equals(&mut self) {
        self.commit_entry();
        if let Err(err) = self.calculate() {
            debug!("Equals ended in error state: {}", err);
        }
    }

    pub fn clear(&mut self) {
        self.readout = Readout::Number(String::from("0"));
        self.reset();
    }

    fn commit_entry(&mut self) {
        if self.awaiting_new_entry {
            return;
        }
        if let Readout::Number(text) = &self.readout {
            match text.parse::<f64>() {
                Ok(value) => self.current_operand = value,
                Err(err) => warn!("Unparsable entry {:?}: {}", text, err),
            }
        }
    }

    fn calculate(&mut self) -> Result<(), CalcError> {
        let op = match self.pending_operation {
            Some(op) => op,
            None => return Ok(()),
        };

        match op.apply(self.pending_operand, self.current_operand) {
            Ok(result) => {
                debug!(
                    "{} {} {} = {}",
                    self.pending_operand,
                    op.symbol(),
                    self.current_operand,
                    result
                );
                self.readout = Readout::Number(format_number(result));
                self.current_operand = result;
                self.pending_operand = result;
                self.pending_operation = None;
                self.awaiting_new_entry = true;
                Ok(())
            }
            Err(err) => {
                warn!("Arithmetic error: {}", err);
                self.readout = Readout::Error;
                self.reset();
                Err(err)
            }
        }
    }

    // Numeric state and mode only, the readout is left as is
    fn reset(&mut self) {
        self.current_operand = 0.0;
        self.pending_operand = 0.0;
        self.pending_operation = None;
        self.awaiting_new_entry = true;
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{:.0}", value + 0.0);
    }

    let text = format!("{:.*}", RESULT_PRECISION, value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => String::from("0"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{format_number, CalcError, Calculator, Readout, ERROR_MARKER, MAX_ENTRY_LEN};
    use crate::keypad::Operator;
    use proptest::prelude::*;

    // Test helper
    fn type_keys(calc: &mut Calculator, symbols: &str) {
        for symbol in symbols.chars() {
            calc.press_symbol(symbol);
        }
    }

    fn assert_reset(calc: &Calculator) {
        assert_eq!(calc.current_operand(), 0.0);
        assert_eq!(calc.pending_operand(), 0.0);
        assert_eq!(calc.pending_operation(), None);
        assert!(calc.is_awaiting_new_entry());
    }

    #[test]
    fn initial_state_test() {
        let calc = Calculator::new();
        assert_eq!(calc.display(), "0");
        assert_reset(&calc);
    }

    #[test]
    fn leading_zero_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "007");
        assert_eq!(calc.display(), "7");
        type_keys(&mut calc, "0");
        assert_eq!(calc.display(), "70");
    }

    #[test]
    fn entry_cap_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1234567890");
        assert_eq!(calc.display(), "1234567890");
        type_keys(&mut calc, "1");
        assert_eq!(calc.display(), "1234567890");
        assert_eq!(calc.display().len(), MAX_ENTRY_LEN);
    }

    #[test]
    fn addition_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1+2=");
        assert_eq!(calc.display(), "3");
        assert_eq!(calc.current_operand(), 3.0);
        assert_eq!(calc.pending_operand(), 3.0);
        assert_eq!(calc.pending_operation(), None);
        assert!(calc.is_awaiting_new_entry());
    }

    #[test]
    fn subtraction_and_negative_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "3-10=");
        assert_eq!(calc.display(), "-7");
    }

    #[test]
    fn chaining_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "2+3*");
        assert_eq!(calc.display(), "5");
        type_keys(&mut calc, "4=");
        assert_eq!(calc.display(), "20");
    }

    #[test]
    fn repeated_operator_test() {
        let mut calc = Calculator::new();
        // Second operator replaces the first without calculating
        type_keys(&mut calc, "6+*2=");
        assert_eq!(calc.display(), "12");
    }

    #[test]
    fn equals_without_operation_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "42=");
        assert_eq!(calc.display(), "42");
        type_keys(&mut calc, "=");
        assert_eq!(calc.display(), "42");
        assert_eq!(calc.pending_operation(), None);
    }

    #[test]
    fn repeated_equals_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "5*3==");
        assert_eq!(calc.display(), "15");
    }

    #[test]
    fn continue_from_result_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1+2=");
        type_keys(&mut calc, "*4=");
        assert_eq!(calc.display(), "12");
    }

    #[test]
    fn digit_after_result_starts_fresh_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1+2=9");
        assert_eq!(calc.display(), "9");
    }

    #[test]
    fn fraction_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1/3=");
        assert_eq!(calc.display(), "0.333333");

        type_keys(&mut calc, "C2/3=");
        assert_eq!(calc.display(), "0.666667");

        type_keys(&mut calc, "C1/4=");
        assert_eq!(calc.display(), "0.25");
    }

    #[test]
    fn fraction_keeps_full_precision_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1/3*3=");
        assert_eq!(calc.display(), "1");
    }

    #[test]
    fn division_by_zero_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1/0=");
        assert_eq!(calc.display(), ERROR_MARKER);
        assert_eq!(calc.readout(), &Readout::Error);
        assert_eq!(calc.readout().to_string(), ERROR_MARKER);
        assert_reset(&calc);
    }

    #[test]
    fn chained_division_by_zero_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "8/0+");
        assert_eq!(calc.display(), ERROR_MARKER);
        assert_reset(&calc);
    }

    #[test]
    fn digit_after_error_starts_fresh_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1/0=");
        type_keys(&mut calc, "5");
        assert_eq!(calc.display(), "5");
        type_keys(&mut calc, "+1=");
        assert_eq!(calc.display(), "6");
    }

    #[test]
    fn operator_after_error_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "1/0=");
        type_keys(&mut calc, "+");
        assert_eq!(calc.display(), ERROR_MARKER);
        type_keys(&mut calc, "4=");
        assert_eq!(calc.display(), "4");
    }

    #[test]
    fn overflow_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "9999999999");
        for _ in 0..30 {
            type_keys(&mut calc, "*9999999999");
        }
        type_keys(&mut calc, "=");
        assert_eq!(calc.display(), ERROR_MARKER);
        assert_reset(&calc);
    }

    #[test]
    fn clear_test() {
        let scenarios = ["123", "12+", "12+3", "1/0=", "7*8="];
        for scenario in scenarios.iter() {
            let mut calc = Calculator::new();
            type_keys(&mut calc, scenario);
            type_keys(&mut calc, "C");
            assert_eq!(calc.display(), "0", "after {}", scenario);
            assert_reset(&calc);
        }
    }

    #[test]
    fn unknown_symbol_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "12");
        type_keys(&mut calc, "x.#");
        assert_eq!(calc.display(), "12");
        assert!(!calc.is_awaiting_new_entry());
    }

    #[test]
    fn display_is_idempotent_test() {
        let mut calc = Calculator::new();
        type_keys(&mut calc, "4/3=");
        let first = calc.display().to_string();
        assert_eq!(calc.display(), first);
    }

    #[test]
    fn apply_test() {
        assert_eq!(Operator::Add.apply(2.0, 3.0), Ok(5.0));
        assert_eq!(Operator::Subtract.apply(2.0, 3.0), Ok(-1.0));
        assert_eq!(Operator::Multiply.apply(2.0, 3.0), Ok(6.0));
        assert_eq!(Operator::Divide.apply(3.0, 2.0), Ok(1.5));
        assert_eq!(
            Operator::Divide.apply(3.0, 0.0),
            Err(CalcError::DivisionByZero)
        );
        assert_eq!(
            Operator::Multiply.apply(f64::MAX, 2.0),
            Err(CalcError::Overflow)
        );
    }

    #[test]
    fn format_number_test() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(-12.0), "-12");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(-0.125), "-0.125");
        assert_eq!(format_number(1.0 / 3.0), "0.333333");
        assert_eq!(format_number(1e-7), "0");
        assert_eq!(format_number(-1e-7), "0");
    }

    proptest! {
        #[test]
        fn digit_entry_proptest(digits in prop::collection::vec(0u8..10, 1..=MAX_ENTRY_LEN)) {
            let mut calc = Calculator::new();
            for digit in digits.iter() {
                calc.input_digit(*digit);
            }
            let typed: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
            let trimmed = typed.trim_start_matches('0');
            let expected = if trimmed.is_empty() { "0" } else { trimmed };
            prop_assert_eq!(calc.display(), expected);
        }

        #[test]
        fn overlong_entry_proptest(digits in prop::collection::vec(1u8..10, MAX_ENTRY_LEN + 1..30)) {
            let mut calc = Calculator::new();
            for digit in digits.iter() {
                calc.input_digit(*digit);
            }
            let typed: String = digits[..MAX_ENTRY_LEN].iter().map(|d| char::from(b'0' + d)).collect();
            prop_assert_eq!(calc.display(), typed.as_str());
        }

        #[test]
        fn integer_arithmetic_proptest(lhs in 0u32..100_000, rhs in 0u32..100_000, op in 0usize..3) {
            let (symbol, expected) = match op {
                0 => ('+', lhs as i64 + rhs as i64),
                1 => ('-', lhs as i64 - rhs as i64),
                _ => ('*', lhs as i64 * rhs as i64),
            };
            let mut calc = Calculator::new();
            type_keys(&mut calc, &format!("{}{}{}=", lhs, symbol, rhs));
            prop_assert_eq!(calc.display(), expected.to_string());
        }
    }
}
