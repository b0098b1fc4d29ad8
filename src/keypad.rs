use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, ErrorKind, InputPin, OutputPin};
use log::{debug, error};
use thiserror::Error;

use crate::timing::Monotonic;

// Matrix geometry
pub const ROW_COUNT: usize = 4;
pub const COL_COUNT: usize = 4;

// Quiet window after a reported key, and row settle time
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(1);

/// Symbols printed on the keypad, row 0 at the top.
pub const KEYMAP: [[char; COL_COUNT]; ROW_COUNT] = [
    ['7', '8', '9', '/'],
    ['4', '5', '6', '*'],
    ['1', '2', '3', '-'],
    ['C', '0', '=', '+'],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Operator(Operator),
    Equals,
    Clear,
}

impl Operator {
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
            Operator::Divide => '/',
        }
    }
}

impl Key {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '0'..='9' => symbol.to_digit(10).map(|d| Key::Digit(d as u8)),
            '+' => Some(Key::Operator(Operator::Add)),
            '-' => Some(Key::Operator(Operator::Subtract)),
            '*' => Some(Key::Operator(Operator::Multiply)),
            '/' => Some(Key::Operator(Operator::Divide)),
            '=' => Some(Key::Equals),
            'C' => Some(Key::Clear),
            _ => None,
        }
    }

    /// Printed symbol, `None` for a digit outside 0..=9.
    pub fn symbol(self) -> Option<char> {
        match self {
            Key::Digit(d) => char::from_digit(u32::from(d), 10),
            Key::Operator(op) => Some(op.symbol()),
            Key::Equals => Some('='),
            Key::Clear => Some('C'),
        }
    }

    /// Matrix position of the key, if it is on the keypad.
    pub fn position(self) -> Option<(usize, usize)> {
        let symbol = self.symbol()?;
        KEYMAP.iter().enumerate().find_map(|(row, keys)| {
            keys.iter()
                .position(|&k| k == symbol)
                .map(|col| (row, col))
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    pub debounce: Duration,
    pub settle: Duration,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            settle: DEFAULT_SETTLE,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    #[error("row {row} pin failed: {kind:?}")]
    Row { row: usize, kind: ErrorKind },
    #[error("column {col} pin failed: {kind:?}")]
    Column { col: usize, kind: ErrorKind },
}

/// Row-driven 4x4 matrix scanner with a global debounce window.
///
/// Rows are driven low one at a time; a column reading low while its row is
/// active means the switch at that intersection is closed. Columns are
/// expected to be pulled up.
pub struct KeyScanner<R, C, D, M> {
    rows: [R; ROW_COUNT],
    cols: [C; COL_COUNT],
    delay: D,
    clock: M,
    config: ScanConfig,
    last_event_time: Option<Duration>,
}

impl<R, C, D, M> KeyScanner<R, C, D, M>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
    M: Monotonic,
{
    pub fn new(rows: [R; ROW_COUNT], cols: [C; COL_COUNT], delay: D, clock: M) -> Self {
        Self::with_config(rows, cols, delay, clock, ScanConfig::default())
    }

    pub fn with_config(
        rows: [R; ROW_COUNT],
        cols: [C; COL_COUNT],
        delay: D,
        clock: M,
        config: ScanConfig,
    ) -> Self {
        let mut scanner = Self {
            rows,
            cols,
            delay,
            clock,
            config,
            last_event_time: None,
        };
        if let Err(err) = scanner.restore_rows() {
            error!("Failed to idle keypad rows: {}", err);
        }
        scanner
    }

    /// Scan the matrix once and return at most one debounced key.
    ///
    /// Pin failures are logged and reported as no key.
    pub fn scan(&mut self) -> Option<Key> {
        match self.try_scan() {
            Ok(key) => key,
            Err(err) => {
                error!("Keypad scan failed: {}", err);
                None
            }
        }
    }

    /// Like `scan`, but reports pin failures. Rows are left high either way.
    pub fn try_scan(&mut self) -> Result<Option<Key>, ScanError> {
        let result = self.scan_matrix();
        if result.is_err() {
            if let Err(err) = self.restore_rows() {
                error!("Failed to idle keypad rows: {}", err);
            }
        }
        result
    }

    fn scan_matrix(&mut self) -> Result<Option<Key>, ScanError> {
        let now = self.clock.now();

        if let Some(last) = self.last_event_time {
            if now.saturating_sub(last) < self.config.debounce {
                return Ok(None);
            }
        }

        // Clamped to what a single delay call can express
        let settle_ns = u32::try_from(self.config.settle.as_nanos()).unwrap_or(u32::MAX);
        for row in 0..ROW_COUNT {
            self.rows[row]
                .set_low()
                .map_err(|e| ScanError::Row { row, kind: e.kind() })?;
            self.delay.delay_ns(settle_ns);

            let hit = self.find_active_column();

            self.rows[row]
                .set_high()
                .map_err(|e| ScanError::Row { row, kind: e.kind() })?;

            if let Some(col) = hit? {
                let symbol = KEYMAP[row][col];
                debug!("Contact closed at ({}, {}): {}", row, col, symbol);
                self.last_event_time = Some(now);
                return Ok(Key::from_symbol(symbol));
            }
        }

        Ok(None)
    }

    /// Give back the pins, delay and clock.
    pub fn release(self) -> ([R; ROW_COUNT], [C; COL_COUNT], D, M) {
        (self.rows, self.cols, self.delay, self.clock)
    }

    fn find_active_column(&mut self) -> Result<Option<usize>, ScanError> {
        for (col, pin) in self.cols.iter_mut().enumerate() {
            if pin
                .is_low()
                .map_err(|e| ScanError::Column { col, kind: e.kind() })?
            {
                return Ok(Some(col));
            }
        }
        Ok(None)
    }

    fn restore_rows(&mut self) -> Result<(), ScanError> {
        let mut result = Ok(());
        for (row, pin) in self.rows.iter_mut().enumerate() {
            if let Err(e) = pin.set_high() {
                result = Err(ScanError::Row { row, kind: e.kind() });
            }
        }
        result
    }
}
