//! Host-side stand-ins for the keypad hardware.
//!
//! `VirtualMatrix` models a 4x4 switch matrix with pulled-up columns. Any
//! number of switches can be held closed; a column pin reads low only while
//! the row of a closed switch on that column is driven low.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, ErrorType, InputPin, OutputPin};

use crate::keypad::{COL_COUNT, ROW_COUNT};
use crate::timing::Monotonic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinFault;

impl digital::Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

struct MatrixState {
    // true = driven high (inactive)
    row_levels: [bool; ROW_COUNT],
    closed: [[bool; COL_COUNT]; ROW_COUNT],
    row_drives: usize,
    faulty_row: Option<usize>,
    columns_faulty: bool,
}

#[derive(Clone)]
pub struct VirtualMatrix {
    state: Rc<RefCell<MatrixState>>,
}

pub struct RowPin {
    index: usize,
    state: Rc<RefCell<MatrixState>>,
}

pub struct ColumnPin {
    index: usize,
    state: Rc<RefCell<MatrixState>>,
}

impl VirtualMatrix {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MatrixState {
                row_levels: [true; ROW_COUNT],
                closed: [[false; COL_COUNT]; ROW_COUNT],
                row_drives: 0,
                faulty_row: None,
                columns_faulty: false,
            })),
        }
    }

    pub fn pins(&self) -> ([RowPin; ROW_COUNT], [ColumnPin; COL_COUNT]) {
        let rows = [0, 1, 2, 3].map(|index| RowPin {
            index,
            state: Rc::clone(&self.state),
        });
        let cols = [0, 1, 2, 3].map(|index| ColumnPin {
            index,
            state: Rc::clone(&self.state),
        });
        (rows, cols)
    }

    pub fn press(&self, row: usize, col: usize) {
        self.state.borrow_mut().closed[row][col] = true;
    }

    /// Open every switch.
    pub fn release(&self) {
        self.state.borrow_mut().closed = [[false; COL_COUNT]; ROW_COUNT];
    }

    pub fn rows_idle(&self) -> bool {
        self.state.borrow().row_levels.iter().all(|&high| high)
    }

    /// Number of times any row has been driven low.
    pub fn row_drive_count(&self) -> usize {
        self.state.borrow().row_drives
    }

    /// Make `set_low` on the given row drive the line but report a fault.
    pub fn fail_row(&self, row: Option<usize>) {
        self.state.borrow_mut().faulty_row = row;
    }

    pub fn fail_columns(&self, faulty: bool) {
        self.state.borrow_mut().columns_faulty = faulty;
    }
}

impl Default for VirtualMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for RowPin {
    type Error = PinFault;
}

impl OutputPin for RowPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.row_levels[self.index] = false;
        state.row_drives += 1;
        if state.faulty_row == Some(self.index) {
            return Err(PinFault);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().row_levels[self.index] = true;
        Ok(())
    }
}

impl ErrorType for ColumnPin {
    type Error = PinFault;
}

impl InputPin for ColumnPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        let state = self.state.borrow();
        if state.columns_faulty {
            return Err(PinFault);
        }
        Ok((0..ROW_COUNT).any(|row| !state.row_levels[row] && state.closed[row][self.index]))
    }
}

/// Simulated time, shared between clones.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

impl Monotonic for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}

/// Delay that advances a `ManualClock` instead of blocking.
pub struct SimDelay {
    clock: ManualClock,
}

impl SimDelay {
    pub fn new(clock: ManualClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(Duration::from_nanos(ns.into()));
    }
}

#[cfg(test)]
mod tests {
    use embedded_hal::digital::{InputPin, OutputPin};

    use super::VirtualMatrix;

    #[test]
    fn column_follows_active_row_test() {
        let matrix = VirtualMatrix::new();
        let (mut rows, mut cols) = matrix.pins();
        matrix.press(1, 2);

        assert_eq!(cols[2].is_low(), Ok(false));
        rows[0].set_low().unwrap();
        assert_eq!(cols[2].is_low(), Ok(false));
        rows[0].set_high().unwrap();

        rows[1].set_low().unwrap();
        assert_eq!(cols[2].is_low(), Ok(true));
        assert_eq!(cols[1].is_low(), Ok(false));
        assert!(!matrix.rows_idle());
        rows[1].set_high().unwrap();
        assert!(matrix.rows_idle());
        assert_eq!(matrix.row_drive_count(), 2);
    }
}
