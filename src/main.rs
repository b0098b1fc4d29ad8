use std::io::{self, BufRead};

use calcpad::calcpad::Calcpad;
use calcpad::display::ConsoleDisplay;
use calcpad::keypad::{Key, KeyScanner};
use calcpad::sim::VirtualMatrix;
use calcpad::timing::{SpinDelay, SystemClock};
use log::warn;

// Polls before a held key is given up on
const MAX_POLLS_PER_KEY: usize = 100;

fn main() -> io::Result<()> {
    env_logger::init();

    // Keys typed on stdin are held on a virtual matrix until the scanner sees them
    let matrix = VirtualMatrix::new();
    let (rows, cols) = matrix.pins();
    let scanner = KeyScanner::new(rows, cols, SpinDelay::new(), SystemClock::new());
    let mut calcpad = Calcpad::new(scanner, ConsoleDisplay::stdout());

    calcpad.start();

    for line in io::stdin().lock().lines() {
        for symbol in line?.chars().filter(|c| !c.is_whitespace()) {
            let (row, col) = match Key::from_symbol(symbol).and_then(Key::position) {
                Some(position) => position,
                None => {
                    warn!("No key for {:?}", symbol);
                    continue;
                }
            };

            matrix.press(row, col);
            if calcpad.poll_for_key(MAX_POLLS_PER_KEY).is_none() {
                warn!(
                    "Key {:?} not seen after {} polls, dropping it",
                    symbol, MAX_POLLS_PER_KEY
                );
            }
            matrix.release();
        }
    }

    Ok(())
}
