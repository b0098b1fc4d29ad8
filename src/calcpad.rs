use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, info};

use crate::calculator::Calculator;
use crate::display::Render;
use crate::keypad::{Key, KeyScanner};
use crate::timing::{Monotonic, PollTimer};

const READY_BANNER: &str = "Calculator Ready!";

/// Ties the scanner, the calculator and a display sink into one polling loop.
pub struct Calcpad<R, C, D, M, S> {
    scanner: KeyScanner<R, C, D, M>,
    calculator: Calculator,
    sink: S,
    timing: PollTimer,
}

impl<R, C, D, M, S> Calcpad<R, C, D, M, S>
where
    R: OutputPin,
    C: InputPin,
    D: DelayNs,
    M: Monotonic,
    S: Render,
{
    pub fn new(scanner: KeyScanner<R, C, D, M>, sink: S) -> Self {
        Self {
            scanner,
            calculator: Calculator::new(),
            sink,
            timing: PollTimer::default(),
        }
    }

    pub fn calculator(&self) -> &Calculator {
        &self.calculator
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn start(&mut self) {
        info!("Keypad calculator starting");
        self.sink.show_banner(READY_BANNER);
        self.sink.show_display(self.calculator.display());
    }

    /// Poll the keypad once, dispatching and rendering a reported key.
    pub fn handle_update(&mut self) -> Option<Key> {
        let key = self.scanner.scan()?;

        debug!("Key pressed: {:?}", key);
        self.calculator.press(key);
        self.sink.show_display(self.calculator.display());

        Some(key)
    }

    /// Poll until a key is reported, giving up after `max_polls` idle polls.
    pub fn poll_for_key(&mut self, max_polls: usize) -> Option<Key> {
        for _ in 0..max_polls {
            if let Some(key) = self.handle_update() {
                return Some(key);
            }
            self.idle();
        }
        self.handle_update()
    }

    /// Wait out the fixed idle time between polls.
    pub fn idle(&mut self) {
        self.timing.mark_poll();
        self.timing.try_sleep();
    }

    /// On-device entry point: poll forever, idling between scans.
    ///
    /// Hosts that inject input between polls drive `handle_update` and
    /// `idle` themselves instead.
    pub fn run(&mut self) -> ! {
        self.start();
        loop {
            self.handle_update();
            self.idle();
        }
    }
}
