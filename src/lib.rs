pub mod calcpad;
pub mod calculator;
pub mod display;
pub mod keypad;
pub mod sim;
pub mod timing;
