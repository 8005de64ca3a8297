//! Text renderings of the formula and its results for the host to display.
pub mod trace;
