//! Ready-made programs and nets used by the `tokenflow` binary and tests.

pub mod counter;
pub mod ring;
