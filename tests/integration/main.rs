//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one board variant or
//! one transport against the recording mock or the simulated plant.  All
//! tests run on the host with no real hardware required.

mod converter_tests;
mod mock_hw;
mod panel_tests;
mod protocol_tests;
mod sim_tests;
