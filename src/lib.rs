// Library root
// -----------
// The binary (`main.rs`) only parses arguments and wires these modules
// together, so everything below can be exercised from tests.
//
// Module responsibilities:
// - `api`: single HTTP exchanges with the compression endpoint.
// - `compress`: retrying uploads and the recursive re-compression loop.
// - `batch`: per-file processing and the batch summary.
// - `inputs` / `output`: which files to read and where results go.
// - `ui`: the terminal report.
pub mod agent;
pub mod api;
pub mod batch;
pub mod cli;
pub mod compress;
pub mod config;
pub mod error;
pub mod inputs;
pub mod interrupt;
pub mod logging;
pub mod output;
pub mod ui;
