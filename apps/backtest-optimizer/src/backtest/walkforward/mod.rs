//! Walk-forward validation.
//!
//! The basic split keeps a chronological train prefix for the parameter
//! sweep and a held-out test suffix that the selection step never sees. The
//! best in-sample parameter sets are then re-run on the test suffix and
//! compared, flagging sets whose Sharpe ratio collapses out of sample.

mod analysis;
mod splitter;
mod types;

pub use analysis::{sharpe_degradation, summarize};
pub use splitter::{SplitError, WalkForwardSplitter};
pub use types::{OutOfSampleResult, OverfittingSummary, WalkForwardConfig, WalkForwardReport};
