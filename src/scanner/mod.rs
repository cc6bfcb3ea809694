//! Scanner engine: user-authored criteria documents compiled into ticker
//! match sets with replace-on-rerun result semantics.

pub mod canned;
pub mod criteria;
pub mod engine;

pub use criteria::{CmpOp, ScannerCriteria, TickerFacts, YieldFilter};
pub use engine::{run_scanner, ScanOutcome};
