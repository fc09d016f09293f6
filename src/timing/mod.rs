//! Timing analysts: a template-free critical-path walker plus a PERT/CPM analyst
//! that understands synchronizers (`spec.md` §4.4).

pub mod critical_path;
pub mod cycle;
pub mod pert_cpm;

pub use critical_path::{CriticalPathAnalyst, TimingModel, TimingRecord};
pub use cycle::{check_for_cycles, find_cycle};
pub use pert_cpm::{EdgeTiming, PertCpmAnalyst, PertStats};
