//! Versioned setup routines
//!
//! A setup unit declares a version and a body. The runner records the last
//! applied version of every unit in the settings store under
//! `setup.lastversion.<name>` and runs a body only when its declared version
//! is ahead of the recorded one.
//!
//! ```rust,ignore
//! use addonkit::setup::{SetupRegistry, SetupRunner};
//!
//! let registry = SetupRegistry::new()
//!     .with::<InvoiceSetup>()
//!     .with::<ReportSetup>();
//!
//! let report = SetupRunner::new(&store).run_all(&registry);
//! println!("{} applied, {} failed", report.applied(), report.failed());
//! ```

mod registry;
mod runner;

pub use registry::{base_name, short_type_name, SetupRegistry, SetupUnit, SETUP_VERSION_PREFIX};
pub use runner::{
    SetupExecutionError, SetupOutcome, SetupReport, SetupRunner, SetupStatus, UnitResult,
};
