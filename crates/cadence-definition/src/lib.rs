//! Cadence Definition
//!
//! This crate turns author code into process trees.
//!
//! # Architecture
//!
//! ```text
//! WorkflowDescription (trait)      author capability set: steps, iterators, jobs
//! ├── Definition                   registry-backed implementation
//! └── Executor                     binds one description, forwards calls
//!
//! Builder
//! ├── sequential / concurrent      nested processes, recursing through child builders
//! ├── task / job / sub_process     leaf tasks, validated against the description
//! ├── for_each                     build-time fan-out, one evaluation per yielded item
//! └── option                       conditional sub-block
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use cadence_definition::{Definition, WorkflowDescription};
//!
//! let orders = Definition::new("orders")
//!   .step("validate", |_args| Ok(()))
//!   .iterator("each_line", |args, out| {
//!     for line in lines_for(args) {
//!       out.emit(vec![line])?;
//!     }
//!     Ok(())
//!   })
//!   .process(|b| {
//!     b.task("validate", Options::new())?;
//!     b.concurrent(CompletionPolicy::All, Options::new(), Some(|b: &mut Builder<'_>| {
//!       b.for_each("each_line", Options::new(), Some(|b: &mut Builder<'_>| b.task("validate", Options::new())))
//!     }))
//!   });
//!
//! let process = orders.build_process(Arguments::from_values(vec![json!(42)]))?;
//! ```

mod builder;
mod definition;
mod description;
mod error;
mod executor;
mod registry;

pub use builder::{BlockFn, Builder, NO_BLOCK};
pub use definition::{Definition, Yielder};
pub use description::{ItemSink, Job, WorkflowDescription};
pub use error::DefinitionError;
pub use executor::Executor;
pub use registry::DescriptionRegistry;
