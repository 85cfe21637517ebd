//! # mail-pipe
//!
//! A record-at-a-time mail processing pipeline.
//!
//! Mail records (sender, recipient, body) are read from a text feed, passed
//! through an ordered chain of stages, and written back out in the same
//! framing.
//!
//! ## Overview
//!
//! - **Records**: three lines each on the wire: from, to, body
//! - **Stages**: `Source` (reads), `Filter` (drops), `Duplicate` (copies
//!   to another recipient), `Sink` (writes)
//! - **Chain**: each stage owns its successor and moves records into it
//! - **Builder**: stages link in the order they are declared
//!
//! ## Example
//!
//! ```
//! use mail_pipe::PipelineBuilder;
//!
//! let input = "A\nB\nhi\nA\nC\n?\nC\nA\nok\n";
//! let mut output: Vec<u8> = Vec::new();
//!
//! let mut pipeline = PipelineBuilder::new(input.as_bytes())
//!     .filter_by(|r| r.from == "A")
//!     .copy_to("B")
//!     .send(&mut output)
//!     .build();
//! pipeline.drive().unwrap();
//! drop(pipeline);
//!
//! assert_eq!(String::from_utf8(output).unwrap(), "A\nB\nhi\nA\nC\n?\nA\nB\n?\n");
//! ```

pub mod builder;
pub mod dsl;
pub mod error;
pub mod record;
pub mod stage;

pub use builder::PipelineBuilder;
pub use dsl::{Command, Field, build_pipeline, execute_pipeline, parse_commands};
pub use error::{PipelineError, Result};
pub use record::{LINES_PER_RECORD, Record};
pub use stage::{BoxedStage, Duplicate, Filter, Predicate, Sink, Source, Stage, Successor};
