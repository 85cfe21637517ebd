//! Stage trait and the four stage implementations.
//!
//! A pipeline is a singly-linked chain of stages. Each stage owns its
//! successor and hands records to it by value, so a record has exactly one
//! owner at any point. Only the `Source` at the head of the chain is driven
//! from outside; every other stage only reacts to `process`.

use std::io::{BufRead, Write};

use tracing::{debug, trace};

use crate::error::{PipelineError, Result};
use crate::record::Record;

/// A boxed stage living at most as long as the feeds it borrows.
pub type BoxedStage<'a> = Box<dyn Stage<'a> + 'a>;

/// Predicate deciding whether a `Filter` admits a record.
pub type Predicate<'a> = Box<dyn Fn(&Record) -> bool + 'a>;

/// A processing unit in a mail pipeline.
///
/// Every implementation states explicitly which operations it supports;
/// unsupported ones return `PipelineError::Unsupported`.
pub trait Stage<'a> {
    /// Take ownership of one record and forward zero or more records to
    /// the successor.
    fn process(&mut self, record: Record) -> Result<()>;

    /// Pull records from an external feed and push them down the chain
    /// until the feed is exhausted.
    fn drive(&mut self) -> Result<()>;

    /// Install the stage that receives forwarded records, replacing any
    /// previous one.
    fn set_successor(&mut self, next: BoxedStage<'a>);

    /// The display name of this stage.
    fn name(&self) -> &'static str;
}

/// The forward link from one stage to the next.
///
/// Forwarding with no successor installed drops the record.
#[derive(Default)]
pub struct Successor<'a>(Option<BoxedStage<'a>>);

impl<'a> Successor<'a> {
    pub fn set(&mut self, next: BoxedStage<'a>) {
        self.0 = Some(next);
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Hand `record` to the successor, if any.
    pub fn pass_on(&mut self, record: Record) -> Result<()> {
        match self.0.as_mut() {
            Some(next) => next.process(record),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage implementations
// ---------------------------------------------------------------------------

/// READ - reads three-line records from an input feed.
pub struct Source<'a, R> {
    input: R,
    next: Successor<'a>,
}

impl<'a, R: BufRead> Source<'a, R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            next: Successor::default(),
        }
    }

    /// Read one line without its terminator. `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with('\n') {
            line.pop();
        }
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }

    /// Read one framed record. A partial trailing unit yields `None`.
    fn read_record(&mut self) -> Result<Option<Record>> {
        let Some(from) = self.read_line()? else {
            return Ok(None);
        };
        let Some(to) = self.read_line()? else {
            return Ok(None);
        };
        let Some(body) = self.read_line()? else {
            return Ok(None);
        };
        Ok(Some(Record { from, to, body }))
    }
}

impl<'a, R: BufRead + 'a> Stage<'a> for Source<'a, R> {
    fn process(&mut self, _record: Record) -> Result<()> {
        Err(PipelineError::unsupported(self.name(), "process"))
    }

    fn drive(&mut self) -> Result<()> {
        let mut count = 0usize;
        while let Some(record) = self.read_record()? {
            count += 1;
            trace!(from = %record.from, to = %record.to, "read record");
            self.next.pass_on(record)?;
        }
        debug!(records = count, linked = self.next.is_set(), "input exhausted");
        Ok(())
    }

    fn set_successor(&mut self, next: BoxedStage<'a>) {
        self.next.set(next);
    }

    fn name(&self) -> &'static str {
        "READ"
    }
}

/// FILTER - forwards records that satisfy a predicate, drops the rest.
pub struct Filter<'a> {
    predicate: Predicate<'a>,
    next: Successor<'a>,
}

impl<'a> Filter<'a> {
    pub fn new(predicate: impl Fn(&Record) -> bool + 'a) -> Self {
        Self {
            predicate: Box::new(predicate),
            next: Successor::default(),
        }
    }
}

impl<'a> Stage<'a> for Filter<'a> {
    fn process(&mut self, record: Record) -> Result<()> {
        if (self.predicate)(&record) {
            trace!(from = %record.from, to = %record.to, "admitted");
            self.next.pass_on(record)
        } else {
            trace!(from = %record.from, to = %record.to, "filtered out");
            Ok(())
        }
    }

    fn drive(&mut self) -> Result<()> {
        Err(PipelineError::unsupported(self.name(), "drive"))
    }

    fn set_successor(&mut self, next: BoxedStage<'a>) {
        self.next.set(next);
    }

    fn name(&self) -> &'static str {
        "FILTER"
    }
}

/// COPY - forwards each record, then a copy addressed to another recipient.
///
/// Records already addressed to the target pass through alone.
pub struct Duplicate<'a> {
    to: String,
    next: Successor<'a>,
}

impl<'a> Duplicate<'a> {
    pub fn new(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            next: Successor::default(),
        }
    }
}

impl<'a> Stage<'a> for Duplicate<'a> {
    fn process(&mut self, record: Record) -> Result<()> {
        if record.to == self.to {
            trace!(from = %record.from, to = %record.to, "already addressed, not copied");
            return self.next.pass_on(record);
        }

        let mut copy = record.clone();
        copy.to.clone_from(&self.to);
        trace!(from = %record.from, to = %copy.to, "copied");

        // Original first, copy immediately after.
        self.next.pass_on(record)?;
        self.next.pass_on(copy)
    }

    fn drive(&mut self) -> Result<()> {
        Err(PipelineError::unsupported(self.name(), "drive"))
    }

    fn set_successor(&mut self, next: BoxedStage<'a>) {
        self.next.set(next);
    }

    fn name(&self) -> &'static str {
        "COPY"
    }
}

/// SEND - writes each record to an output feed and passes it on.
pub struct Sink<'a, W> {
    output: W,
    next: Successor<'a>,
}

impl<'a, W: Write> Sink<'a, W> {
    pub fn new(output: W) -> Self {
        Self {
            output,
            next: Successor::default(),
        }
    }
}

impl<'a, W: Write + 'a> Stage<'a> for Sink<'a, W> {
    fn process(&mut self, record: Record) -> Result<()> {
        write!(self.output, "{record}")?;
        self.output.flush()?;
        trace!(from = %record.from, to = %record.to, "sent");
        self.next.pass_on(record)
    }

    fn drive(&mut self) -> Result<()> {
        Err(PipelineError::unsupported(self.name(), "drive"))
    }

    fn set_successor(&mut self, next: BoxedStage<'a>) {
        self.next.set(next);
    }

    fn name(&self) -> &'static str {
        "SEND"
    }
}
