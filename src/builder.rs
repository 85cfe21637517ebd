//! Declarative assembly of a stage chain.
//!
//! Stages are appended in declaration order and linked in one backward
//! pass when the builder is finalized. `build` consumes the builder, so a
//! finalized builder cannot be appended to or built again.

use std::io::{BufRead, Write};

use tracing::debug;

use crate::record::Record;
use crate::stage::{BoxedStage, Duplicate, Filter, Sink, Source};

/// Builds a mail pipeline whose head is a `Source` reading `input`.
///
/// # Example
///
/// ```
/// use mail_pipe::PipelineBuilder;
///
/// let input = "a@example.com\nb@example.com\nhi\n";
/// let mut output: Vec<u8> = Vec::new();
///
/// let mut pipeline = PipelineBuilder::new(input.as_bytes())
///     .filter_by(|r| r.from == "a@example.com")
///     .copy_to("c@example.com")
///     .send(&mut output)
///     .build();
/// pipeline.drive().unwrap();
/// drop(pipeline);
///
/// assert_eq!(output.len(), 2 * input.len());
/// ```
pub struct PipelineBuilder<'a> {
    source: BoxedStage<'a>,
    stages: Vec<BoxedStage<'a>>,
}

impl<'a> PipelineBuilder<'a> {
    /// Start a pipeline reading three-line records from `input`.
    pub fn new<R: BufRead + 'a>(input: R) -> Self {
        Self {
            source: Box::new(Source::new(input)),
            stages: Vec::new(),
        }
    }

    /// Append a stage that forwards only records satisfying `predicate`.
    pub fn filter_by(mut self, predicate: impl Fn(&Record) -> bool + 'a) -> Self {
        self.stages.push(Box::new(Filter::new(predicate)));
        self
    }

    /// Append a stage that also sends a copy of each record to `recipient`.
    pub fn copy_to(mut self, recipient: impl Into<String>) -> Self {
        self.stages.push(Box::new(Duplicate::new(recipient)));
        self
    }

    /// Append a stage that writes each record to `output`.
    pub fn send<W: Write + 'a>(mut self, output: W) -> Self {
        self.stages.push(Box::new(Sink::new(output)));
        self
    }

    /// Number of stages declared so far, including the source.
    pub fn stage_count(&self) -> usize {
        self.stages.len() + 1
    }

    /// Link every stage to its successor and return the chain head.
    ///
    /// The returned stage is the source; call `drive` on it once to run
    /// the whole pipeline.
    pub fn build(mut self) -> BoxedStage<'a> {
        let count = self.stage_count();
        let mut tail: Option<BoxedStage<'a>> = None;

        while let Some(mut stage) = self.stages.pop() {
            if let Some(next) = tail.take() {
                stage.set_successor(next);
            }
            tail = Some(stage);
        }

        let mut head = self.source;
        if let Some(next) = tail {
            head.set_successor(next);
        }

        debug!(stages = count, "pipeline linked");
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    const SANITY_INPUT: &str = "erich@example.com
richard@example.com
Hello there
erich@example.com
ralph@example.com
Are you sure you pressed the right button?
ralph@example.com
erich@example.com
I do not make mistakes of that kind
";

    fn run(builder: PipelineBuilder<'_>) {
        let mut pipeline = builder.build();
        pipeline.drive().unwrap();
    }

    #[test]
    fn test_sanity_pipeline() {
        let mut output = Vec::new();
        run(PipelineBuilder::new(SANITY_INPUT.as_bytes())
            .filter_by(|r| r.from == "erich@example.com")
            .copy_to("richard@example.com")
            .send(&mut output));

        let expected = "erich@example.com
richard@example.com
Hello there
erich@example.com
ralph@example.com
Are you sure you pressed the right button?
erich@example.com
richard@example.com
Are you sure you pressed the right button?
";
        assert_eq!(String::from_utf8(output).unwrap(), expected);
    }

    #[test]
    fn test_short_scenario() {
        let input = "A\nB\nhi\nA\nC\n?\nC\nA\nok\n";
        let mut output = Vec::new();
        run(PipelineBuilder::new(input.as_bytes())
            .filter_by(|r| r.from == "A")
            .copy_to("B")
            .send(&mut output));
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "A\nB\nhi\nA\nC\n?\nA\nB\n?\n"
        );
    }

    #[test]
    fn test_source_only_emits_nothing() {
        let builder = PipelineBuilder::new(SANITY_INPUT.as_bytes());
        assert_eq!(builder.stage_count(), 1);
        let mut pipeline = builder.build();
        assert_eq!(pipeline.name(), "READ");
        assert!(pipeline.drive().is_ok());
    }

    #[test]
    fn test_declaration_order_is_pipeline_order() {
        // Copy before filter: the copy addressed to "B" is filtered out too.
        let input = "A\nC\nx\n";
        let mut output = Vec::new();
        run(PipelineBuilder::new(input.as_bytes())
            .copy_to("B")
            .filter_by(|r| r.to != "B")
            .send(&mut output));
        assert_eq!(String::from_utf8(output).unwrap(), "A\nC\nx\n");
    }

    #[test]
    fn test_order_preserved_without_copy() {
        let input = "1\nz\na\n2\nz\nb\n3\nz\nc\n4\nz\nd\n";
        let mut output = Vec::new();
        run(PipelineBuilder::new(input.as_bytes())
            .filter_by(|r| r.from != "2")
            .filter_by(|r| r.from != "4")
            .send(&mut output));
        assert_eq!(String::from_utf8(output).unwrap(), "1\nz\na\n3\nz\nc\n");
    }

    #[test]
    fn test_sink_in_middle_passes_records_on() {
        let input = "A\nC\nx\n";
        let mut first = Vec::new();
        let mut second = Vec::new();
        run(PipelineBuilder::new(input.as_bytes())
            .send(&mut first)
            .copy_to("B")
            .send(&mut second));
        assert_eq!(String::from_utf8(first).unwrap(), "A\nC\nx\n");
        assert_eq!(String::from_utf8(second).unwrap(), "A\nC\nx\nA\nB\nx\n");
    }

    #[test]
    fn test_chain_head_rejects_process() {
        let mut pipeline = PipelineBuilder::new("".as_bytes()).build();
        let err = pipeline.process(Record::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Unsupported { .. }));
    }
}
