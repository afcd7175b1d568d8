use std::{collections::HashMap, fmt::Display, io::Write};

use colored::{Color, Colorize};

use super::StepName;

const COLORS: [Color; 6] = [
    Color::Blue,
    Color::Magenta,
    Color::Green,
    Color::Yellow,
    Color::Cyan,
    Color::BrightBlue,
];

/// Prints a status message that isn't tied to any one step
pub fn notice(message: impl Display) {
    println!("\n\t{} {message}\n", "ℹ".blue());
}

pub fn build_step_outputs(steps: &[StepName]) -> HashMap<StepName, StepOutput> {
    let max_step_len = steps
        .iter()
        .map(|step| step.as_str().len())
        .max()
        .unwrap_or_default();

    let mut colors = COLORS.iter().cycle();

    steps
        .iter()
        .map(|step| {
            (
                *step,
                StepOutput::new(
                    *step,
                    max_step_len,
                    *colors
                        .next()
                        .expect("an infinite iterator to always return an item on next"),
                ),
            )
        })
        .collect()
}

/// Console output for a single step, with every line prefixed by the step name
pub struct StepOutput {
    stdout: AnnotatedWrite<std::io::Stdout>,
    stderr: AnnotatedWrite<std::io::Stderr>,
}

impl StepOutput {
    fn new(step: StepName, width: usize, color: Color) -> StepOutput {
        let annotation = format!("{:>width$} | ", step.as_str(), width = width)
            .color(color)
            .to_string();

        StepOutput {
            stdout: AnnotatedWrite::new(annotation.clone(), std::io::stdout()),
            stderr: AnnotatedWrite::new(annotation, std::io::stderr()),
        }
    }

    /// Output for a step that runs outside of a full build
    pub fn standalone(step: StepName) -> StepOutput {
        let index = match step {
            StepName::Clean => 0,
            StepName::Asset(kind) => kind as usize + 1,
            StepName::Finish => 5,
        };
        StepOutput::new(step, step.as_str().len(), COLORS[index % COLORS.len()])
    }

    pub fn line(&mut self, message: impl Display) {
        if let Err(e) = writeln!(self.stdout, "{message}") {
            tracing::warn!("Couldn't write step output: {e}");
        }
    }

    pub fn error(&mut self, message: impl Display) {
        let message = format!("{message}").red();
        if let Err(e) = writeln!(self.stderr, "{message}") {
            tracing::warn!("Couldn't write step output: {e}");
        }
    }
}

struct AnnotatedWrite<W> {
    annotation: String,
    inner: W,
    next_needs_annotated: bool,
}

impl<W> AnnotatedWrite<W> {
    fn new(annotation: impl Into<String>, inner: W) -> AnnotatedWrite<W> {
        AnnotatedWrite {
            annotation: annotation.into(),
            inner,
            next_needs_annotated: true,
        }
    }
}

impl<W> std::io::Write for AnnotatedWrite<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes_used = 0;
        if self.next_needs_annotated {
            self.next_needs_annotated = false;
            self.inner.write_all(self.annotation.as_bytes())?;
        }
        let mut chunks = buf.split_inclusive(|c| *c == b'\n').peekable();
        while let Some(chunk) = chunks.next() {
            self.inner.write_all(chunk)?;
            bytes_used += chunk.len();
            if chunks.peek().is_some() {
                self.inner.write_all(self.annotation.as_bytes())?;
            } else if chunk.ends_with(b"\n") {
                self.next_needs_annotated = true;
            }
        }
        Ok(bytes_used)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_annotates_every_line() {
        let mut write = AnnotatedWrite::new("styles | ", Vec::new());

        write!(write, "one\ntwo\n").unwrap();
        write!(write, "thr").unwrap();
        write!(write, "ee\n").unwrap();

        assert_eq!(
            String::from_utf8(write.inner).unwrap(),
            "styles | one\nstyles | two\nstyles | three\n"
        );
    }

    #[test]
    fn test_build_step_outputs_covers_every_step() {
        let steps = [StepName::Clean, StepName::Finish];

        let outputs = build_step_outputs(&steps);

        assert_eq!(outputs.len(), 2);
        assert!(outputs.contains_key(&StepName::Finish));
    }
}
