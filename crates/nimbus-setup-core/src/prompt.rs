//! Terminal interaction: messages to the operator and line-based questions.

use std::io::{BufRead, Write};

use nimbus_setup_common::error::{Result, SetupError};

/// Repeated when a required question gets an empty answer.
pub const EMPTY_ANSWER_MESSAGE: &str = "Invalid input. You must specify a value. Or hit Ctrl-C to give up.";

/// Channel to the operator.
pub trait Prompter {
    /// Shows `text` followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn say(&mut self, text: &str) -> Result<()>;

    /// Shows `prompt` and reads one line. Returns `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt cannot be written or the input read.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// [`Prompter`] over a reader and a writer, normally standard input and
/// standard output.
#[derive(Debug)]
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Creates a prompter reading from `input` and writing to `output`.
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompter on the process's standard streams.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

fn stdout_error(e: std::io::Error) -> SetupError {
    SetupError::io("<stdout>", e)
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{text}").map_err(stdout_error)
    }

    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{prompt}").map_err(stdout_error)?;
        self.output.flush().map_err(stdout_error)?;
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|e| SetupError::io("<stdin>", e))?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// Asks for `label`, offering `default`.
///
/// A non-empty answer is returned trimmed. An empty answer takes the default
/// when there is one. Otherwise a required question is asked again and an
/// optional one yields `None`.
///
/// # Errors
///
/// Returns [`SetupError::InvalidInput`] if the input ends before an answer is
/// given, or an I/O error from the prompter.
pub fn get_user_input<P: Prompter + ?Sized>(
    prompter: &mut P,
    label: &str,
    default: Option<&str>,
    required: bool,
) -> Result<Option<String>> {
    let default = default.filter(|d| !d.is_empty());
    let prompt = default.map_or_else(|| format!("{label}: "), |d| format!("{label} ({d}): "));

    loop {
        let Some(line) = prompter.read_line(&prompt)? else {
            return Err(SetupError::invalid_input(format!(
                "input ended while waiting for {label}"
            )));
        };
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(Some(answer.to_owned()));
        }
        if let Some(default) = default {
            return Ok(Some(default.to_owned()));
        }
        if !required {
            return Ok(None);
        }
        prompter.say(EMPTY_ANSWER_MESSAGE)?;
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn ask(input: &str, default: Option<&str>, required: bool) -> (Result<Option<String>>, String) {
        let mut output = Vec::new();
        let result = {
            let mut prompter = TerminalPrompter::new(Cursor::new(input.as_bytes()), &mut output);
            get_user_input(&mut prompter, "Hostname", default, required)
        };
        (result, String::from_utf8(output).unwrap())
    }

    #[test]
    fn answer_is_trimmed() {
        let (answer, out) = ask("  cloud.example.org \n", Some("guess"), true);
        assert_eq!(answer.unwrap().as_deref(), Some("cloud.example.org"));
        assert_eq!(out, "Hostname (guess): ");
    }

    #[test]
    fn enter_accepts_default() {
        let (answer, _) = ask("\n", Some("guess.example.org"), true);
        assert_eq!(answer.unwrap().as_deref(), Some("guess.example.org"));
    }

    #[test]
    fn required_question_repeats_on_empty_answer() {
        let (answer, out) = ask("\n\nfinally\n", None, true);
        assert_eq!(answer.unwrap().as_deref(), Some("finally"));
        assert_eq!(out.matches(EMPTY_ANSWER_MESSAGE).count(), 2);
    }

    #[test]
    fn optional_question_may_be_skipped() {
        let (answer, _) = ask("\n", None, false);
        assert_eq!(answer.unwrap(), None);
    }

    #[test]
    fn end_of_input_is_invalid_input() {
        let (answer, _) = ask("", None, true);
        let err = answer.unwrap_err();
        assert!(matches!(err, SetupError::InvalidInput { .. }));
    }
}
