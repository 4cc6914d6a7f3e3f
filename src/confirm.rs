use crate::errors::ToolError;
use std::io::{BufRead, Write};

/// Asks the operator before a destructive call.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool, ToolError>;
}

/// Prompts on one stream and reads the answer line from another. Blocks until answered.
pub struct TerminalConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for TerminalConfirm<R, W> {
    fn confirm(&mut self, prompt: &str) -> Result<bool, ToolError> {
        write!(self.output, "{prompt} (y/N): ")?;
        self.output.flush()?;

        let mut answer = String::new();
        // EOF reads as an empty answer, which declines.
        self.input.read_line(&mut answer)?;
        Ok(matches!(
            answer.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    }
}

/// Accepts without asking (`--yes`).
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&mut self, _prompt: &str) -> Result<bool, ToolError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Cursor;

    #[rstest]
    #[case("y\n", true)]
    #[case("YES\n", true)]
    #[case("  y  \n", true)]
    #[case("n\n", false)]
    #[case("\n", false)]
    #[case("", false)]
    #[case("yep\n", false)]
    fn test_terminal_confirm(#[case] input: &str, #[case] expected: bool) {
        let mut output = Vec::new();
        let accepted = TerminalConfirm::new(Cursor::new(input), &mut output)
            .confirm("Proceed?")
            .unwrap();
        assert_eq!(accepted, expected);
        assert_eq!(String::from_utf8(output).unwrap(), "Proceed? (y/N): ");
    }

    #[test]
    fn test_assume_yes() {
        assert!(AssumeYes.confirm("anything").unwrap());
    }
}
