use log::warn;
use std::io::{self, BufRead, Write};

/// Yes/no question put to the operator before a forced purchase.
pub trait Confirmation: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirmation for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Asks on stdout and reads the answer from stdin, repeating until the
/// operator answers y/yes/n/no.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleConfirmation;

impl Confirmation for ConsoleConfirmation {
    fn confirm(&self, prompt: &str) -> bool {
        let stdin = io::stdin();
        let mut reader = stdin.lock();
        ask(prompt, &mut reader, &mut io::stdout())
    }
}

fn ask(prompt: &str, input: &mut impl BufRead, output: &mut impl Write) -> bool {
    loop {
        // Prompt write failures are ignored.
        let _ = write!(output, "{} [y/n]: ", prompt);
        let _ = output.flush();

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) => {
                warn!("No answer on stdin, treating as 'no'");
                return false;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Failed to read confirmation: {}", e);
                return false;
            }
        }

        match line.trim().to_lowercase().as_str() {
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_repeats_until_clear_answer() {
        let mut input = io::Cursor::new("maybe\n\nYES\n");
        let mut output = Vec::new();
        assert!(ask("Proceed?", &mut input, &mut output));
        let printed = String::from_utf8(output).unwrap();
        assert_eq!(printed.matches("Proceed? [y/n]: ").count(), 3);
    }

    #[test]
    fn test_ask_no_and_eof_decline() {
        let mut output = Vec::new();
        assert!(!ask("Proceed?", &mut io::Cursor::new("n\n"), &mut output));
        assert!(!ask("Proceed?", &mut io::Cursor::new(""), &mut output));
    }

    #[test]
    fn test_closures_are_confirmations() {
        let always = |_: &str| true;
        assert!(always.confirm("anything"));
    }
}
