//! Terminal collaborators: user-facing output and single-character prompts.
use crate::error::{ClientError, Result};
use console::Term;
use std::io::BufRead;

/// Characters accepted by yes/no questions.
pub const YES_NO: &str = "ynYN";

/// Only `y`/`Y` count as yes; anything else is no.
pub fn is_affirmative(answer: char) -> bool {
    matches!(answer, 'y' | 'Y')
}

/// Reads answers from the user.
pub trait Prompt {
    /// Ask `question` until one of `allowed` is typed.
    fn read_character(&mut self, question: &str, allowed: &str) -> Result<char>;

    /// Ask `question` and return the typed line.
    fn ask(&mut self, question: &str) -> Result<String>;

    /// Whether a person can answer questions.
    fn can_interact(&self) -> bool;
}

/// Sink for the user transcript.
pub trait Output {
    fn println(&mut self, line: &str);
}

/// Prompts on the controlling terminal; falls back to line-buffered stdin
/// when stdin is not a terminal so answers can be piped in.
pub struct ConsolePrompt {
    term: Term,
}

impl ConsolePrompt {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }

    fn read_piped_line(&self) -> Result<String> {
        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(ClientError::Prompt)?;
        if read == 0 {
            return Err(ClientError::Prompt(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stdin closed before an answer was given",
            )));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Default for ConsolePrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompt for ConsolePrompt {
    fn read_character(&mut self, question: &str, allowed: &str) -> Result<char> {
        loop {
            self.term.write_str(question).map_err(ClientError::Prompt)?;
            let answer = if self.term.is_term() {
                let ch = self.term.read_char().map_err(ClientError::Prompt)?;
                self.term.write_line("").map_err(ClientError::Prompt)?;
                Some(ch)
            } else {
                self.read_piped_line()?.chars().next()
            };
            if let Some(ch) = answer.filter(|ch| allowed.contains(*ch)) {
                return Ok(ch);
            }
        }
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.term.write_str(question).map_err(ClientError::Prompt)?;
        if self.term.is_term() {
            self.term.read_line().map_err(ClientError::Prompt)
        } else {
            self.read_piped_line()
        }
    }

    fn can_interact(&self) -> bool {
        self.term.is_term() || console::user_attended()
    }
}

/// Writes the transcript to stdout.
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn println(&mut self, line: &str) {
        println!("{line}");
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedPrompt;
    use super::*;

    #[test]
    fn only_lower_and_upper_y_are_affirmative() {
        assert!(is_affirmative('y'));
        assert!(is_affirmative('Y'));
        assert!(!is_affirmative('n'));
        assert!(!is_affirmative('N'));
        assert!(!is_affirmative('x'));
    }

    #[test]
    fn characters_outside_the_allowed_set_are_asked_again() {
        let mut prompt = ScriptedPrompt::answering(&["x", "", "N"]);
        let answer = prompt
            .read_character("Confirm [Y]es/[N]o: ", YES_NO)
            .expect("answer");
        assert_eq!(answer, 'N');
        assert_eq!(prompt.questions.len(), 3);
    }
}
