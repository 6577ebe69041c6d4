use std::io::{BufRead, Write};

use crate::io::journal_io::{Prompt, Selection};

/// Line-based prompting over any reader/writer pair (stdin/stdout in the binary).
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        ConsolePrompt { input, output }
    }

    /// Print `question` and read one trimmed line. `None` on end of input.
    pub fn ask(&mut self, question: &str) -> Option<String> {
        let _ = write!(self.output, "{}", question);
        let _ = self.output.flush();
        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    /// Yes/no question; anything but `y`/`yes` is a no.
    pub fn confirm(&mut self, question: &str) -> bool {
        self.ask(question)
            .is_some_and(|answer| matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Prompt for ConsolePrompt<R, W> {
    fn present(&mut self, options: &[String]) {
        let _ = writeln!(self.output);
        for (i, option) in options.iter().enumerate() {
            let _ = writeln!(self.output, " {}) {}", i + 1, option);
        }
    }

    fn read_selection(&mut self) -> Selection {
        match self.ask("Task to complete (q to quit): ") {
            Some(answer) => parse_selection(&answer),
            None => Selection::Quit,
        }
    }

    fn notify(&mut self, message: &str) {
        let _ = writeln!(self.output, "{}", message);
    }
}

pub fn parse_selection(input: &str) -> Selection {
    let input = input.trim();
    if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
        return Selection::Quit;
    }
    match input.parse::<usize>() {
        Ok(n) => Selection::Task(n),
        Err(_) => Selection::Invalid(input.to_string()),
    }
}
