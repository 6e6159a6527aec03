//! Console prompts used by the interactive samples.

use std::{
    io::{self, BufRead, Stdout, Write},
    num::ParseIntError,
    str::FromStr,
};

use zeroize::Zeroizing;

use crate::{cli_bail, error::result::CliResult};

/// Reads answers from `input` after writing questions to `output`.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<io::StdinLock<'static>, Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Write `text` as is.
    pub fn say(&mut self, text: &str) -> CliResult<()> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        Ok(())
    }

    /// Ask `question` and return the answer without its line ending.
    pub fn line(&mut self, question: &str) -> CliResult<String> {
        self.say(question)?;
        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            cli_bail!("no answer to \"{}\"", question.trim());
        }
        Ok(answer.trim_end_matches(['\r', '\n']).to_owned())
    }

    /// Like [`Prompter::line`], refusing empty answers.
    pub fn word(&mut self, question: &str) -> CliResult<String> {
        let answer = self.line(question)?.trim().to_owned();
        if answer.is_empty() {
            cli_bail!("an answer to \"{}\" is required", question.trim());
        }
        Ok(answer)
    }

    pub fn number<T>(&mut self, question: &str) -> CliResult<T>
    where
        T: FromStr<Err = ParseIntError>,
    {
        Ok(self.line(question)?.trim().parse()?)
    }
}

/// The password given on the command line, or one read without echo.
pub fn password(provided: Option<&str>) -> CliResult<Zeroizing<String>> {
    match provided {
        Some(password) => Ok(Zeroizing::new(password.to_owned())),
        None => Ok(Zeroizing::new(rpassword::prompt_password(
            "Crypto Officer Password: ",
        )?)),
    }
}
