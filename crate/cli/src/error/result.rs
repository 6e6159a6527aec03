use std::fmt::Display;

use super::CliError;

pub type CliResult<R> = Result<R, CliError>;

/// Turn library and I/O failures, or a missing value, into a [`CliError`]
/// prefixed with what the sample was doing.
pub trait CliResultHelper<T> {
    fn context(self, context: &str) -> CliResult<T>;

    /// Like [`CliResultHelper::context`], built only on failure.
    fn with_context<D, O>(self, op: O) -> CliResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D;
}

impl<T, E> CliResultHelper<T> for Result<T, E>
where
    E: std::error::Error,
{
    fn context(self, context: &str) -> CliResult<T> {
        self.map_err(|e| CliError::Default(format!("{context}: {e}")))
    }

    fn with_context<D, O>(self, op: O) -> CliResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D,
    {
        self.map_err(|e| CliError::Default(format!("{}: {e}", op())))
    }
}

impl<T> CliResultHelper<T> for Option<T> {
    fn context(self, context: &str) -> CliResult<T> {
        self.ok_or_else(|| CliError::Default(context.to_owned()))
    }

    fn with_context<D, O>(self, op: O) -> CliResult<T>
    where
        D: Display + Send + Sync + 'static,
        O: FnOnce() -> D,
    {
        self.ok_or_else(|| CliError::Default(format!("{}", op())))
    }
}

#[cfg(test)]
mod tests {
    use super::CliResultHelper;

    #[test]
    fn context_prefixes_the_error() {
        let res: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = res.context("Failed reading extracted.sim").unwrap_err();
        assert_eq!(err.to_string(), "Failed reading extracted.sim: boom");

        let none: Option<u8> = None;
        let err = none.with_context(|| "Base key [ kek ], not found.").unwrap_err();
        assert_eq!(err.to_string(), "Base key [ kek ], not found.");
    }
}
