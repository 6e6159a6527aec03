use std::num::{ParseIntError, TryFromIntError};

use luna_p11::P11Error;
use thiserror::Error;

pub mod result;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    Default(String),
    #[error(transparent)]
    FromHexError(#[from] hex::FromHexError),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("invalid number: {0}")]
    ParseIntError(#[from] ParseIntError),
    #[error(transparent)]
    P11Error(#[from] P11Error),
    #[error("Config TOML malformed: {0}")]
    TomlError(#[from] toml::de::Error),
    #[error(transparent)]
    TryFromIntError(#[from] TryFromIntError),
    #[error("invalid options: {0}")]
    UserError(String),
}

impl CliError {
    /// The PKCS#11 return value behind this error, if it came from the library.
    #[must_use]
    pub const fn rv(&self) -> Option<luna_p11::sys::CK_RV> {
        match self {
            Self::P11Error(e) => e.rv(),
            _ => None,
        }
    }
}

/// Return early with an error if a condition is not satisfied.
///
/// This macro is equivalent to `if !$cond { return Err(From::from($err)); }`.
#[macro_export]
macro_rules! cli_ensure {
    ($cond:expr, $msg:literal $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::cli_error!($msg));
        }
    };
    ($cond:expr, $err:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($err);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            return ::core::result::Result::Err($crate::cli_error!($fmt, $($arg)*));
        }
    };
}

/// Construct a CLI error from a string.
#[macro_export]
macro_rules! cli_error {
    ($msg:literal) => {
        $crate::error::CliError::Default(::core::format_args!($msg).to_string())
    };
    ($err:expr $(,)?) => ({
        $crate::error::CliError::Default($err.to_string())
    });
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::CliError::Default(::core::format_args!($fmt, $($arg)*).to_string())
    };
}

/// Return early with an error.
#[macro_export]
macro_rules! cli_bail {
    ($msg:literal) => {
        return ::core::result::Result::Err($crate::cli_error!($msg))
    };
    ($err:expr $(,)?) => {
        return ::core::result::Result::Err($err)
    };
    ($fmt:expr, $($arg:tt)*) => {
        return ::core::result::Result::Err($crate::cli_error!($fmt, $($arg)*))
    };
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use luna_p11::{P11Error, sys::CKR_PIN_INCORRECT};

    use super::CliError;
    use crate::error::result::CliResult;

    #[test]
    fn test_cli_error_interpolation() {
        let var = 42;
        let err = cli_error!("interpolate {var}");
        assert_eq!("interpolate 42", err.to_string());

        let err = bail();
        match err {
            Err(e) => assert_eq!("interpolate 43", e.to_string()),
            Ok(()) => panic!("expected error"),
        }

        let err = ensure();
        match err {
            Err(e) => assert_eq!("interpolate 44", e.to_string()),
            Ok(()) => panic!("expected error"),
        }
    }

    fn bail() -> CliResult<()> {
        let var = 43;
        if true {
            cli_bail!("interpolate {var}");
        }
        Ok(())
    }

    fn ensure() -> CliResult<()> {
        let var = 44;
        cli_ensure!(false, "interpolate {var}");
        Ok(())
    }

    #[test]
    fn library_errors_keep_their_return_code() {
        let err = CliError::from(P11Error::Pkcs11 {
            context: "Failed logging in".to_owned(),
            function: "C_Login",
            rv: CKR_PIN_INCORRECT,
        });
        assert_eq!(err.rv(), Some(CKR_PIN_INCORRECT));
        assert_eq!(cli_error!("plain").rv(), None);
    }
}
