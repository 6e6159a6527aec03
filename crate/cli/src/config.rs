use std::{
    fs,
    path::{Path, PathBuf},
};

use luna_p11::SlotSelector;
use serde::Deserialize;

use crate::error::{CliError, result::CliResult};

pub const LUNA_SAMPLES_CONF_ENV: &str = "LUNA_SAMPLES_CONF";

/// Optional settings read from a TOML file.
///
/// ```toml
/// p11_lib = "/usr/safenet/lunaclient/lib/libCryptoki2_64.so"
/// default_slot = "myPartition"
/// ```
///
/// Command line flags and their environment variables take precedence over
/// the file.
#[derive(Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct SamplesConf {
    pub p11_lib: Option<PathBuf>,
    pub default_slot: Option<String>,
}

impl SamplesConf {
    /// Read the file at `path`, or use an empty configuration without one.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::from_toml)
    }

    pub fn from_toml(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            CliError::Configuration(format!(
                "Can't read the configuration file {}: {e}",
                path.display()
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Library path from the command line (or `P11_LIB`), then from the file.
    pub fn p11_lib(&self, from_cli: Option<PathBuf>) -> CliResult<PathBuf> {
        from_cli.or_else(|| self.p11_lib.clone()).ok_or_else(|| {
            CliError::Configuration(
                "P11_LIB environment variable not set. Set it, pass --p11-lib or add p11_lib to \
                 the configuration file.\nExample :-\nexport \
                 P11_LIB=/usr/safenet/lunaclient/lib/libCryptoki2_64.so"
                    .to_owned(),
            )
        })
    }

    /// Slot from the command line, then `default_slot` from the file.
    pub fn slot(&self, from_cli: Option<SlotSelector>) -> CliResult<SlotSelector> {
        if let Some(slot) = from_cli {
            return Ok(slot);
        }
        self.default_slot
            .as_deref()
            .map(|slot| match slot.parse::<SlotSelector>() {
                Ok(selector) => selector,
                Err(never) => match never {},
            })
            .ok_or_else(|| {
                CliError::UserError(
                    "no slot given: pass --slot or set default_slot in the configuration file"
                        .to_owned(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Write, path::PathBuf};

    use luna_p11::SlotSelector;

    use super::SamplesConf;
    use crate::error::CliError;

    #[test]
    fn test_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "p11_lib = \"/usr/safenet/lunaclient/lib/libCryptoki2_64.so\"\ndefault_slot = \"3\""
        )
        .unwrap();
        let conf = SamplesConf::load(Some(file.path())).unwrap();
        assert_eq!(
            conf.p11_lib,
            Some(PathBuf::from("/usr/safenet/lunaclient/lib/libCryptoki2_64.so"))
        );
        assert_eq!(conf.slot(None).unwrap(), SlotSelector::Id(3));

        assert_eq!(SamplesConf::load(None).unwrap(), SamplesConf::default());
    }

    #[test]
    fn test_cli_takes_precedence() {
        let conf = SamplesConf {
            p11_lib: Some(PathBuf::from("/from/file.so")),
            default_slot: Some("partition-a".to_owned()),
        };
        assert_eq!(
            conf.p11_lib(Some(PathBuf::from("/from/cli.so"))).unwrap(),
            PathBuf::from("/from/cli.so")
        );
        assert_eq!(conf.p11_lib(None).unwrap(), PathBuf::from("/from/file.so"));
        assert_eq!(
            conf.slot(Some(SlotSelector::Id(1))).unwrap(),
            SlotSelector::Id(1)
        );
        assert_eq!(
            conf.slot(None).unwrap(),
            SlotSelector::Label("partition-a".to_owned())
        );
    }

    #[test]
    fn test_missing_values() {
        let conf = SamplesConf::default();
        let err = conf.p11_lib(None).unwrap_err();
        assert!(err.to_string().starts_with("P11_LIB environment variable not set"));
        assert!(conf.slot(None).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "p11_library = 3").unwrap();
        let err = SamplesConf::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().starts_with("Config TOML malformed"));
        assert!(matches!(err, CliError::TomlError(_)));
        assert!(err.source().is_some());

        let err = SamplesConf::load(Some("/nonexistent/luna.toml".as_ref())).unwrap_err();
        assert!(err.to_string().starts_with("Can't read the configuration file"));
    }
}
