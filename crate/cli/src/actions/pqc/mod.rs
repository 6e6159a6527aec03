//! Post-quantum samples: ML-DSA signatures, ML-KEM encapsulation and the
//! wrapping of their private keys.

use std::io::{BufRead, Write};

use luna_p11::{MlDsaParameterSet, MlKemParameterSet, PqcKeyType};

use crate::{error::result::CliResult, prompt::Prompter};

mod ml_dsa;
mod ml_kem;
mod wrap;

pub use ml_dsa::{
    ExtMuMlDsaAction, HashMlDsaAction, MlDsaAction, MlDsaKeyPairGenAction, MlDsaSha3_256Action,
};
pub use ml_kem::{MlKemAction, MlKemKeyPairGenAction};
pub use wrap::{UnwrapPqcPrivateKeyAction, WrapPqcPrivateKeyAction};

/// Labels of a generated pair: `<base>-prvkey` and `<base>-pubkey`.
pub(crate) fn pair_labels(base: &str) -> (String, String) {
    (format!("{base}-prvkey"), format!("{base}-pubkey"))
}

pub(crate) fn ask_ml_dsa_parameter<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> CliResult<MlDsaParameterSet> {
    prompter.say(
        "  --> ML-DSA parameter\n      - 1. MLDSA-44\n      - 2. MLDSA-65\n      - 3. MLDSA-87\n",
    )?;
    let choice = prompter.number("      : ")?;
    Ok(MlDsaParameterSet::from_choice(choice)?)
}

pub(crate) fn ask_ml_kem_parameter<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
) -> CliResult<MlKemParameterSet> {
    prompter.say(
        "  --> ML-KEM parameter\n      - MLKEM-512 ...... 1\n      - MLKEM-768 ...... 2\n      - \
         MLKEM-1024 ..... 3\n",
    )?;
    let choice = prompter.number("        Parameter : ")?;
    Ok(MlKemParameterSet::from_choice(choice)?)
}

pub(crate) fn ask_pqc_key_type<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    question: &str,
) -> CliResult<PqcKeyType> {
    prompter.say(question)?;
    prompter.say("  --> 1. ML-DSA.\n  --> 2. ML-KEM.\n")?;
    let choice = prompter.number("      Key type : ")?;
    Ok(PqcKeyType::from_choice(choice)?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use luna_p11::{MlDsaParameterSet, MlKemParameterSet, PqcKeyType};

    use super::{ask_ml_dsa_parameter, ask_ml_kem_parameter, ask_pqc_key_type, pair_labels};
    use crate::prompt::Prompter;

    #[test]
    fn test_pair_labels() {
        assert_eq!(
            pair_labels("pqc"),
            ("pqc-prvkey".to_owned(), "pqc-pubkey".to_owned())
        );
    }

    #[test]
    fn test_parameter_menus() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("2\n"), &mut output);
        assert_eq!(
            ask_ml_dsa_parameter(&mut prompter).unwrap(),
            MlDsaParameterSet::MlDsa65
        );
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("- 3. MLDSA-87"));

        let mut prompter = Prompter::new(Cursor::new("3\n"), Vec::new());
        assert_eq!(
            ask_ml_kem_parameter(&mut prompter).unwrap(),
            MlKemParameterSet::MlKem1024
        );

        let mut prompter = Prompter::new(Cursor::new("4\n"), Vec::new());
        assert!(ask_ml_kem_parameter(&mut prompter).is_err());
    }

    #[test]
    fn test_key_type_menu() {
        let mut prompter = Prompter::new(Cursor::new("2\n"), Vec::new());
        assert_eq!(
            ask_pqc_key_type(&mut prompter, "\n> Key to search for : \n").unwrap(),
            PqcKeyType::MlKem
        );
        let mut prompter = Prompter::new(Cursor::new("x\n"), Vec::new());
        assert!(ask_pqc_key_type(&mut prompter, "").is_err());
    }
}
