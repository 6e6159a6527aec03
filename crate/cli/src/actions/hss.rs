//! Stateful hash based signatures (HSS/LMS).
//!
//! An HSS private key can only produce a bounded number of signatures, the
//! HSM reports how many are left in `CKA_HSS_KEYS_REMAINING`.

use std::{
    io::{BufRead, Write},
    path::PathBuf,
};

use clap::Parser;
use luna_p11::{
    HSS_MAX_LEVELS, LmotsType, LmsType, Mechanism, Template,
    sys::{
        CK_ULONG, CKA_DECRYPT, CKA_DERIVE, CKA_ENCRYPT, CKA_EXTRACTABLE, CKA_ID,
        CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN, CKA_UNWRAP, CKA_VERIFY,
        CKO_PRIVATE_KEY, CKO_PUBLIC_KEY,
    },
    vendor::{
        CKA_HSS_KEYS_REMAINING, CKA_HSS_LEVELS, CKA_HSS_LMOTS_TYPES, CKA_HSS_LMS_TYPES, CKK_HSS,
        CKR_KEY_EXHAUSTED,
    },
};
use strum::IntoEnumIterator;

use crate::{
    SamplesContext,
    actions::{
        pqc::pair_labels,
        shared::{
            Connection, SlotArgs, print_hex, read_bounded_file, read_bytes_from_file,
            with_appended_extension, write_bytes_to_file,
        },
    },
    cli_bail, cli_ensure,
    error::result::{CliResult, CliResultHelper},
    prompt::Prompter,
};

/// Largest file the HSS samples sign or verify.
const MAX_DATA_LEN: usize = 32 * 1024;

/// One LMS tree and its one-time signature scheme per HSS level.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HssTree {
    lms: Vec<LmsType>,
    lmots: Vec<LmotsType>,
}

impl HssTree {
    fn levels(&self) -> usize {
        self.lms.len()
    }

    fn lms_values(&self) -> Vec<CK_ULONG> {
        self.lms.iter().map(|t| t.value()).collect()
    }

    fn lmots_values(&self) -> Vec<CK_ULONG> {
        self.lmots.iter().map(|t| t.value()).collect()
    }
}

fn menu<T: std::fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items
        .enumerate()
        .map(|(i, item)| format!("\t{:<40} [{}]\n", item.to_string(), i + 1))
        .collect()
}

fn ask_hss_tree<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> CliResult<HssTree> {
    let levels: usize = prompter.number("\n> Enter HSS Level (1-8) : ")?;
    cli_ensure!(
        (1..=HSS_MAX_LEVELS).contains(&levels),
        "Invalid HSS Level: {levels}"
    );
    let mut tree = HssTree {
        lms: Vec::with_capacity(levels),
        lmots: Vec::with_capacity(levels),
    };
    for level in 1..=levels {
        prompter.say(&format!(
            "\n --> Select LMS type to use for HSS-TREE {level} of {levels}\n{}",
            menu(LmsType::iter())
        ))?;
        tree.lms
            .push(LmsType::from_choice(prompter.number("\tTYPE > : ")?)?);
        prompter.say(&format!(
            "\n --> Select LMOTS type to use for HSS-TREE {level} of {levels}\n{}",
            menu(LmotsType::iter())
        ))?;
        tree.lmots
            .push(LmotsType::from_choice(prompter.number("\tTYPE > : ")?)?);
    }
    Ok(tree)
}

fn hss_templates(
    tree: &HssTree,
    token: bool,
    private_label: &str,
    public_label: &str,
) -> CliResult<(Template, Template)> {
    let private = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_MODIFIABLE, false)
        .bool(CKA_EXTRACTABLE, false)
        .bool(CKA_DECRYPT, false)
        .bool(CKA_SIGN, true)
        .bool(CKA_DERIVE, false)
        .bool(CKA_UNWRAP, false)
        .ulong(CKA_HSS_LEVELS, CK_ULONG::try_from(tree.levels())?)
        .ulongs(CKA_HSS_LMS_TYPES, &tree.lms_values())
        .ulongs(CKA_HSS_LMOTS_TYPES, &tree.lmots_values())
        .label(private_label);
    let public = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_MODIFIABLE, false)
        .bool(CKA_ENCRYPT, false)
        .bool(CKA_VERIFY, true)
        .bool(CKA_DERIVE, false)
        .label(public_label);
    Ok((public, private))
}

fn hss_token_key(class: luna_p11::sys::CK_OBJECT_CLASS, label: &str) -> Template {
    Template::new()
        .bool(CKA_TOKEN, true)
        .class(class)
        .key_type(CKK_HSS)
        .label(label)
}

/// Generate an HSS key pair labelled `<LABEL>-prvkey` / `<LABEL>-pubkey`.
///
/// The label, the number of levels and the LMS and LM-OTS types of every
/// level are prompted for.
#[derive(Parser, Debug)]
pub struct HssKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Store the keys on the token instead of the session
    #[arg(long, default_value = "false")]
    token: bool,
}

impl HssKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let mut prompter = Prompter::stdio();
        let label = prompter.word("\n> Enter HSS Keypair label : ")?;
        let tree = ask_hss_tree(&mut prompter)?;

        let (private_label, public_label) = pair_labels(&label);
        let (public, private) = hss_templates(&tree, self.token, &private_label, &public_label)?;
        let keys = connection.generate_key_pair(&Mechanism::HssKeyPairGen, &public, &private)?;
        println!("\n> HSS keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);
        connection.disconnect();
        Ok(())
    }
}

/// Sign a file of at most 32KB with an HSS token private key.
///
/// The signature is written to `<FILE>.sig`.
#[derive(Parser, Debug)]
pub struct HssSignAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// File to sign
    #[arg(required = true)]
    file: PathBuf,
}

impl HssSignAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let data = read_bounded_file(&self.file, MAX_DATA_LEN)?;
        println!("\n> Reading file : {}.", self.file.display());

        let connection = Connection::open(ctx, &self.slot)?;
        let label = Prompter::stdio().word("\n> Please input your HSS Private key Label : ")?;
        let private_key = connection
            .find_first(&hss_token_key(CKO_PRIVATE_KEY, &label))?
            .with_context(|| format!("Signing key {label} not found."))?;

        let remaining = connection.get_ulong_attribute(private_key, CKA_HSS_KEYS_REMAINING)?;
        println!("  --> HSS KEYS REMAINING : {remaining}.");
        print_hex("CKA ID", &connection.get_bytes_attribute(private_key, CKA_ID)?);

        let signature = match connection.sign(&Mechanism::Hss, private_key, &data) {
            Ok(signature) => signature,
            Err(e) if e.rv() == Some(CKR_KEY_EXHAUSTED) => {
                cli_bail!("C_Sign failed with CKR_KEY_EXHAUSTED.")
            }
            Err(e) => return Err(e.into()),
        };
        println!("\n> File signed.");

        let signature_file = with_appended_extension(&self.file, "sig");
        write_bytes_to_file(&signature, &signature_file)?;
        println!("\n> Signature written to file : {}.", signature_file.display());
        connection.disconnect();
        Ok(())
    }
}

/// Verify the HSS signature of a file with a token public key
#[derive(Parser, Debug)]
pub struct HssVerifyAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Signed file
    #[arg(required = true)]
    file: PathBuf,

    /// Signature file, as written by `hss-sign`
    #[arg(required = true)]
    signature_file: PathBuf,
}

impl HssVerifyAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        println!("\n> Reading files:");
        let data = read_bounded_file(&self.file, MAX_DATA_LEN)?;
        println!("  --> Datafile : {}.", self.file.display());
        let signature = read_bytes_from_file(&self.signature_file)?;
        println!("  --> Signature file : {}.", self.signature_file.display());

        let connection = Connection::open(ctx, &self.slot)?;
        let label = Prompter::stdio().word("\n> Please input your HSS Public key Label : ")?;
        let public_key = connection
            .find_first(&hss_token_key(CKO_PUBLIC_KEY, &label))?
            .with_context(|| format!("Public key {label} not found."))?;

        let verified = connection.verify(&Mechanism::Hss, public_key, &data, &signature)?;
        cli_ensure!(verified, "Signature verification failed.");
        println!("\n> Signature verified.");
        connection.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use luna_p11::{LmotsType, LmsType, vendor::CKA_HSS_LMS_TYPES};
    use strum::IntoEnumIterator;

    use super::{HssTree, ask_hss_tree, hss_templates, menu};
    use crate::prompt::Prompter;

    #[test]
    fn test_two_level_tree() {
        let mut output = Vec::new();
        let mut prompter = Prompter::new(Cursor::new("2\n1\n1\n4\n8\n"), &mut output);
        let tree = ask_hss_tree(&mut prompter).unwrap();
        assert_eq!(
            tree,
            HssTree {
                lms: vec![LmsType::LmsSha256M32H5, LmsType::LmsSha256M24H5],
                lmots: vec![LmotsType::LmotsSha256N32W1, LmotsType::LmotsSha256N24W8],
            }
        );
        assert_eq!(tree.lms_values(), vec![0x05, 0x0A]);
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("HSS-TREE 2 of 2"));
    }

    #[test]
    fn test_invalid_levels() {
        for input in ["0\n", "9\n", "two\n"] {
            let mut prompter = Prompter::new(Cursor::new(input), Vec::new());
            assert!(ask_hss_tree(&mut prompter).is_err(), "{input:?} was accepted");
        }
        let mut prompter = Prompter::new(Cursor::new("1\n7\n"), Vec::new());
        assert!(ask_hss_tree(&mut prompter).is_err());
    }

    #[test]
    fn test_menu_is_one_based() {
        let text = menu(LmsType::iter());
        assert!(text.starts_with("\tLMS_SHA256_M32_H5"));
        assert!(text.trim_end().ends_with("[6]"));
    }

    #[test]
    fn test_templates_carry_the_tree() {
        let tree = HssTree {
            lms: vec![LmsType::LmsSha256M32H10],
            lmots: vec![LmotsType::LmotsSha256N32W4],
        };
        let (public, private) = hss_templates(&tree, false, "k-prvkey", "k-pubkey").unwrap();
        assert!(private.attribute_types().any(|t| t == CKA_HSS_LMS_TYPES));
        assert!(!public.attribute_types().any(|t| t == CKA_HSS_LMS_TYPES));
    }
}
