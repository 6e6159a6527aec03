use std::path::{Path, PathBuf};

use clap::Parser;
use luna_p11::{
    Mechanism, Template,
    sys::{
        CKA_DECRYPT, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN,
        CKA_TOKEN, CKK_AES, CKO_PRIVATE_KEY, CKO_SECRET_KEY,
    },
};

use super::ask_pqc_key_type;
use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs, read_bytes_from_file, write_bytes_to_file},
    error::result::{CliResult, CliResultHelper},
    prompt::Prompter,
};

/// IV of the `CKM_AES_KWP` wrapping of post-quantum private keys.
const KWP_IV: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

fn kwp() -> Mechanism {
    Mechanism::AesKwp {
        iv: KWP_IV.to_vec(),
    }
}

fn wrapping_key_template(label: &str) -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
        .label(label)
}

/// Label of the key unwrapped from `file`: its stem followed by `-unwrapped`.
fn unwrapped_label(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map_or_else(|| file.to_string_lossy(), |stem| stem.to_string_lossy());
    format!("{stem}-unwrapped")
}

/// Wrap an ML-DSA or ML-KEM private key with an AES key using `CKM_AES_KWP`.
///
/// The labels and the key type are prompted for. The wrapped key is written
/// to `<PRIVATE_KEY_LABEL>.bin`.
#[derive(Parser, Debug)]
pub struct WrapPqcPrivateKeyAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl WrapPqcPrivateKeyAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let mut prompter = Prompter::stdio();
        let wrapping_label = prompter.word("\n> Enter wrapping key label : ")?;
        let private_label = prompter.word("\n> Enter private key label : ")?;
        let key_type = ask_pqc_key_type(&mut prompter, "\n> Key to search for : \n")?;

        let private_key = connection
            .find_first(
                &Template::new()
                    .class(CKO_PRIVATE_KEY)
                    .key_type(key_type.key_type())
                    .label(&private_label),
            )?
            .context("> Private key not found.")?;
        println!("\n> Private key found. Handle : {private_key}");
        let wrapping_key = connection
            .find_first(&wrapping_key_template(&wrapping_label))?
            .context("> Wrapping key not found.")?;
        println!("\n> Wrapping key found. Handle : {wrapping_key}");

        let wrapped = connection.wrap_key(&kwp(), wrapping_key, private_key)?;
        println!("\n> Private key wrapped.");
        let file = PathBuf::from(format!("{private_label}.bin"));
        write_bytes_to_file(&wrapped, &file)?;
        println!("Wrapped key written to file : {}.", file.display());
        connection.disconnect();
        Ok(())
    }
}

/// Unwrap a post-quantum private key written by `wrap-pqc-private-key`.
///
/// The unwrapped key is a token key labelled `<FILE_STEM>-unwrapped`.
#[derive(Parser, Debug)]
pub struct UnwrapPqcPrivateKeyAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// File holding the wrapped private key
    #[arg(required = true)]
    wrapped_key_file: PathBuf,
}

impl UnwrapPqcPrivateKeyAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let wrapped = read_bytes_from_file(&self.wrapped_key_file)?;
        let connection = Connection::open(ctx, &self.slot)?;
        println!("\n> Wrapped key read from file.");

        let mut prompter = Prompter::stdio();
        let wrapping_label = prompter.word("\n> Enter wrapping key label : ")?;
        let key_type = ask_pqc_key_type(&mut prompter, "\n> Type of key to unwrap : \n")?;

        let wrapping_key = connection
            .find_first(&wrapping_key_template(&wrapping_label))?
            .context("> Wrapping key not found.")?;
        println!("\n> Wrapping key found. Handle : {wrapping_key}");

        let template = Template::new()
            .bool(CKA_TOKEN, true)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SENSITIVE, true)
            .bool(CKA_EXTRACTABLE, true)
            .bool(CKA_MODIFIABLE, true)
            .bool(CKA_SIGN, true)
            .bool(CKA_DECRYPT, true)
            .class(CKO_PRIVATE_KEY)
            .key_type(key_type.key_type())
            .label(&unwrapped_label(&self.wrapped_key_file));
        let key = connection.unwrap_key(&kwp(), wrapping_key, &wrapped, &template)?;
        println!("\n> Private key unwrapped as handle : {key}.");
        connection.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{kwp, unwrapped_label};

    #[test]
    fn test_unwrapped_label() {
        assert_eq!(unwrapped_label(Path::new("mldsa-prvkey.bin")), "mldsa-prvkey-unwrapped");
        assert_eq!(unwrapped_label(Path::new("/tmp/keys/k.bin")), "k-unwrapped");
        assert_eq!(unwrapped_label(Path::new("noext")), "noext-unwrapped");
    }

    #[test]
    fn test_kwp_iv() {
        assert_eq!(kwp().mechanism_type(), luna_p11::vendor::CKM_AES_KWP);
    }
}
