use std::path::PathBuf;

use clap::Parser;
use luna_p11::{
    Mechanism, PrfKdfParams, Template,
    sys::{
        CK_ULONG, CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE,
        CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN, CKA_UNWRAP, CKA_VALUE_LEN, CKA_VERIFY, CKA_WRAP,
        CKK_AES, CKK_DES3, CKK_GENERIC_SECRET, CKO_SECRET_KEY,
    },
};

use crate::{
    SamplesContext,
    actions::shared::{
        Connection, SlotArgs, print_hex, read_bytes_from_file, write_bytes_to_file,
    },
    cli_bail, cli_ensure, cli_error,
    error::result::{CliResult, CliResultHelper},
    prompt::Prompter,
};

/// Label and context given to the NIST SP 800-108 KDF.
const KDF_LABEL_AND_CONTEXT: &[u8] = b"12345678";

/// Mechanism of `wrap-secret-key` and `unwrap-secret-key`.
const SECRET_KEY_WRAP: Mechanism = Mechanism::AesKeyWrap;

/// `CKM_AES_KEY_WRAP` adds this many bytes to the wrapped key.
const KEY_WRAP_OVERHEAD: usize = 8;

const AES_BLOCK_LEN: usize = 16;

/// Message authenticated by the CMAC and HMAC samples.
const MAC_MESSAGE: &[u8] = b"Hello World, I've been waiting for the chance to see your face.";

/// Search template of an AES key stored on the token under `label`.
fn aes_token_key(label: &str) -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
        .bool(CKA_TOKEN, true)
        .label(label)
}

fn aes_key_gen_template(token: bool) -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_ENCRYPT, true)
        .bool(CKA_DECRYPT, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_EXTRACTABLE, true)
        .bool(CKA_MODIFIABLE, true)
        .bool(CKA_WRAP, false)
        .bool(CKA_UNWRAP, false)
        .label("MyAESKey")
        .ulong(CKA_VALUE_LEN, 32)
}

/// Generate a 256-bit AES key labelled `MyAESKey`
#[derive(Parser, Debug)]
pub struct AesKeyGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Store the key on the token instead of the session
    #[arg(long, default_value = "false")]
    token: bool,
}

impl AesKeyGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let template = aes_key_gen_template(self.token);
        let key = connection.generate_key(&Mechanism::AesKeyGen, &template)?;
        println!("\n> AES Key generated. Handle : {key}");
        connection.disconnect();
        Ok(())
    }
}

/// Encrypt then decrypt a message with AES-CBC and PKCS#7 padding.
///
/// A 128-bit session key is generated and the IV is drawn from the HSM RNG.
#[derive(Parser, Debug)]
pub struct AesCbcPadAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Plaintext to encrypt. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl AesCbcPadAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let plaintext = match &self.plaintext {
            Some(plaintext) => plaintext.clone(),
            None => Prompter::stdio().line("\nEnter plaintext to encrypt : ")?,
        };

        let template = Template::new()
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .ulong(CKA_VALUE_LEN, 16)
            .label("aes-cbc-pad-demo");
        let key = connection.generate_key(&Mechanism::AesKeyGen, &template)?;
        println!("\n> AES-128 key generated. Handle : {key}");

        let iv: [u8; 16] = connection
            .generate_random(16)?
            .try_into()
            .map_err(|_| cli_error!("the HSM returned an IV of the wrong size"))?;
        let mechanism = Mechanism::AesCbcPad { iv };

        let encrypted = connection.encrypt(&mechanism, key, plaintext.as_bytes())?;
        let decrypted = connection.decrypt(&mechanism, key, &encrypted)?;

        println!("\n> Results :- ");
        println!("  --> Plain text : {plaintext}");
        print_hex("Plain text (hex)", plaintext.as_bytes());
        print_hex("IV", &iv);
        print_hex("Encrypted text", &encrypted);
        println!("  --> Decrypted text : {}", String::from_utf8_lossy(&decrypted));
        connection.disconnect();
        Ok(())
    }
}

/// Check an AES-ECB plaintext is whole blocks.
fn check_ecb_plaintext(plaintext: &[u8]) -> CliResult<()> {
    cli_ensure!(
        !plaintext.is_empty() && plaintext.len() % AES_BLOCK_LEN == 0,
        "Text too small/big for AES-ECB"
    );
    Ok(())
}

/// Encrypt then decrypt whole AES blocks with AES-ECB.
///
/// The plaintext length must be a multiple of 16 bytes. A 128-bit session
/// key is generated for the run.
#[derive(Parser, Debug)]
pub struct AesEcbAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Plaintext to encrypt. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl AesEcbAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let plaintext = match &self.plaintext {
            Some(plaintext) => plaintext.clone(),
            None => Prompter::stdio().line("Enter plaintext to encrypt : ")?,
        };
        check_ecb_plaintext(plaintext.as_bytes())?;

        let connection = Connection::open(ctx, &self.slot)?;
        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_AES)
            .bool(CKA_TOKEN, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .ulong(CKA_VALUE_LEN, 16);
        let key = connection.generate_key(&Mechanism::AesKeyGen, &template)?;
        println!("\n> AES-128 key generated.");
        let encrypted = connection.encrypt(&Mechanism::AesEcb, key, plaintext.as_bytes())?;
        println!("> Plaintext encrypted.");
        let decrypted = connection.decrypt(&Mechanism::AesEcb, key, &encrypted)?;
        println!("> Encrypted text decrypted.");

        println!("\n  --> Plain text : {plaintext}");
        print_hex("Plain text (hex)", plaintext.as_bytes());
        print_hex("Encrypted text", &encrypted);
        print_hex("Decrypted text", &decrypted);
        connection.disconnect();
        Ok(())
    }
}

/// Compute the CMAC of a fixed message with a session DES3 key
#[derive(Parser, Debug)]
pub struct Des3CmacAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl Des3CmacAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_DES3)
            .bool(CKA_TOKEN, false)
            .bool(CKA_SIGN, true)
            .bool(CKA_VERIFY, true);
        let key = connection.generate_key(&Mechanism::Des3KeyGen, &template)?;
        println!("\n> DES-3 key generated.");
        let mac = connection.sign(&Mechanism::Des3Cmac, key, MAC_MESSAGE)?;
        println!("DES3 CMAC: {}", hex::encode(mac));
        connection.disconnect();
        Ok(())
    }
}

/// Compute the HMAC-SHA-1 of a fixed message with a 256-bit session secret
#[derive(Parser, Debug)]
pub struct HmacSha1Action {
    #[command(flatten)]
    slot: SlotArgs,
}

impl HmacSha1Action {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_GENERIC_SECRET)
            .bool(CKA_TOKEN, false)
            .bool(CKA_SIGN, true)
            .bool(CKA_VERIFY, true)
            .ulong(CKA_VALUE_LEN, 32);
        let key = connection.generate_key(&Mechanism::GenericSecretKeyGen, &template)?;
        println!("\n> HMAC key generated.");
        let mac = connection.sign(&Mechanism::Sha1Hmac, key, MAC_MESSAGE)?;
        if !connection.verify(&Mechanism::Sha1Hmac, key, MAC_MESSAGE, &mac)? {
            cli_bail!("HMAC verification failed.");
        }
        println!("HMAC-SHA-1: {}", hex::encode(mac));
        connection.disconnect();
        Ok(())
    }
}

/// Derive an AES-256 token key from an existing AES key with `CKM_NIST_PRF_KDF`.
///
/// The derivation runs AES-CMAC in counter mode. The derived key is labelled
/// `key-derived-from-<BASE_LABEL>`.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct NistPrfKdfAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of the private token AES key to derive from
    #[arg(required = true)]
    base_label: String,
}

impl NistPrfKdfAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let base_template = aes_token_key(&self.base_label).bool(CKA_PRIVATE, true);
        let Some(base_key) = connection.find_first(&base_template)? else {
            println!("\nBase key [ {} ], not found.", self.base_label);
            connection.disconnect();
            return Ok(());
        };
        println!("  --> Base key found. Handle : {base_key}");

        let mechanism = Mechanism::NistPrfKdf(PrfKdfParams::aes_cmac(
            KDF_LABEL_AND_CONTEXT,
            KDF_LABEL_AND_CONTEXT,
            1,
        ));
        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .bool(CKA_TOKEN, true)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SENSITIVE, true)
            .bool(CKA_MODIFIABLE, false)
            .bool(CKA_EXTRACTABLE, false)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .bool(CKA_WRAP, false)
            .bool(CKA_UNWRAP, false)
            .ulong(CKA_VALUE_LEN, 32)
            .label(&format!("key-derived-from-{}", self.base_label))
            .key_type(CKK_AES);
        let derived = connection.derive_key(&mechanism, base_key, &template)?;
        println!("\n> AES key derived.\n  --> Handle : {derived}");
        connection.disconnect();
        Ok(())
    }
}

/// Wrap a token secret key with a token AES key using `CKM_AES_KEY_WRAP`
#[derive(Parser, Debug)]
pub struct WrapSecretKeyAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of the AES wrapping key
    #[arg(required = true)]
    wrapping_label: String,

    /// Label of the secret key to wrap
    #[arg(required = true)]
    key_label: String,

    /// File receiving the wrapped key
    #[arg(required = true)]
    output_file: PathBuf,
}

impl WrapSecretKeyAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let wrapping_key = connection
            .find_first(&aes_token_key(&self.wrapping_label))?
            .with_context(|| format!("{} not found.", self.wrapping_label))?;
        println!("\n> Wrapping key found : {}", self.wrapping_label);
        let key = connection
            .find_first(
                &Template::new()
                    .class(CKO_SECRET_KEY)
                    .bool(CKA_TOKEN, true)
                    .label(&self.key_label),
            )?
            .with_context(|| format!("{} not found.", self.key_label))?;
        println!("> Key to wrap found : {}", self.key_label);

        let wrapped = connection.wrap_key(&SECRET_KEY_WRAP, wrapping_key, key)?;
        write_bytes_to_file(&wrapped, &self.output_file)?;
        println!("\nWrapped key written to file {}", self.output_file.display());
        connection.disconnect();
        Ok(())
    }
}

/// Unwrap an AES key previously wrapped with `wrap-secret-key`
#[derive(Parser, Debug)]
pub struct UnwrapSecretKeyAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of the AES unwrapping key
    #[arg(required = true)]
    wrapping_label: String,

    /// Label given to the unwrapped key
    #[arg(required = true)]
    new_label: String,

    /// File holding the wrapped key
    #[arg(required = true)]
    input_file: PathBuf,
}

/// Length of the key wrapped in `wrapped_len` bytes by `CKM_AES_KEY_WRAP`.
fn unwrapped_len(wrapped_len: usize) -> CliResult<CK_ULONG> {
    cli_ensure!(
        wrapped_len > KEY_WRAP_OVERHEAD && wrapped_len % KEY_WRAP_OVERHEAD == 0,
        "a wrapped key is a multiple of {KEY_WRAP_OVERHEAD} bytes longer than \
         {KEY_WRAP_OVERHEAD}, got {wrapped_len}"
    );
    Ok(CK_ULONG::try_from(wrapped_len - KEY_WRAP_OVERHEAD)?)
}

impl UnwrapSecretKeyAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let wrapped = read_bytes_from_file(&self.input_file)?;
        let value_len = unwrapped_len(wrapped.len())?;

        let connection = Connection::open(ctx, &self.slot)?;
        let wrapping_key = connection
            .find_first(&aes_token_key(&self.wrapping_label))?
            .with_context(|| format!("{} not found.", self.wrapping_label))?;
        println!("\n> Wrapping key found : {}", self.wrapping_label);

        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .key_type(CKK_AES)
            .bool(CKA_TOKEN, true)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SENSITIVE, true)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .bool(CKA_EXTRACTABLE, true)
            .ulong(CKA_VALUE_LEN, value_len)
            .label(&self.new_label);
        let key = connection.unwrap_key(&SECRET_KEY_WRAP, wrapping_key, &wrapped, &template)?;
        println!("\n> Key unwrapped successfully. Handle : {key}");
        connection.disconnect();
        Ok(())
    }
}
