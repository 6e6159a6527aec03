use std::path::PathBuf;

use clap::Parser;
use luna_p11::{
    KeyPair, Mechanism, OaepParams, Template,
    sys::{
        CK_ULONG, CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_MODULUS_BITS,
        CKA_PRIVATE, CKA_PUBLIC_EXPONENT, CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN, CKA_VERIFY,
        CKK_AES, CKK_RSA, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY, CKO_SECRET_KEY,
    },
};

use crate::{
    SamplesContext,
    actions::shared::{
        Connection, SlotArgs, print_hex, read_bytes_from_file, write_bytes_to_file,
    },
    cli_ensure,
    error::result::{CliResult, CliResultHelper},
    prompt::Prompter,
};

const MODULUS_BITS: CK_ULONG = 2048;
const PUBLIC_EXPONENT: [u8; 3] = [0x01, 0x00, 0x01];

/// OAEP source data (label) bound to the ciphertext.
const OAEP_SOURCE: &[u8] = b"HelloWorld.";
const OAEP_PLAINTEXT: &str = "Earth is the third planet of our Solar System.";

/// Longest message the PKCS#1 and PSS samples accept.
const MAX_PLAINTEXT: usize = 245;

fn plaintext_or_prompt(plaintext: Option<&String>, question: &str) -> CliResult<String> {
    let plaintext = match plaintext {
        Some(plaintext) => plaintext.clone(),
        None => Prompter::stdio().line(question)?,
    };
    check_plaintext_len(&plaintext)?;
    Ok(plaintext)
}

fn check_plaintext_len(plaintext: &str) -> CliResult<()> {
    cli_ensure!(plaintext.len() <= MAX_PLAINTEXT, "Plaintext too long.");
    Ok(())
}

/// OAEP with SHA-256, MGF1-SHA-256 and no label, as used to wrap secret keys.
fn key_wrap_oaep() -> Mechanism {
    Mechanism::RsaPkcsOaep(OaepParams::sha256(&[]))
}

/// Search template of an RSA token key of `class` stored under `label`.
fn rsa_token_key(class: luna_p11::sys::CK_OBJECT_CLASS, label: &str) -> Template {
    Template::new()
        .class(class)
        .key_type(CKK_RSA)
        .bool(CKA_TOKEN, true)
        .label(label)
}

/// Key usages of a generated RSA pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RsaUsage {
    Encryption,
    Signature,
    Both,
}

impl RsaUsage {
    const fn encrypts(self) -> bool {
        matches!(self, Self::Encryption | Self::Both)
    }

    const fn signs(self) -> bool {
        matches!(self, Self::Signature | Self::Both)
    }
}

fn rsa_templates(
    token: bool,
    usage: RsaUsage,
    labels: Option<(&str, &str)>,
) -> (Template, Template) {
    let mut public = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_VERIFY, usage.signs())
        .bool(CKA_ENCRYPT, usage.encrypts())
        .bytes(CKA_PUBLIC_EXPONENT, PUBLIC_EXPONENT)
        .ulong(CKA_MODULUS_BITS, MODULUS_BITS);
    let mut private = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_SIGN, usage.signs())
        .bool(CKA_DECRYPT, usage.encrypts())
        .bool(CKA_MODIFIABLE, false)
        .bool(CKA_EXTRACTABLE, false);
    if let Some((public_label, private_label)) = labels {
        public = public.label(public_label);
        private = private.label(private_label);
    }
    (public, private)
}

fn print_key_pair(keys: &KeyPair) {
    println!("  --> Private key handle : {}", keys.private);
    println!("  --> Public key handle : {}", keys.public);
}

/// Generate an RSA-2048 key pair, `MyRSAPublicKey` / `MyRSAPrivateKey`
#[derive(Parser, Debug)]
pub struct RsaKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Store the keys on the token instead of the session
    #[arg(long, default_value = "false")]
    token: bool,
}

impl RsaKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = rsa_templates(
            self.token,
            RsaUsage::Both,
            Some(("MyRSAPublicKey", "MyRSAPrivateKey")),
        );
        let keys = connection.generate_key_pair(&Mechanism::RsaPkcsKeyPairGen, &public, &private)?;
        println!("\n> RSA keypair generated.");
        print_key_pair(&keys);
        connection.disconnect();
        Ok(())
    }
}

/// Encrypt and decrypt a fixed message with RSA-OAEP (SHA-256, MGF1-SHA-256)
#[derive(Parser, Debug)]
pub struct RsaOaepAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl RsaOaepAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = rsa_templates(false, RsaUsage::Encryption, None);
        let keys = connection.generate_key_pair(&Mechanism::RsaPkcsKeyPairGen, &public, &private)?;
        println!("\n> RSA keypair generated : ");
        print_key_pair(&keys);

        let mechanism = Mechanism::RsaPkcsOaep(OaepParams::sha256(OAEP_SOURCE));
        println!("\n> OAEP Param initialized.");
        let encrypted = connection.encrypt(&mechanism, keys.public, OAEP_PLAINTEXT.as_bytes())?;
        println!("\n> Plaintext encrypted.");
        let decrypted = connection.decrypt(&mechanism, keys.private, &encrypted)?;
        println!("\n> Encrypted data decrypted.");

        println!("\n> Results :- ");
        println!("  --> Plain text : {OAEP_PLAINTEXT}");
        print_hex("Plain text as HEX", OAEP_PLAINTEXT.as_bytes());
        print_hex("Encrypted Data", &encrypted);
        print_hex("Decrypted Data", &decrypted);
        connection.disconnect();
        Ok(())
    }
}

/// Sign and verify a message with SHA256-RSA-PKCS-PSS using a session RSA-2048 pair
#[derive(Parser, Debug)]
pub struct RsaPssAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Message to sign, at most 245 bytes. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl RsaPssAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let plaintext = plaintext_or_prompt(self.plaintext.as_ref(), "Enter plaintext to sign : ")?;

        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = rsa_templates(false, RsaUsage::Signature, None);
        let keys = connection.generate_key_pair(&Mechanism::RsaPkcsKeyPairGen, &public, &private)?;
        println!("\n> RSA-2048 keypair generated.");

        let mechanism = Mechanism::Sha256RsaPkcsPss;
        let signature = connection.sign(&mechanism, keys.private, plaintext.as_bytes())?;
        println!("> Plaintext signed.");
        if connection.verify(&mechanism, keys.public, plaintext.as_bytes(), &signature)? {
            println!("> Signature verified.");
        } else {
            println!("> Signature verification failed.");
        }
        println!("  --> Plain text : {plaintext}");
        print_hex("Plain text (hex)", plaintext.as_bytes());
        print_hex("Signature", &signature);
        connection.disconnect();
        Ok(())
    }
}

/// Encrypt and decrypt a message with RSA PKCS#1 v1.5 using a session RSA-2048 pair
#[derive(Parser, Debug)]
pub struct RsaPkcs1Action {
    #[command(flatten)]
    slot: SlotArgs,

    /// Message to encrypt, at most 245 bytes. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl RsaPkcs1Action {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let plaintext =
            plaintext_or_prompt(self.plaintext.as_ref(), "Enter plaintext to encrypt : ")?;

        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = rsa_templates(false, RsaUsage::Encryption, None);
        let keys = connection.generate_key_pair(&Mechanism::RsaPkcsKeyPairGen, &public, &private)?;
        println!("\n> RSA-2048 keypair generated.");

        let encrypted = connection.encrypt(&Mechanism::RsaPkcs, keys.public, plaintext.as_bytes())?;
        println!("> Plaintext encrypted.");
        let decrypted = connection.decrypt(&Mechanism::RsaPkcs, keys.private, &encrypted)?;
        println!("> Encrypted text decrypted.");

        println!("  --> Plain text : {plaintext}");
        print_hex("Plain text (hex)", plaintext.as_bytes());
        print_hex("Encrypted text", &encrypted);
        println!("  --> Decrypted text : {}", String::from_utf8_lossy(&decrypted));
        connection.disconnect();
        Ok(())
    }
}

/// Sign and verify a message with SHA256-RSA-PKCS using a session RSA-2048 pair
#[derive(Parser, Debug)]
pub struct RsaSha256Action {
    #[command(flatten)]
    slot: SlotArgs,

    /// Message to sign, at most 245 bytes. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl RsaSha256Action {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let plaintext = plaintext_or_prompt(self.plaintext.as_ref(), "Enter plaintext to sign : ")?;

        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = rsa_templates(false, RsaUsage::Signature, None);
        let keys = connection.generate_key_pair(&Mechanism::RsaPkcsKeyPairGen, &public, &private)?;
        println!("\n> RSA-2048 keypair generated.");

        let mechanism = Mechanism::Sha256RsaPkcs;
        let signature = connection.sign(&mechanism, keys.private, plaintext.as_bytes())?;
        println!("> Plaintext signed.");
        if connection.verify(&mechanism, keys.public, plaintext.as_bytes(), &signature)? {
            println!("> Signature verified.");
        } else {
            println!("> Signature verification failed.");
        }
        println!("  --> Plain text : {plaintext}");
        print_hex("Signature", &signature);
        connection.disconnect();
        Ok(())
    }
}

/// Wrap a token AES key with an RSA public key using RSA-OAEP (SHA-256)
#[derive(Parser, Debug)]
pub struct WrapSecretKeyRsaOaepAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of the RSA public wrapping key
    #[arg(required = true)]
    public_key_label: String,

    /// Label of the AES key to wrap
    #[arg(required = true)]
    key_label: String,

    /// File receiving the wrapped key
    #[arg(required = true)]
    output_file: PathBuf,
}

impl WrapSecretKeyRsaOaepAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let wrapping_key = connection
            .find_first(&rsa_token_key(CKO_PUBLIC_KEY, &self.public_key_label))?
            .with_context(|| format!("{} not found.", self.public_key_label))?;
        println!("\n> Public key found : {}", self.public_key_label);
        let key = connection
            .find_first(
                &Template::new()
                    .class(CKO_SECRET_KEY)
                    .key_type(CKK_AES)
                    .bool(CKA_TOKEN, true)
                    .label(&self.key_label),
            )?
            .with_context(|| format!("{} not found.", self.key_label))?;
        println!("> Key to wrap found : {}", self.key_label);

        let wrapped = connection.wrap_key(&key_wrap_oaep(), wrapping_key, key)?;
        write_bytes_to_file(&wrapped, &self.output_file)?;
        println!("\nWrapped key written to file {}", self.output_file.display());
        connection.disconnect();
        Ok(())
    }
}

/// Unwrap an AES key wrapped by `wrap-secret-key-rsa-oaep` as a token key
#[derive(Parser, Debug)]
pub struct UnwrapSecretKeyRsaOaepAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of the RSA private unwrapping key
    #[arg(required = true)]
    private_key_label: String,

    /// Label given to the unwrapped key
    #[arg(required = true)]
    new_label: String,

    /// File holding the wrapped key
    #[arg(required = true)]
    input_file: PathBuf,
}

fn unwrapped_aes_template(label: &str) -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
        .bool(CKA_TOKEN, true)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_ENCRYPT, true)
        .bool(CKA_DECRYPT, true)
        .bool(CKA_EXTRACTABLE, true)
        .label(label)
}

impl UnwrapSecretKeyRsaOaepAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let wrapped = read_bytes_from_file(&self.input_file)?;
        cli_ensure!(!wrapped.is_empty(), "{} is empty.", self.input_file.display());

        let connection = Connection::open(ctx, &self.slot)?;
        let unwrapping_key = connection
            .find_first(&rsa_token_key(CKO_PRIVATE_KEY, &self.private_key_label))?
            .with_context(|| format!("{} not found.", self.private_key_label))?;
        println!("\n> Wrapping key found : {}", self.private_key_label);

        let key = connection.unwrap_key(
            &key_wrap_oaep(),
            unwrapping_key,
            &wrapped,
            &unwrapped_aes_template(&self.new_label),
        )?;
        println!("\n> Key unwrapped successfully. Handle : {key}");
        connection.disconnect();
        Ok(())
    }
}
