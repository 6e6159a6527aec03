use clap::Parser;
use luna_p11::{
    HashSignContext, KeyPair, Mechanism, MlDsaParameterSet, SignContext, Template,
    sys::{
        CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN,
        CKA_VERIFY, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY,
    },
    vendor::CKA_PARAMETER_SET,
};

use super::{ask_ml_dsa_parameter, pair_labels};
use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs},
    error::result::CliResult,
    prompt::Prompter,
};

const HASH_ML_DSA_MESSAGE: &[u8] =
    b"Hello World, I've been waiting for the chance to see your face.";

const PLAINTEXT: &[u8] = b"Earth is the third planet of our Solar System.";

/// Placeholder message representative signed by `extmu-ml-dsa`. The HSM
/// receives the 64 ASCII bytes of this hex string.
const EXTERNAL_MU: &[u8] = b"90a6bea52f99432fcfb754e49b3bf6667ab7072a2248378e7afaa4bad813ce68";

fn ml_dsa_templates(
    parameter_set: MlDsaParameterSet,
    token: bool,
    labels: Option<(&str, &str)>,
) -> (Template, Template) {
    let mut public = Template::new()
        .bool(CKA_TOKEN, token)
        .class(CKO_PUBLIC_KEY)
        .bool(CKA_PRIVATE, false)
        .bool(CKA_VERIFY, true)
        .ulong(CKA_PARAMETER_SET, parameter_set.value());
    let mut private = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_MODIFIABLE, false)
        .bool(CKA_EXTRACTABLE, false)
        .bool(CKA_SIGN, true)
        .class(CKO_PRIVATE_KEY);
    if let Some((private_label, public_label)) = labels {
        public = public.label(public_label);
        private = private.label(private_label);
    }
    (public, private)
}

/// Generate an ML-DSA key pair labelled `<LABEL>-prvkey` / `<LABEL>-pubkey`.
///
/// The label and the parameter set are prompted for.
#[derive(Parser, Debug)]
pub struct MlDsaKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Store the keys on the token instead of the session
    #[arg(long, default_value = "false")]
    token: bool,
}

impl MlDsaKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let mut prompter = Prompter::stdio();
        let label = prompter.word("\n> Enter ML-DSA Keypair Label : ")?;
        let parameter_set = ask_ml_dsa_parameter(&mut prompter)?;

        let (private_label, public_label) = pair_labels(&label);
        let (public, private) = ml_dsa_templates(
            parameter_set,
            self.token,
            Some((&private_label, &public_label)),
        );
        let keys = connection.generate_key_pair(&Mechanism::MlDsaKeyPairGen, &public, &private)?;
        println!("\n> ML-DSA keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);
        connection.disconnect();
        Ok(())
    }
}

/// Sign a SHA-256 digest with `CKM_HASH_ML_DSA` and verify the signature.
///
/// An ML-DSA-65 session pair is generated, the digest is computed by the HSM
/// and the signature is deterministic.
#[derive(Parser, Debug)]
pub struct HashMlDsaAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl HashMlDsaAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let parameter_set = MlDsaParameterSet::MlDsa65;
        let (public, private) = ml_dsa_templates(parameter_set, false, None);
        let keys = connection.generate_key_pair(&Mechanism::MlDsaKeyPairGen, &public, &private)?;
        println!("\n> ML-DSA keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);
        println!("  --> ML-DSA Parameter : {}", parameter_set.value());

        let digest = connection.digest(&Mechanism::Sha256, HASH_ML_DSA_MESSAGE)?;
        println!("\n> Message digest computed.");

        let mechanism = Mechanism::HashMlDsa(HashSignContext::default());
        let signature = connection.sign(&mechanism, keys.private, &digest)?;
        println!("\n> Plaintext signed.");
        println!("  --> Signature Length : {}.", signature.len());

        let verified = connection.verify(&mechanism, keys.public, &digest, &signature)?;
        if verified {
            println!("\n> Signature Verified.");
        } else {
            println!("\n> Signature verification failed.");
        }
        connection.disconnect();
        Ok(())
    }
}

/// Generate an ML-DSA-65 session pair, then sign `data` with `mechanism`
/// and verify the signature.
fn sign_and_verify(
    ctx: &SamplesContext,
    slot: &SlotArgs,
    mechanism: &Mechanism,
    data: &[u8],
) -> CliResult<()> {
    let connection = Connection::open(ctx, slot)?;
    let (public, private) = ml_dsa_templates(MlDsaParameterSet::MlDsa65, false, None);
    let KeyPair { public, private } =
        connection.generate_key_pair(&Mechanism::MlDsaKeyPairGen, &public, &private)?;
    println!("\n> MLDSA-65 keypair generated.");

    let signature = connection.sign(mechanism, private, data)?;
    println!("> Plaintext signed.");
    println!("  --> Signature Length : {}.", signature.len());
    if connection.verify(mechanism, public, data, &signature)? {
        println!("> Signature verified.");
    } else {
        println!("> Signature verification failed.");
    }
    connection.disconnect();
    Ok(())
}

/// Sign and verify a fixed message with pure ML-DSA (`CKM_ML_DSA`).
///
/// An ML-DSA-65 session pair is generated. The signature is hedged and
/// carries no context string.
#[derive(Parser, Debug)]
pub struct MlDsaAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl MlDsaAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        sign_and_verify(
            ctx,
            &self.slot,
            &Mechanism::MlDsa(SignContext::default()),
            PLAINTEXT,
        )
    }
}

/// Sign and verify a fixed message with ML-DSA over SHA3-256 (`CKM_HASH_ML_DSA_SHA3_256`)
#[derive(Parser, Debug)]
pub struct MlDsaSha3_256Action {
    #[command(flatten)]
    slot: SlotArgs,
}

impl MlDsaSha3_256Action {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        sign_and_verify(
            ctx,
            &self.slot,
            &Mechanism::HashMlDsaSha3_256(SignContext::default()),
            PLAINTEXT,
        )
    }
}

/// Sign and verify an externally computed message representative (mu)
/// with `CKM_EXTMU_ML_DSA`
#[derive(Parser, Debug)]
pub struct ExtMuMlDsaAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl ExtMuMlDsaAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        sign_and_verify(ctx, &self.slot, &Mechanism::ExtMuMlDsa, EXTERNAL_MU)
    }
}
