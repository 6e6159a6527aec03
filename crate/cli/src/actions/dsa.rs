use clap::Parser;
use luna_p11::{
    Mechanism, Template,
    sys::{
        CK_ULONG, CKA_BASE, CKA_PRIME, CKA_PRIME_BITS, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN,
        CKA_SUB_PRIME_BITS, CKA_SUBPRIME, CKA_TOKEN, CKA_VERIFY, CKK_DSA, CKO_DOMAIN_PARAMETERS,
    },
};

use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs},
    error::result::CliResult,
};

const PRIME_BITS: CK_ULONG = 2048;
const SUBPRIME_BITS: CK_ULONG = 256;

const DSA_MESSAGE: &[u8] = b"Earth is the third planet of our Solar System.";

/// Domain parameters (p, q, g) shared by a DSA pair.
struct DomainParameters {
    prime: Vec<u8>,
    subprime: Vec<u8>,
    base: Vec<u8>,
}

fn domain_parameter_template() -> Template {
    Template::new()
        .class(CKO_DOMAIN_PARAMETERS)
        .key_type(CKK_DSA)
        .bool(CKA_TOKEN, false)
        .ulong(CKA_PRIME_BITS, PRIME_BITS)
        .ulong(CKA_SUB_PRIME_BITS, SUBPRIME_BITS)
}

fn dsa_templates(domain: &DomainParameters) -> (Template, Template) {
    let public = Template::new()
        .key_type(CKK_DSA)
        .bool(CKA_TOKEN, false)
        .bool(CKA_VERIFY, true)
        .bytes(CKA_PRIME, domain.prime.as_slice())
        .bytes(CKA_SUBPRIME, domain.subprime.as_slice())
        .bytes(CKA_BASE, domain.base.as_slice());
    let private = Template::new()
        .key_type(CKK_DSA)
        .bool(CKA_TOKEN, false)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_SIGN, true);
    (public, private)
}

/// Generate a DSA-2048 session key pair, then sign and verify a message
/// with DSA-SHA256.
///
/// The 2048/256 domain parameters are generated by the HSM first.
#[derive(Parser, Debug)]
pub struct DsaKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl DsaKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let parameters =
            connection.generate_key(&Mechanism::DsaParameterGen, &domain_parameter_template())?;
        let domain = DomainParameters {
            prime: connection.get_bytes_attribute(parameters, CKA_PRIME)?,
            subprime: connection.get_bytes_attribute(parameters, CKA_SUBPRIME)?,
            base: connection.get_bytes_attribute(parameters, CKA_BASE)?,
        };
        println!("\n> DSA domain parameters generated.");

        let (public, private) = dsa_templates(&domain);
        let keys = connection.generate_key_pair(&Mechanism::DsaKeyPairGen, &public, &private)?;
        println!("> DSA keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);

        let signature = connection.sign(&Mechanism::DsaSha256, keys.private, DSA_MESSAGE)?;
        if connection.verify(&Mechanism::DsaSha256, keys.public, DSA_MESSAGE, &signature)? {
            println!("> Signature verified.");
        } else {
            println!("> Signature verification failed.");
        }
        connection.destroy_object(parameters)?;
        connection.disconnect();
        Ok(())
    }
}
