use clap::Parser;
use luna_p11::{
    EcCurve, Mechanism, Template,
    sys::{
        CKA_EC_PARAMS, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE, CKA_SIGN,
        CKA_TOKEN, CKA_VERIFY,
    },
};

use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs, print_hex},
    error::result::CliResult,
    prompt::Prompter,
};

fn ec_templates(curve: EcCurve, token: bool, label: Option<&str>) -> (Template, Template) {
    let mut public = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_VERIFY, true)
        .bytes(CKA_EC_PARAMS, curve.ec_params());
    let mut private = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_PRIVATE, true)
        .bool(CKA_SENSITIVE, true)
        .bool(CKA_SIGN, true)
        .bool(CKA_MODIFIABLE, false)
        .bool(CKA_EXTRACTABLE, false);
    if let Some(label) = label {
        public = public.label(label);
        private = private.label(label);
    }
    (public, private)
}

/// Generate an ECDSA token key pair on a named curve
#[derive(Parser, Debug)]
pub struct EcdsaKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Label of both keys of the pair
    #[arg(required = true)]
    label: String,

    /// secp256r1, secp384r1 or secp521r1
    #[arg(required = true)]
    curve: EcCurve,
}

impl EcdsaKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = ec_templates(self.curve, true, Some(&self.label));
        let keys = connection.generate_key_pair(&Mechanism::EcKeyPairGen, &public, &private)?;
        println!("\n> ECDSA key generated with label : {} ({})", self.label, self.curve);
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);
        connection.disconnect();
        Ok(())
    }
}

/// Sign and verify a message with ECDSA-SHA256 using a session secp384r1 pair
#[derive(Parser, Debug)]
pub struct EcdsaSha256Action {
    #[command(flatten)]
    slot: SlotArgs,

    /// Message to sign. Prompted for when omitted
    #[arg(long)]
    plaintext: Option<String>,
}

impl EcdsaSha256Action {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let plaintext = match &self.plaintext {
            Some(plaintext) => plaintext.clone(),
            None => Prompter::stdio().line("Enter plaintext to sign : ")?,
        };
        let connection = Connection::open(ctx, &self.slot)?;
        let (public, private) = ec_templates(EcCurve::Secp384r1, false, None);
        let keys = connection.generate_key_pair(&Mechanism::EcKeyPairGen, &public, &private)?;
        println!("\n> ECDSA keypair generated on secp384r1.");

        let signature =
            connection.sign(&Mechanism::EcdsaSha256, keys.private, plaintext.as_bytes())?;
        println!("> Plaintext signed.");
        if connection.verify(
            &Mechanism::EcdsaSha256,
            keys.public,
            plaintext.as_bytes(),
            &signature,
        )? {
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

#[cfg(test)]
mod tests {
    use luna_p11::{
        EcCurve,
        sys::{CKA_EC_PARAMS, CKA_LABEL},
    };

    use super::ec_templates;

    #[test]
    fn test_ec_templates() {
        let (public, private) = ec_templates(EcCurve::Secp256r1, true, Some("testECDSA"));
        assert!(public.attribute_types().any(|t| t == CKA_EC_PARAMS));
        assert!(!private.attribute_types().any(|t| t == CKA_EC_PARAMS));
        assert!(private.attribute_types().any(|t| t == CKA_LABEL));

        let (public, _) = ec_templates(EcCurve::Secp384r1, false, None);
        assert!(!public.attribute_types().any(|t| t == CKA_LABEL));
    }
}
