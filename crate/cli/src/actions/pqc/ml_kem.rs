use clap::Parser;
use luna_p11::{
    Mechanism, MlKemParameterSet, Template,
    sys::{
        CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE, CKA_SENSITIVE,
        CKA_TOKEN, CKA_VALUE_LEN, CKK_AES, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY, CKO_SECRET_KEY,
    },
    vendor::{CKA_DECAPSULATE, CKA_ENCAPSULATE, CKA_PARAMETER_SET},
};

use super::{ask_ml_kem_parameter, pair_labels};
use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs, print_hex},
    error::result::CliResult,
    prompt::Prompter,
};

fn ml_kem_templates(
    parameter_set: MlKemParameterSet,
    token: bool,
    labels: Option<(&str, &str)>,
) -> (Template, Template) {
    let mut public = Template::new()
        .bool(CKA_TOKEN, token)
        .bool(CKA_ENCAPSULATE, true)
        .ulong(CKA_PARAMETER_SET, parameter_set.value());
    let mut private = Template::new()
        .bool(CKA_TOKEN, token)
        .ulong(CKA_PARAMETER_SET, parameter_set.value())
        .bool(CKA_DECAPSULATE, true);
    if let Some((private_label, public_label)) = labels {
        public = public.class(CKO_PUBLIC_KEY).label(public_label);
        private = private
            .class(CKO_PRIVATE_KEY)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_SENSITIVE, true)
            .bool(CKA_MODIFIABLE, false)
            .bool(CKA_EXTRACTABLE, false)
            .label(private_label);
    }
    (public, private)
}

/// The AES-256 secret produced by encapsulation and decapsulation.
fn shared_secret_template() -> Template {
    Template::new()
        .class(CKO_SECRET_KEY)
        .bool(CKA_ENCRYPT, true)
        .bool(CKA_DECRYPT, true)
        .key_type(CKK_AES)
        .ulong(CKA_VALUE_LEN, 32)
}

/// Encapsulate an AES-256 key to an ML-KEM public key, then decapsulate it.
///
/// The parameter set is prompted for and the key pair lives in the session.
#[derive(Parser, Debug)]
pub struct MlKemAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl MlKemAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let parameter_set = ask_ml_kem_parameter(&mut Prompter::stdio())?;
        let (public, private) = ml_kem_templates(parameter_set, false, None);
        let keys = connection.generate_key_pair(&Mechanism::MlKemKeyPairGen, &public, &private)?;
        println!("\n> ML-KEM keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);

        let secret = shared_secret_template();
        let (ciphertext, encapsulated) = connection.encapsulate_key(
            &Mechanism::MlKem,
            keys.public,
            &secret,
            parameter_set.ciphertext_len(),
        )?;
        println!("\n> AES-Key encapsulated.");
        println!("  --> CipherText length : {}", ciphertext.len());
        println!("  --> Encapsulated Key Handle : {encapsulated}");

        let decapsulated =
            connection.decapsulate_key(&Mechanism::MlKem, keys.private, &secret, &ciphertext)?;
        println!("\n> AES-Key decapsulated.");
        println!("  --> Decapsulated key handle : {decapsulated}");
        print_hex("CipherText", &ciphertext);
        connection.disconnect();
        Ok(())
    }
}

/// Generate an ML-KEM key pair labelled `<LABEL>-prvkey` / `<LABEL>-pubkey`.
///
/// The label and the parameter set are prompted for.
#[derive(Parser, Debug)]
pub struct MlKemKeyPairGenAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Store the keys on the token instead of the session
    #[arg(long, default_value = "false")]
    token: bool,
}

impl MlKemKeyPairGenAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let mut prompter = Prompter::stdio();
        let label = prompter.word("\n> Enter ML-KEM Keypair Label : ")?;
        let parameter_set = ask_ml_kem_parameter(&mut prompter)?;

        let (private_label, public_label) = pair_labels(&label);
        let (public, private) = ml_kem_templates(
            parameter_set,
            self.token,
            Some((&private_label, &public_label)),
        );
        let keys = connection.generate_key_pair(&Mechanism::MlKemKeyPairGen, &public, &private)?;
        println!("\n> ML-KEM keypair generated.");
        println!("  --> Private key handle : {}", keys.private);
        println!("  --> Public key handle : {}", keys.public);
        connection.disconnect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use luna_p11::{
        MlKemParameterSet,
        sys::{CKA_LABEL, CKA_VALUE_LEN},
        vendor::{CKA_DECAPSULATE, CKA_ENCAPSULATE},
    };

    use super::{ml_kem_templates, shared_secret_template};

    #[test]
    fn test_ml_kem_templates() {
        let (public, private) = ml_kem_templates(MlKemParameterSet::MlKem768, false, None);
        assert_eq!(public.len(), 3);
        assert_eq!(private.len(), 3);
        assert!(public.attribute_types().any(|t| t == CKA_ENCAPSULATE));
        assert!(private.attribute_types().any(|t| t == CKA_DECAPSULATE));

        let (public, private) =
            ml_kem_templates(MlKemParameterSet::MlKem512, true, Some(("k-prvkey", "k-pubkey")));
        assert!(public.attribute_types().any(|t| t == CKA_LABEL));
        assert!(private.attribute_types().any(|t| t == CKA_LABEL));
    }

    #[test]
    fn test_shared_secret_template() {
        assert!(shared_secret_template()
            .attribute_types()
            .any(|t| t == CKA_VALUE_LEN));
    }
}
