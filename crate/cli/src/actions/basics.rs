use clap::Parser;
use luna_p11::{
    ObjectClassFilter, Template,
    sys::{
        CKA_EXTRACTABLE, CKA_LABEL, CKA_MODIFIABLE, CKA_TOKEN, CKK_EC, CKK_RSA,
        CKO_CERTIFICATE, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY, CKO_SECRET_KEY, CK_OBJECT_CLASS,
    },
};

use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs, load_library, print_hex},
    error::result::CliResult,
};

/// Number of handles fetched per `C_FindObjects` call.
const FIND_BATCH_SIZE: usize = 5;

/// Log in to a slot, then log out and close the session.
#[derive(Parser, Debug)]
pub struct LoginLogoutAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl LoginLogoutAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        println!("\n> Login success.");
        connection.disconnect();
        Ok(())
    }
}

/// List the slots of the library and the tokens they hold.
///
/// No login is required.
#[derive(Parser, Debug)]
pub struct EnumerateSlotsAction {
    /// Also list slots without a token
    #[arg(long, default_value = "false")]
    all: bool,
}

impl EnumerateSlotsAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let lib = load_library(&ctx.p11_lib)?;
        println!("\n{}", lib.info()?);

        let slots = lib.slot_list(!self.all)?;
        if slots.is_empty() {
            println!("\nNo slots were found.");
            return Ok(());
        }
        for slot_id in slots {
            let slot = lib.slot_info(slot_id)?;
            println!("\n{slot}");
            if slot.token_present() {
                println!("{}", lib.token_info(slot_id)?);
            }
            println!("-----------------");
        }
        Ok(())
    }
}

/// Generate random bytes with the HSM RNG and print them as hex
#[derive(Parser, Debug)]
pub struct GenerateRandomAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Number of random bytes to generate
    #[arg(default_value = "16", value_parser = clap::value_parser!(u16).range(1..=4096))]
    length: u16,
}

impl GenerateRandomAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let random = connection.generate_random(usize::from(self.length))?;
        println!("\n> {} bytes of random data generated.", random.len());
        print_hex("Random Data (hex)", &random);
        connection.disconnect();
        Ok(())
    }
}

/// List the labels of the token objects, optionally of one class only
#[derive(Parser, Debug)]
pub struct ListObjectsAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// Object class to list
    #[arg(long, default_value = "all", value_name = "CLASS")]
    class: ObjectClassFilter,
}

fn class_title(class: CK_OBJECT_CLASS) -> &'static str {
    match class {
        CKO_SECRET_KEY => "Secret Keys",
        CKO_PRIVATE_KEY => "Private Keys",
        CKO_PUBLIC_KEY => "Public Keys",
        CKO_CERTIFICATE => "Certificates",
        _ => "Other Objects",
    }
}

impl ListObjectsAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let classes = match self.class.class() {
            Some(class) => vec![class],
            None => vec![CKO_SECRET_KEY, CKO_PRIVATE_KEY, CKO_PUBLIC_KEY, CKO_CERTIFICATE],
        };
        for class in classes {
            let template = Template::new().bool(CKA_TOKEN, true).class(class);
            let handles = connection.find_objects(&template, FIND_BATCH_SIZE)?;
            println!("\n{}:", class_title(class));
            if handles.is_empty() {
                println!("  --> none");
            }
            for handle in handles {
                let label = connection.get_string_attribute(handle, CKA_LABEL)?;
                println!("  --> {label} (handle {handle})");
            }
        }
        connection.disconnect();
        Ok(())
    }
}

/// Count token objects matching a few search templates.
#[derive(Parser, Debug)]
pub struct FindObjectsAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl FindObjectsAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        println!("\n> Searching for objects.");

        let searches = [
            (
                "Token objects",
                Template::new().bool(CKA_TOKEN, true),
            ),
            (
                "RSA Private keys",
                Template::new()
                    .bool(CKA_TOKEN, true)
                    .key_type(CKK_RSA)
                    .class(CKO_PRIVATE_KEY),
            ),
            (
                "Secret keys",
                Template::new()
                    .bool(CKA_TOKEN, true)
                    .bool(CKA_EXTRACTABLE, false)
                    .bool(CKA_MODIFIABLE, false)
                    .class(CKO_SECRET_KEY),
            ),
            (
                "EC Public keys",
                Template::new()
                    .bool(CKA_TOKEN, true)
                    .key_type(CKK_EC)
                    .class(CKO_PUBLIC_KEY),
            ),
        ];
        for (what, template) in &searches {
            let found = connection.count_objects(template, FIND_BATCH_SIZE)?;
            println!("  --> {what} found : {found}");
        }
        connection.disconnect();
        Ok(())
    }
}
