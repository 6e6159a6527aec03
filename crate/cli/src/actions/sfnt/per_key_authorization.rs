//! Per-key authorization (PKA).
//!
//! A PKA key carries authorization data. A session must present it with
//! `CA_AuthorizeKey` before using the key, and three consecutive failures
//! lock the key until its authorization data is reset.

use std::io::{BufRead, Write};

use clap::Parser;
use luna_p11::{
    Mechanism, Session, Template,
    sys::{
        CK_OBJECT_HANDLE, CKA_DECRYPT, CKA_ENCRYPT, CKA_EXTRACTABLE, CKA_MODIFIABLE, CKA_PRIVATE,
        CKA_SENSITIVE, CKA_SIGN, CKA_TOKEN, CKA_UNWRAP, CKA_VALUE_LEN, CKA_VERIFY, CKA_WRAP,
        CKK_AES, CKO_SECRET_KEY,
    },
    vendor::{CKA_AUTH_DATA, CKR_KEY_NOT_ACTIVE, CKR_KEY_NOT_AUTHORIZED},
};
use strum::FromRepr;
use zeroize::Zeroizing;

use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs},
    error::result::CliResult,
    prompt::Prompter,
};

/// `CKA_ID` shared by the keys of this sample.
const PKA_KEY_ID: [u8; 16] = [
    0xcd, 0x81, 0xc4, 0xe4, 0x73, 0x20, 0x03, 0x61, 0x08, 0xbf, 0x17, 0xf3, 0x06, 0x0f, 0xf2, 0x01,
];

const ENCRYPTION_TEST_IV: [u8; 16] = [0, 1, 2, 3, 4, 5, 6, 7, 0, 1, 2, 3, 4, 5, 6, 7];
const ENCRYPTION_TEST_DATA: &[u8] = b"Earth is the third planet of our solar System";

const MENU: &str = "\n\nPer Key Authorization Demo
1. Generate a new AES key.
2. Load an existing AES key.
3. Authorize the key to perform encryption.
4. Revoke Authorization
5. Show key status.
6. Reset key status.
7. Perform Encryption Test.
0. Exit.
";

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
enum MenuChoice {
    Exit = 0,
    GenerateKey = 1,
    LoadKey = 2,
    Authorize = 3,
    Revoke = 4,
    ShowStatus = 5,
    Reset = 6,
    EncryptionTest = 7,
}

/// Show the menu until a listed choice is entered.
fn next_choice<R: BufRead, W: Write>(prompter: &mut Prompter<R, W>) -> CliResult<MenuChoice> {
    loop {
        prompter.say(MENU)?;
        let answer: u8 = prompter.number("Choice : ")?;
        match MenuChoice::from_repr(answer) {
            Some(choice) => return Ok(choice),
            None => prompter.say(&format!("Invalid choice : {answer}\n"))?,
        }
    }
}

/// Search template of a PKA key stored under `label`.
fn pka_key_template(label: &str) -> Template {
    Template::new()
        .label(label)
        .id(&PKA_KEY_ID)
        .bool(CKA_TOKEN, true)
        .bool(CKA_PRIVATE, true)
        .class(CKO_SECRET_KEY)
        .key_type(CKK_AES)
}

/// The menu driven state: the logged in session owns the keys, a second
/// session of the same application is the one authorized to encrypt.
struct PkaDemo<'a, R, W> {
    connection: &'a Connection,
    encryption_session: Session,
    key: Option<CK_OBJECT_HANDLE>,
    prompter: Prompter<R, W>,
}

impl<'a, R: BufRead, W: Write> PkaDemo<'a, R, W> {
    fn new(connection: &'a Connection, prompter: Prompter<R, W>) -> CliResult<Self> {
        let encryption_session = Session::open(connection.lib(), connection.slot_id(), true)?;
        Ok(Self {
            connection,
            encryption_session,
            key: None,
            prompter,
        })
    }

    fn ask_label(&mut self) -> CliResult<String> {
        self.prompter.word("\t - Key label                  : ")
    }

    fn ask_auth_data(&mut self) -> CliResult<Zeroizing<String>> {
        Ok(Zeroizing::new(
            self.prompter.word("\t - Authorization Data         : ")?,
        ))
    }

    fn run(&mut self) -> CliResult<()> {
        loop {
            match next_choice(&mut self.prompter)? {
                MenuChoice::Exit => {
                    println!("Exiting...");
                    return Ok(());
                }
                MenuChoice::GenerateKey => self.generate_key()?,
                MenuChoice::LoadKey => self.load_key()?,
                MenuChoice::Authorize => self.authorize()?,
                MenuChoice::Revoke => self.revoke()?,
                MenuChoice::ShowStatus => self.show_status()?,
                MenuChoice::Reset => self.reset()?,
                MenuChoice::EncryptionTest => self.encryption_test()?,
            }
        }
    }

    fn generate_key(&mut self) -> CliResult<()> {
        let label = self.ask_label()?;
        let auth_data = self.ask_auth_data()?;
        let template = Template::new()
            .bool(CKA_TOKEN, true)
            .id(&PKA_KEY_ID)
            .bool(CKA_PRIVATE, true)
            .bool(CKA_ENCRYPT, true)
            .bool(CKA_DECRYPT, true)
            .bool(CKA_SIGN, false)
            .bool(CKA_VERIFY, false)
            .bool(CKA_WRAP, false)
            .bool(CKA_UNWRAP, false)
            .class(CKO_SECRET_KEY)
            .bool(CKA_SENSITIVE, true)
            .bool(CKA_EXTRACTABLE, false)
            .bool(CKA_MODIFIABLE, true)
            .label(&label)
            .bytes(CKA_AUTH_DATA, auth_data.as_bytes())
            .ulong(CKA_VALUE_LEN, 16);
        let key = self
            .connection
            .generate_key(&Mechanism::AesKeyGen, &template)?;
        println!("\n> AES Key generated. Handle : {key}");
        self.key = Some(key);
        Ok(())
    }

    fn load_key(&mut self) -> CliResult<()> {
        let label = self.ask_label()?;
        self.key = self.connection.find_first(&pka_key_template(&label))?;
        match self.key {
            Some(key) => println!("{label} key loaded. Handle : {key}"),
            None => println!("{label} key not found."),
        }
        Ok(())
    }

    fn authorize(&mut self) -> CliResult<()> {
        let Some(key) = self.key else {
            println!("\nNothing to authorize. Generate an encryption or load an existing key.");
            return Ok(());
        };
        let auth_data = self.ask_auth_data()?;
        match self
            .encryption_session
            .authorize_key(key, auth_data.as_bytes())
        {
            Ok(()) => println!("Key is now authorized."),
            Err(e) => println!("\nFailed to authorize key : {e}."),
        }
        Ok(())
    }

    fn revoke(&mut self) -> CliResult<()> {
        self.encryption_session = Session::open(
            self.connection.lib(),
            self.connection.slot_id(),
            true,
        )?;
        println!("\nAccess revoked.");
        Ok(())
    }

    fn show_status(&self) -> CliResult<()> {
        let Some(key) = self.key else {
            println!("\nEncryption key not loaded.");
            return Ok(());
        };
        let (status, failed) = self.connection.key_status(key)?;
        println!(
            "\nFailed authentication Limit    : {}",
            status.failed_auth_count_limit
        );
        println!("Failed authentication attempts : {failed}");
        println!("Flag : {}", status.flag);
        Ok(())
    }

    fn reset(&mut self) -> CliResult<()> {
        let Some(key) = self.key else {
            println!("\nNothing to reset. Generate an encryption or load an existing key.");
            return Ok(());
        };
        let auth_data = self.ask_auth_data()?;
        self.encryption_session
            .reset_authorization_data(key, auth_data.as_bytes())?;
        println!("Authorization data has been reset.");
        Ok(())
    }

    fn encryption_test(&self) -> CliResult<()> {
        let Some(key) = self.key else {
            println!("\nEncryption key not loaded.");
            return Ok(());
        };
        let mechanism = Mechanism::AesCbcPad {
            iv: ENCRYPTION_TEST_IV,
        };
        match self
            .encryption_session
            .encrypt(&mechanism, key, ENCRYPTION_TEST_DATA)
        {
            Ok(_) => println!("Encryption worked."),
            Err(e) => match e.rv() {
                Some(CKR_KEY_NOT_AUTHORIZED) => println!(
                    "\nERROR: \tYou're not authorized to use this key.\n\tPlease authorize it and \
                     try again."
                ),
                Some(CKR_KEY_NOT_ACTIVE) => println!("\nERROR: \tThis key is not active."),
                _ => return Err(e.into()),
            },
        }
        Ok(())
    }
}

/// Menu driven walk through per-key authorization.
///
/// Generate or load an AES key protected by authorization data, authorize a
/// second session to use it, revoke that session, inspect the key status
/// and reset a locked key.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct PerKeyAuthorizationAction {
    #[command(flatten)]
    slot: SlotArgs,
}

impl PerKeyAuthorizationAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        let mut demo = PkaDemo::new(&connection, Prompter::stdio())?;
        demo.run()?;
        drop(demo);
        connection.disconnect();
        Ok(())
    }
}
