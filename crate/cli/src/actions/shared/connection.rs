use std::{ops::Deref, path::Path, sync::Arc};

use clap::Args;
use luna_logger::debug;
use luna_p11::{P11Lib, Session, SlotSelector};

use crate::{
    SamplesContext,
    error::result::{CliResult, CliResultHelper},
    prompt::password,
};

/// Slot and credentials shared by every sample.
#[derive(Args, Debug, Clone, Default)]
pub struct SlotArgs {
    /// Slot id or token label.
    /// Defaults to `default_slot` from the configuration file.
    #[arg(short, long, value_name = "SLOT")]
    pub slot: Option<SlotSelector>,

    /// Crypto Officer password, prompted for without echo when omitted
    #[arg(short, long, value_name = "PASSWORD")]
    pub password: Option<String>,
}

/// Load the PKCS#11 library configured for this run.
pub(crate) fn load_library(path: &Path) -> CliResult<Arc<P11Lib>> {
    let lib = P11Lib::instantiate(path)
        .with_context(|| format!("Failed to load Luna library from path : {}", path.display()))?;
    println!("\n> P11 library loaded.\n  --> {}", path.display());
    Ok(Arc::new(lib))
}

/// An authenticated read/write session, announced on stdout.
pub(crate) struct Connection {
    session: Session,
}

impl Connection {
    pub(crate) fn open(ctx: &SamplesContext, args: &SlotArgs) -> CliResult<Self> {
        let slot = ctx.conf.slot(args.slot.clone())?;
        let password = password(args.password.as_deref())?;
        let lib = load_library(&ctx.p11_lib)?;
        let slot_id = lib.resolve_slot(&slot)?;
        debug!("{slot} resolved to slot {slot_id}");
        let mut session = Session::open(&lib, slot_id, true)?;
        session.login(&password)?;
        println!(
            "\n> Connected to Luna.\n  --> SLOT ID : {slot_id}.\n  --> SESSION ID : {}.",
            session.handle()
        );
        Ok(Self { session })
    }

    /// Log out, close the session and finalize the library.
    pub(crate) fn disconnect(self) {
        drop(self.session);
        println!("\n> Disconnected from Luna slot.\n");
    }
}

impl Deref for Connection {
    type Target = Session;

    fn deref(&self) -> &Session {
        &self.session
    }
}

/// Lowercase hex, the way the samples print binary values.
pub(crate) fn print_hex(title: &str, bytes: &[u8]) {
    println!("  --> {title} : {}", hex::encode(bytes));
}
