use std::{path::PathBuf, process};

use caesar_fm::{CAESAR_FM_NAME, FmResult, MdLib, Operation, exchange};
use clap::{ArgGroup, Parser};
use luna_logger::{info, log_init};

/// Send a message to the Caesar FM and print what it returns.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new("operation").required(true).args(["encrypt", "decrypt"])))]
struct Cli {
    /// Slot of the HSM the module is loaded on
    slot: u32,

    /// Encrypt the message
    #[arg(short = 'E')]
    encrypt: bool,

    /// Decrypt the message
    #[arg(short = 'D')]
    decrypt: bool,

    /// e.g. "Hello World."
    message: String,

    /// Path to the Message Dispatch library,
    /// e.g. /usr/safenet/lunaclient/lib/libethsm.so
    #[arg(long, env = "MD_LIB")]
    md_lib: PathBuf,
}

fn run(cli: &Cli) -> FmResult<()> {
    let operation = if cli.encrypt {
        Operation::Encrypt
    } else {
        Operation::Decrypt
    };
    info!("{operation:?} {} bytes on slot {}", cli.message.len(), cli.slot);

    let md = MdLib::load(&cli.md_lib)?;
    let adapter = md.hsm_index_for_slot(cli.slot)?;
    let embedded_slot = md.embedded_slot_id(cli.slot)?;
    let fm_id = md.fm_id_from_name(adapter, CAESAR_FM_NAME)?;

    println!("FM Name is : {CAESAR_FM_NAME}.");
    println!("FM ID is : {fm_id:04x}");
    println!("Adapter ID : {adapter}");
    println!("Embedded Slot ID : {embedded_slot}.");

    let reply = exchange(
        &md,
        adapter,
        fm_id,
        embedded_slot,
        operation,
        cli.message.as_bytes(),
    )?;
    println!("Received message : {}.", String::from_utf8_lossy(&reply));
    Ok(())
}

fn main() {
    log_init(None);
    let cli = Cli::parse();
    if let Err(err) = run(&cli) {
        eprintln!("ERROR: {err}");
        process::exit(1);
    }
}
