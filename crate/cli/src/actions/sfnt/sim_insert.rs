use std::path::PathBuf;

use clap::Parser;
use luna_logger::debug;

use crate::{
    SamplesContext,
    actions::shared::{Connection, SlotArgs, read_bytes_from_file},
    error::result::{CliResult, CliResultHelper},
};

/// Import the objects of a SIM blob with `CA_SIMInsert`.
///
/// The blob must have been extracted without authorization data.
#[derive(Parser, Debug)]
pub struct SimInsertAction {
    #[command(flatten)]
    slot: SlotArgs,

    /// SIM blob to import
    #[arg(default_value = "extracted.sim")]
    blob_file: PathBuf,
}

impl SimInsertAction {
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        let connection = Connection::open(ctx, &self.slot)?;
        debug!(
            "Vendor functions available: {}",
            connection.lib().sfnt().available().join(", ")
        );
        println!("\n> SafeNet Extensions loaded.");

        let blob = read_bytes_from_file(&self.blob_file)
            .with_context(|| format!("failed to open/read {}", self.blob_file.display()))?;
        println!("\n> {} bytes read from {}", blob.len(), self.blob_file.display());

        let objects = connection.sim_insert(&blob)?;
        println!("\n> {} objects imported successfully.", objects.len());
        connection.disconnect();
        Ok(())
    }
}
