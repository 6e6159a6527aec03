use std::path::PathBuf;

use clap::{Parser, Subcommand};
use luna_logger::{info, log_init, trace};

use crate::{
    actions::{
        basics::{
            EnumerateSlotsAction, FindObjectsAction, GenerateRandomAction, ListObjectsAction,
            LoginLogoutAction,
        },
        dsa::DsaKeyPairGenAction,
        elliptic_curves::{EcdsaKeyPairGenAction, EcdsaSha256Action},
        hss::{HssKeyPairGenAction, HssSignAction, HssVerifyAction},
        pqc::{
            ExtMuMlDsaAction, HashMlDsaAction, MlDsaAction, MlDsaKeyPairGenAction,
            MlDsaSha3_256Action, MlKemAction, MlKemKeyPairGenAction, UnwrapPqcPrivateKeyAction,
            WrapPqcPrivateKeyAction,
        },
        rsa::{
            RsaKeyPairGenAction, RsaOaepAction, RsaPkcs1Action, RsaPssAction, RsaSha256Action,
            UnwrapSecretKeyRsaOaepAction, WrapSecretKeyRsaOaepAction,
        },
        sfnt::{PerKeyAuthorizationAction, SimInsertAction},
        symmetric::{
            AesCbcPadAction, AesEcbAction, AesKeyGenAction, Des3CmacAction, HmacSha1Action,
            NistPrfKdfAction, UnwrapSecretKeyAction, WrapSecretKeyAction,
        },
    },
    config::{LUNA_SAMPLES_CONF_ENV, SamplesConf},
    error::result::CliResult,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file location
    ///
    /// This is an alternative to the env variable `LUNA_SAMPLES_CONF`.
    /// Takes precedence over `LUNA_SAMPLES_CONF` env variable.
    #[arg(short, long, env = LUNA_SAMPLES_CONF_ENV)]
    pub conf: Option<PathBuf>,

    /// Path to the Luna PKCS#11 library,
    /// e.g. /usr/safenet/lunaclient/lib/libCryptoki2_64.so
    #[arg(long, env = "P11_LIB")]
    pub p11_lib: Option<PathBuf>,

    #[command(subcommand)]
    pub command: SampleCommands,
}

/// What every sample needs besides its own arguments.
#[derive(Debug)]
pub struct SamplesContext {
    pub p11_lib: PathBuf,
    pub conf: SamplesConf,
}

impl SamplesContext {
    pub fn new(conf: SamplesConf, p11_lib: Option<PathBuf>) -> CliResult<Self> {
        Ok(Self {
            p11_lib: conf.p11_lib(p11_lib)?,
            conf,
        })
    }
}

#[derive(Subcommand)]
pub enum SampleCommands {
    AesKeyGen(AesKeyGenAction),
    AesCbcPad(AesCbcPadAction),
    AesEcb(AesEcbAction),
    Des3Cmac(Des3CmacAction),
    HmacSha1(HmacSha1Action),
    NistPrfKdf(NistPrfKdfAction),
    WrapSecretKey(WrapSecretKeyAction),
    UnwrapSecretKey(UnwrapSecretKeyAction),
    RsaKeyPairGen(RsaKeyPairGenAction),
    RsaOaep(RsaOaepAction),
    RsaPkcs1(RsaPkcs1Action),
    RsaPss(RsaPssAction),
    RsaSha256(RsaSha256Action),
    WrapSecretKeyRsaOaep(WrapSecretKeyRsaOaepAction),
    UnwrapSecretKeyRsaOaep(UnwrapSecretKeyRsaOaepAction),
    DsaKeyPairGen(DsaKeyPairGenAction),
    EcdsaKeyPairGen(EcdsaKeyPairGenAction),
    EcdsaSha256(EcdsaSha256Action),
    MlDsaKeyPairGen(MlDsaKeyPairGenAction),
    MlDsa(MlDsaAction),
    HashMlDsa(HashMlDsaAction),
    MlDsaSha3_256(MlDsaSha3_256Action),
    ExtmuMlDsa(ExtMuMlDsaAction),
    MlKem(MlKemAction),
    MlKemKeyPairGen(MlKemKeyPairGenAction),
    HssKeyPairGen(HssKeyPairGenAction),
    HssSign(HssSignAction),
    HssVerify(HssVerifyAction),
    WrapPqcPrivateKey(WrapPqcPrivateKeyAction),
    UnwrapPqcPrivateKey(UnwrapPqcPrivateKeyAction),
    SimInsert(SimInsertAction),
    PerKeyAuthorization(PerKeyAuthorizationAction),
    FindObjects(FindObjectsAction),
    ListObjects(ListObjectsAction),
    LoginLogout(LoginLogoutAction),
    EnumerateSlots(EnumerateSlotsAction),
    GenerateRandom(GenerateRandomAction),
}

impl SampleCommands {
    /// Run the selected sample.
    ///
    /// # Errors
    ///
    /// Returns the first failure of the sample: a library call, a prompt or a file.
    pub fn run(&self, ctx: &SamplesContext) -> CliResult<()> {
        match self {
            Self::AesKeyGen(action) => action.run(ctx),
            Self::AesCbcPad(action) => action.run(ctx),
            Self::AesEcb(action) => action.run(ctx),
            Self::Des3Cmac(action) => action.run(ctx),
            Self::HmacSha1(action) => action.run(ctx),
            Self::NistPrfKdf(action) => action.run(ctx),
            Self::WrapSecretKey(action) => action.run(ctx),
            Self::UnwrapSecretKey(action) => action.run(ctx),
            Self::RsaKeyPairGen(action) => action.run(ctx),
            Self::RsaOaep(action) => action.run(ctx),
            Self::RsaPkcs1(action) => action.run(ctx),
            Self::RsaPss(action) => action.run(ctx),
            Self::RsaSha256(action) => action.run(ctx),
            Self::WrapSecretKeyRsaOaep(action) => action.run(ctx),
            Self::UnwrapSecretKeyRsaOaep(action) => action.run(ctx),
            Self::DsaKeyPairGen(action) => action.run(ctx),
            Self::EcdsaKeyPairGen(action) => action.run(ctx),
            Self::EcdsaSha256(action) => action.run(ctx),
            Self::MlDsaKeyPairGen(action) => action.run(ctx),
            Self::MlDsa(action) => action.run(ctx),
            Self::HashMlDsa(action) => action.run(ctx),
            Self::MlDsaSha3_256(action) => action.run(ctx),
            Self::ExtmuMlDsa(action) => action.run(ctx),
            Self::MlKem(action) => action.run(ctx),
            Self::MlKemKeyPairGen(action) => action.run(ctx),
            Self::HssKeyPairGen(action) => action.run(ctx),
            Self::HssSign(action) => action.run(ctx),
            Self::HssVerify(action) => action.run(ctx),
            Self::WrapPqcPrivateKey(action) => action.run(ctx),
            Self::UnwrapPqcPrivateKey(action) => action.run(ctx),
            Self::SimInsert(action) => action.run(ctx),
            Self::PerKeyAuthorization(action) => action.run(ctx),
            Self::FindObjects(action) => action.run(ctx),
            Self::ListObjects(action) => action.run(ctx),
            Self::LoginLogout(action) => action.run(ctx),
            Self::EnumerateSlots(action) => action.run(ctx),
            Self::GenerateRandom(action) => action.run(ctx),
        }
    }
}

/// Entry point of the `luna-samples` binary.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read, no library path is
/// configured, or the selected sample fails.
pub fn luna_samples_main() -> CliResult<()> {
    log_init(None);
    let cli = Cli::parse();
    info!("Starting luna-samples");

    let conf = SamplesConf::load(cli.conf.as_deref())?;
    trace!("Configuration: {conf:?}");
    let ctx = SamplesContext::new(conf, cli.p11_lib)?;
    cli.command.run(&ctx)
}
