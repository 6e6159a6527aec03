use std::{env, sync::Arc};

use pkcs11_sys::CK_SLOT_ID;

use crate::{P11Error, P11Lib, P11Result, Session};

fn required_var(name: &str) -> P11Result<String> {
    env::var(name).map_err(|_| {
        P11Error::Default(format!(
            "{name} is not set. Please set the {name} environment variable"
        ))
    })
}

pub(crate) fn get_hsm_password() -> P11Result<String> {
    required_var("HSM_USER_PASSWORD")
}

pub(crate) fn get_hsm_slot_id() -> P11Result<CK_SLOT_ID> {
    required_var("HSM_SLOT_ID")?
        .parse()
        .map_err(|e| P11Error::Default(format!("HSM_SLOT_ID is not a slot id: {e}")))
}

pub(crate) fn load_lib() -> P11Result<Arc<P11Lib>> {
    Ok(Arc::new(P11Lib::instantiate(required_var("P11_LIB")?)?))
}

/// A read/write session logged in on the test slot.
pub(crate) fn open_session() -> P11Result<Session> {
    let lib = load_lib()?;
    let mut session = Session::open(&lib, get_hsm_slot_id()?, true)?;
    session.login(&get_hsm_password()?)?;
    Ok(session)
}
