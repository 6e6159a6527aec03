use std::{
    convert::Infallible,
    fmt::{self, Display, Formatter},
    ptr,
    str::FromStr,
};

use luna_logger::debug;
use pkcs11_sys::{
    CK_BBOOL, CK_FALSE, CK_FLAGS, CK_SLOT_ID, CK_SLOT_INFO, CK_TOKEN_INFO, CK_TRUE, CK_ULONG,
    CKF_HW_SLOT, CKF_LOGIN_REQUIRED, CKF_REMOVABLE_DEVICE, CKF_TOKEN_INITIALIZED,
    CKF_TOKEN_PRESENT,
};

use crate::{P11Error, P11Lib, P11Result, hsm_call, p11_lib::padded_string};

/// How a slot is named on the command line: a numeric id or a token label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotSelector {
    Id(CK_SLOT_ID),
    Label(String),
}

impl FromStr for SlotSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.trim()
            .parse::<CK_SLOT_ID>()
            .map_or_else(|_| Self::Label(s.to_owned()), Self::Id))
    }
}

impl Display for SlotSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Label(label) => write!(f, "{label}"),
        }
    }
}

impl SlotSelector {
    /// First slot of `tokens` whose label matches.
    fn pick<'a>(
        &self,
        mut tokens: impl Iterator<Item = (CK_SLOT_ID, &'a str)>,
    ) -> Option<CK_SLOT_ID> {
        match self {
            Self::Id(id) => Some(*id),
            Self::Label(label) => tokens
                .find(|(_, token_label)| token_label.trim_end() == label.trim_end())
                .map(|(slot, _)| slot),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub slot_id: CK_SLOT_ID,
    pub description: String,
    pub manufacturer_id: String,
    pub flags: CK_FLAGS,
}

impl SlotInfo {
    fn new(slot_id: CK_SLOT_ID, info: &CK_SLOT_INFO) -> Self {
        Self {
            slot_id,
            description: padded_string(&info.slotDescription),
            manufacturer_id: padded_string(&info.manufacturerID),
            flags: info.flags,
        }
    }

    #[must_use]
    pub const fn token_present(&self) -> bool {
        self.flags & CKF_TOKEN_PRESENT != 0
    }
}

impl Display for SlotInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Slot {} : {} ({}){}{}",
            self.slot_id,
            self.description,
            self.manufacturer_id,
            if self.flags & CKF_HW_SLOT == 0 { "" } else { " [hardware]" },
            if self.flags & CKF_REMOVABLE_DEVICE == 0 { "" } else { " [removable]" },
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub label: String,
    pub manufacturer_id: String,
    pub model: String,
    pub serial_number: String,
    pub flags: CK_FLAGS,
}

impl From<CK_TOKEN_INFO> for TokenInfo {
    fn from(info: CK_TOKEN_INFO) -> Self {
        Self {
            label: padded_string(&info.label),
            manufacturer_id: padded_string(&info.manufacturerID),
            model: padded_string(&info.model),
            serial_number: padded_string(&info.serialNumber),
            flags: info.flags,
        }
    }
}

impl Display for TokenInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "  --> Token label   : {}", self.label)?;
        writeln!(f, "  --> Manufacturer  : {}", self.manufacturer_id)?;
        writeln!(f, "  --> Model         : {}", self.model)?;
        writeln!(f, "  --> Serial number : {}", self.serial_number)?;
        write!(
            f,
            "  --> Initialized   : {}, login required : {}",
            self.flags & CKF_TOKEN_INITIALIZED != 0,
            self.flags & CKF_LOGIN_REQUIRED != 0
        )
    }
}

impl P11Lib {
    /// Slot ids known to the library, optionally only those holding a token.
    pub fn slot_list(&self, token_present: bool) -> P11Result<Vec<CK_SLOT_ID>> {
        let present: CK_BBOOL = if token_present { CK_TRUE } else { CK_FALSE };
        let mut count: CK_ULONG = 0;
        hsm_call!(
            self,
            "Failed counting slots",
            C_GetSlotList,
            present,
            ptr::null_mut(),
            &raw mut count
        );
        let mut slots = vec![0 as CK_SLOT_ID; usize::try_from(count)?];
        hsm_call!(
            self,
            "Failed listing slots",
            C_GetSlotList,
            present,
            slots.as_mut_ptr(),
            &raw mut count
        );
        slots.truncate(usize::try_from(count)?);
        debug!("{} slot(s) found", slots.len());
        Ok(slots)
    }

    pub fn slot_info(&self, slot_id: CK_SLOT_ID) -> P11Result<SlotInfo> {
        let mut info = CK_SLOT_INFO::default();
        hsm_call!(
            self,
            format!("Failed getting info of slot {slot_id}"),
            C_GetSlotInfo,
            slot_id,
            &raw mut info
        );
        Ok(SlotInfo::new(slot_id, &info))
    }

    pub fn token_info(&self, slot_id: CK_SLOT_ID) -> P11Result<TokenInfo> {
        let mut info = CK_TOKEN_INFO::default();
        hsm_call!(
            self,
            format!("Failed getting token info of slot {slot_id}"),
            C_GetTokenInfo,
            slot_id,
            &raw mut info
        );
        Ok(TokenInfo::from(info))
    }

    /// Turn a selector into a slot id, looking token labels up when needed.
    pub fn resolve_slot(&self, selector: &SlotSelector) -> P11Result<CK_SLOT_ID> {
        if let SlotSelector::Id(id) = selector {
            return Ok(*id);
        }
        let mut tokens = Vec::new();
        for slot_id in self.slot_list(true)? {
            tokens.push((slot_id, self.token_info(slot_id)?.label));
        }
        selector
            .pick(tokens.iter().map(|(slot, label)| (*slot, label.as_str())))
            .ok_or_else(|| P11Error::Default(format!("No token labelled {selector} was found")))
    }
}

#[cfg(test)]
mod tests {
    use pkcs11_sys::{CK_TOKEN_INFO, CKF_LOGIN_REQUIRED, CKF_TOKEN_INITIALIZED};

    use super::{SlotSelector, TokenInfo};

    #[test]
    fn numeric_selectors_are_slot_ids() {
        assert_eq!("3".parse::<SlotSelector>(), Ok(SlotSelector::Id(3)));
        assert_eq!(" 0 ".parse::<SlotSelector>(), Ok(SlotSelector::Id(0)));
        assert_eq!(
            "SP_SKS_SEHSM3".parse::<SlotSelector>(),
            Ok(SlotSelector::Label("SP_SKS_SEHSM3".to_owned()))
        );
    }

    #[test]
    fn labels_match_padded_token_labels() {
        let tokens = [(0, "partition-a"), (4, "partition-b   ")];
        let selector = SlotSelector::Label("partition-b".to_owned());
        assert_eq!(selector.pick(tokens.iter().copied()), Some(4));
        let selector = SlotSelector::Label("partition-c".to_owned());
        assert_eq!(selector.pick(tokens.iter().copied()), None);
        assert_eq!(SlotSelector::Id(9).pick(tokens.iter().copied()), Some(9));
    }

    #[test]
    fn token_info_from_raw() {
        let mut raw = CK_TOKEN_INFO::default();
        raw.label = [b' '; 32];
        raw.label[..5].copy_from_slice(b"myPar");
        raw.serialNumber = [b' '; 16];
        raw.serialNumber[..4].copy_from_slice(b"1234");
        raw.flags = CKF_TOKEN_INITIALIZED | CKF_LOGIN_REQUIRED;
        let info = TokenInfo::from(raw);
        assert_eq!(info.label, "myPar");
        assert_eq!(info.serial_number, "1234");
        let text = info.to_string();
        assert!(text.contains("Initialized   : true, login required : true"));
    }
}
