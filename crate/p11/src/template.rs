//! Owned attribute templates.
//!
//! A [`Template`] keeps every attribute value alive and correctly aligned for
//! as long as the raw `CK_ATTRIBUTE` array produced by [`Template::as_raw`]
//! is in use.

use std::{ffi::c_void, mem::size_of};

use pkcs11_sys::{
    CK_ATTRIBUTE, CK_ATTRIBUTE_TYPE, CK_BBOOL, CK_FALSE, CK_KEY_TYPE, CK_OBJECT_CLASS, CK_TRUE,
    CK_ULONG, CKA_CLASS, CKA_ID, CKA_KEY_TYPE, CKA_LABEL,
};

use crate::P11Result;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttributeValue {
    Bool(CK_BBOOL),
    Ulong(CK_ULONG),
    Ulongs(Vec<CK_ULONG>),
    Bytes(Vec<u8>),
}

impl AttributeValue {
    fn raw_parts(&self) -> (*const c_void, usize) {
        match self {
            Self::Bool(b) => (std::ptr::from_ref(b).cast(), size_of::<CK_BBOOL>()),
            Self::Ulong(u) => (std::ptr::from_ref(u).cast(), size_of::<CK_ULONG>()),
            Self::Ulongs(v) => (v.as_ptr().cast(), v.len() * size_of::<CK_ULONG>()),
            Self::Bytes(v) => (v.as_ptr().cast(), v.len()),
        }
    }
}

/// An attribute template used to create or search objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    attributes: Vec<(CK_ATTRIBUTE_TYPE, AttributeValue)>,
}

impl Template {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bool(mut self, attribute: CK_ATTRIBUTE_TYPE, value: bool) -> Self {
        let value = if value { CK_TRUE } else { CK_FALSE };
        self.attributes
            .push((attribute, AttributeValue::Bool(value)));
        self
    }

    #[must_use]
    pub fn ulong(mut self, attribute: CK_ATTRIBUTE_TYPE, value: CK_ULONG) -> Self {
        self.attributes
            .push((attribute, AttributeValue::Ulong(value)));
        self
    }

    /// An array of `CK_ULONG`, such as the per-level HSS types.
    #[must_use]
    pub fn ulongs(mut self, attribute: CK_ATTRIBUTE_TYPE, values: &[CK_ULONG]) -> Self {
        self.attributes
            .push((attribute, AttributeValue::Ulongs(values.to_vec())));
        self
    }

    #[must_use]
    pub fn bytes(mut self, attribute: CK_ATTRIBUTE_TYPE, value: impl Into<Vec<u8>>) -> Self {
        self.attributes
            .push((attribute, AttributeValue::Bytes(value.into())));
        self
    }

    /// A UTF-8 string, without any terminating NUL.
    #[must_use]
    pub fn string(self, attribute: CK_ATTRIBUTE_TYPE, value: &str) -> Self {
        self.bytes(attribute, value.as_bytes())
    }

    #[must_use]
    pub fn class(self, class: CK_OBJECT_CLASS) -> Self {
        self.ulong(CKA_CLASS, class)
    }

    #[must_use]
    pub fn key_type(self, key_type: CK_KEY_TYPE) -> Self {
        self.ulong(CKA_KEY_TYPE, key_type)
    }

    #[must_use]
    pub fn label(self, label: &str) -> Self {
        self.string(CKA_LABEL, label)
    }

    #[must_use]
    pub fn id(self, id: &[u8]) -> Self {
        self.bytes(CKA_ID, id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Attribute types in insertion order.
    pub fn attribute_types(&self) -> impl Iterator<Item = CK_ATTRIBUTE_TYPE> + '_ {
        self.attributes.iter().map(|(t, _)| *t)
    }

    /// Build the raw array handed to the library.
    ///
    /// The returned pointers borrow from `self`; the library only reads them.
    pub(crate) fn as_raw(&self) -> P11Result<Vec<CK_ATTRIBUTE>> {
        self.attributes
            .iter()
            .map(|(type_, value)| {
                let (p_value, len) = value.raw_parts();
                Ok(CK_ATTRIBUTE {
                    type_: *type_,
                    pValue: p_value.cast_mut(),
                    ulValueLen: CK_ULONG::try_from(len)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use pkcs11_sys::{
        CK_BBOOL, CK_TRUE, CK_ULONG, CKA_CLASS, CKA_LABEL, CKA_TOKEN, CKA_VALUE_LEN,
        CKO_SECRET_KEY,
    };

    use super::Template;
    use crate::vendor::CKA_HSS_LMS_TYPES;

    #[test]
    fn raw_attributes_point_at_owned_values() {
        let template = Template::new()
            .class(CKO_SECRET_KEY)
            .bool(CKA_TOKEN, true)
            .ulong(CKA_VALUE_LEN, 32)
            .label("MyAESKey");
        let raw = template.as_raw().unwrap();
        assert_eq!(raw.len(), 4);

        assert_eq!(raw[0].type_, CKA_CLASS);
        assert_eq!(raw[0].ulValueLen as usize, size_of::<CK_ULONG>());
        // SAFETY: points into `template`, which is still alive
        let class = unsafe { *raw[0].pValue.cast::<CK_ULONG>() };
        assert_eq!(class, CKO_SECRET_KEY);

        assert_eq!(raw[1].ulValueLen as usize, size_of::<CK_BBOOL>());
        let token = unsafe { *raw[1].pValue.cast::<CK_BBOOL>() };
        assert_eq!(token, CK_TRUE);

        let value_len = unsafe { *raw[2].pValue.cast::<CK_ULONG>() };
        assert_eq!(value_len, 32);

        assert_eq!(raw[3].type_, CKA_LABEL);
        let label = unsafe {
            std::slice::from_raw_parts(raw[3].pValue.cast::<u8>(), raw[3].ulValueLen as usize)
        };
        assert_eq!(label, b"MyAESKey");
    }

    #[test]
    fn ulong_arrays_are_sized_per_element() {
        let template = Template::new().ulongs(CKA_HSS_LMS_TYPES, &[5, 6, 7]);
        let raw = template.as_raw().unwrap();
        assert_eq!(raw[0].ulValueLen as usize, 3 * size_of::<CK_ULONG>());
        let values =
            unsafe { std::slice::from_raw_parts(raw[0].pValue.cast::<CK_ULONG>(), 3) };
        assert_eq!(values, &[5, 6, 7]);
    }

    #[test]
    fn empty_template() {
        let template = Template::new();
        assert!(template.is_empty());
        assert!(template.as_raw().unwrap().is_empty());
        let template = template.label("x").bool(CKA_TOKEN, false);
        assert_eq!(
            template.attribute_types().collect::<Vec<_>>(),
            vec![CKA_LABEL, CKA_TOKEN]
        );
    }
}
