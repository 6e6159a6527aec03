use std::ptr;

use luna_logger::{debug, trace};
use pkcs11_sys::{
    CK_ATTRIBUTE, CK_ATTRIBUTE_TYPE, CK_OBJECT_HANDLE, CK_ULONG, CK_UNAVAILABLE_INFORMATION,
    CKR_OK,
};

use crate::{
    P11Error, P11Result, Session, Template, hsm_call, hsm_call_rv, p11_lib::padded_string,
};

/// The handle written by a `C_FindObjects` call bounded to one result.
fn first_found(handle: CK_OBJECT_HANDLE, count: CK_ULONG) -> Option<CK_OBJECT_HANDLE> {
    (count > 0).then_some(handle)
}

impl Session {
    /// All objects matching `template`, fetched `batch_size` handles at a time.
    pub fn find_objects(
        &self,
        template: &Template,
        batch_size: usize,
    ) -> P11Result<Vec<CK_OBJECT_HANDLE>> {
        let mut raw = template.as_raw()?;
        hsm_call!(
            self.lib,
            "Failed initializing object search",
            C_FindObjectsInit,
            self.handle,
            raw.as_mut_ptr(),
            CK_ULONG::try_from(raw.len())?
        );
        let found = self.collect_found(batch_size.max(1));
        hsm_call!(
            self.lib,
            "Failed finishing object search",
            C_FindObjectsFinal,
            self.handle
        );
        let found = found?;
        debug!("{} object(s) matched a {} attribute template", found.len(), template.len());
        Ok(found)
    }

    fn collect_found(&self, batch_size: usize) -> P11Result<Vec<CK_OBJECT_HANDLE>> {
        let mut found = Vec::new();
        let mut batch = vec![0 as CK_OBJECT_HANDLE; batch_size];
        loop {
            let mut count: CK_ULONG = 0;
            hsm_call!(
                self.lib,
                "Failed searching objects",
                C_FindObjects,
                self.handle,
                batch.as_mut_ptr(),
                CK_ULONG::try_from(batch.len())?,
                &raw mut count
            );
            let count = usize::try_from(count)?;
            trace!("search batch returned {count} handle(s)");
            found.extend_from_slice(&batch[..count.min(batch_size)]);
            if count < batch_size {
                return Ok(found);
            }
        }
    }

    /// First object matching `template`, if any, read with a single
    /// `C_FindObjects` call.
    pub fn find_first(&self, template: &Template) -> P11Result<Option<CK_OBJECT_HANDLE>> {
        let mut raw = template.as_raw()?;
        hsm_call!(
            self.lib,
            "Failed initializing object search",
            C_FindObjectsInit,
            self.handle,
            raw.as_mut_ptr(),
            CK_ULONG::try_from(raw.len())?
        );
        let mut handle: CK_OBJECT_HANDLE = 0;
        let mut count: CK_ULONG = 0;
        let rv = hsm_call_rv!(
            self.lib,
            C_FindObjects,
            self.handle,
            &raw mut handle,
            1,
            &raw mut count
        );
        hsm_call!(
            self.lib,
            "Failed finishing object search",
            C_FindObjectsFinal,
            self.handle
        );
        if rv != CKR_OK {
            return Err(P11Error::Pkcs11 {
                context: "Failed searching objects".to_owned(),
                function: "C_FindObjects",
                rv,
            });
        }
        trace!("single handle search returned {count} handle(s)");
        Ok(first_found(handle, count))
    }

    pub fn count_objects(&self, template: &Template, batch_size: usize) -> P11Result<usize> {
        Ok(self.find_objects(template, batch_size)?.len())
    }

    /// Raw value of one attribute, sized with a first length query.
    pub fn get_attribute_value(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
    ) -> P11Result<Vec<u8>> {
        let mut query = CK_ATTRIBUTE {
            type_: attribute,
            pValue: ptr::null_mut(),
            ulValueLen: 0,
        };
        hsm_call!(
            self.lib,
            format!("Failed reading attribute 0x{attribute:X} length of object {object}"),
            C_GetAttributeValue,
            self.handle,
            object,
            &raw mut query,
            1
        );
        if query.ulValueLen == CK_UNAVAILABLE_INFORMATION {
            return Err(P11Error::Default(format!(
                "Attribute 0x{attribute:X} of object {object} is not available"
            )));
        }
        let mut value = vec![0_u8; usize::try_from(query.ulValueLen)?];
        query.pValue = value.as_mut_ptr().cast();
        hsm_call!(
            self.lib,
            format!("Failed reading attribute 0x{attribute:X} of object {object}"),
            C_GetAttributeValue,
            self.handle,
            object,
            &raw mut query,
            1
        );
        value.truncate(usize::try_from(query.ulValueLen)?);
        Ok(value)
    }

    pub fn get_ulong_attribute(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
    ) -> P11Result<CK_ULONG> {
        let mut value: CK_ULONG = 0;
        let mut attr = CK_ATTRIBUTE {
            type_: attribute,
            pValue: (&raw mut value).cast(),
            ulValueLen: CK_ULONG::try_from(size_of::<CK_ULONG>())?,
        };
        hsm_call!(
            self.lib,
            format!("Failed reading attribute 0x{attribute:X} of object {object}"),
            C_GetAttributeValue,
            self.handle,
            object,
            &raw mut attr,
            1
        );
        Ok(value)
    }

    pub fn get_bytes_attribute(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
    ) -> P11Result<Vec<u8>> {
        self.get_attribute_value(object, attribute)
    }

    pub fn get_string_attribute(
        &self,
        object: CK_OBJECT_HANDLE,
        attribute: CK_ATTRIBUTE_TYPE,
    ) -> P11Result<String> {
        Ok(padded_string(&self.get_attribute_value(object, attribute)?))
    }

    pub fn destroy_object(&self, object: CK_OBJECT_HANDLE) -> P11Result<()> {
        hsm_call!(
            self.lib,
            format!("Failed destroying object {object}"),
            C_DestroyObject,
            self.handle,
            object
        );
        debug!("Destroyed object {object}");
        Ok(())
    }
}
