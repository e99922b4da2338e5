//! PDF encryption collaborator.
//!
//! Locks a paginated document under a passkey using the standard security
//! handler: user and owner passwords are both the passkey, and a fixed
//! permission profile allows high-resolution printing and accessibility
//! extraction while disallowing modification, copying, annotation, form
//! filling, and document assembly.

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, StringFormat};
use sha2::{Digest, Sha256};

use crate::raster::PaginatedDocument;
use crate::{Error, Result};

/// Optional secret string. A non-empty passkey selects the encrypted
/// delivery path; an empty one passes the document through unchanged. No
/// minimum length or complexity rule is enforced here.
#[derive(Debug, Clone, Default)]
pub struct Passkey(String);

impl Passkey {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The fixed permission profile applied to every encrypted document.
fn permission_profile() -> Permissions {
    Permissions::PRINTABLE
        | Permissions::PRINTABLE_IN_HIGH_QUALITY
        | Permissions::COPYABLE_FOR_ACCESSIBILITY
}

/// Encrypt a paginated document under the passkey.
///
/// The plaintext bytes must not be persisted once this returns. Fails with
/// an encryption error if the document does not load (malformed PDF) or
/// the primitive itself fails.
pub fn encrypt(document: &PaginatedDocument, passkey: &Passkey) -> Result<Vec<u8>> {
    let mut doc = Document::load_mem(&document.bytes)
        .map_err(|e| Error::Encryption(format!("Malformed document: {}", e)))?;

    // Key derivation needs the trailer /ID pair, which is optional in an
    // unencrypted PDF and absent from freshly generated documents.
    if doc.trailer.get(b"ID").is_err() {
        let id = Sha256::digest(&document.bytes)[..16].to_vec();
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
    }

    let state = {
        let version = EncryptionVersion::V2 {
            document: &doc,
            owner_password: passkey.as_str(),
            user_password: passkey.as_str(),
            key_length: 128,
            permissions: permission_profile(),
        };
        EncryptionState::try_from(version)
            .map_err(|e| Error::Encryption(format!("Failed to derive encryption state: {}", e)))?
    };

    doc.encrypt(&state)
        .map_err(|e| Error::Encryption(format!("Encryption primitive failed: {}", e)))?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| Error::Encryption(format!("Failed to serialize encrypted document: {}", e)))?;
    Ok(out)
}
