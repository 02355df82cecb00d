use tracing::{debug, warn};

use super::algorithm::{SignatureAlgorithm, select_algorithm};
use super::extensions::{ExtendedKeyUsageOption, KeyUsage};
use super::params::{CertificateDescriptor, DistinguishedName, Validity};
use super::usage::resolve_usage;
use crate::error::CertBarError;
use crate::key::{KEY_IDENTIFIER_LEN, PublicKey, derive_key_identifier};

/// A fully resolved, signer-ready certificate description.
///
/// Templates are immutable. To change one, build a new one from an updated
/// [`CertificateDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateTemplate {
    serial_number: Vec<u8>,
    subject: DistinguishedName,
    validity: Validity,
    subject_key_id: [u8; KEY_IDENTIFIER_LEN],
    key_usage: KeyUsage,
    extended_key_usage: Vec<ExtendedKeyUsageOption>,
    dns_names: Vec<String>,
    basic_constraints_valid: bool,
    is_ca: bool,
    signature_algorithm: SignatureAlgorithm,
}

impl CertificateTemplate {
    /// Resolves a descriptor into a template.
    ///
    /// Fails only when the descriptor's public key cannot be encoded.
    pub fn build(descriptor: &CertificateDescriptor<'_>) -> Result<Self, CertBarError> {
        let key_kind = descriptor.private_key.key_kind();
        let public_key = PublicKey::from_key_pair(descriptor.private_key);
        let subject_key_id = derive_key_identifier(&public_key)?;
        let usage = resolve_usage(&descriptor.usage, descriptor.is_ca);
        let signature_algorithm = select_algorithm(&descriptor.signature_hash_algorithm, key_kind);

        if descriptor.valid_from >= descriptor.valid_to {
            warn!(
                id = %descriptor.id,
                valid_from = %descriptor.valid_from,
                valid_to = %descriptor.valid_to,
                "validity window is empty"
            );
        }

        let subject = DistinguishedName {
            common_name: Some(descriptor.common_name.clone()).filter(|cn| !cn.is_empty()),
            country: descriptor.country.clone(),
            organization: descriptor.organization.clone(),
            organizational_unit: descriptor.organizational_unit.clone(),
        };

        let template = Self {
            serial_number: serial_from_id(&descriptor.id),
            subject,
            validity: Validity {
                not_before: descriptor.valid_from,
                not_after: descriptor.valid_to,
            },
            subject_key_id,
            key_usage: usage.key_usage,
            extended_key_usage: usage.extended_key_usage,
            dns_names: dns_names(&descriptor.alternative_names, &descriptor.common_name),
            basic_constraints_valid: true,
            is_ca: descriptor.is_ca,
            signature_algorithm,
        };
        debug!(
            id = %descriptor.id,
            is_ca = template.is_ca,
            algorithm = %template.signature_algorithm,
            "built certificate template"
        );
        Ok(template)
    }

    /// Big-endian magnitude of the serial number, without leading zero bytes.
    pub fn serial_number(&self) -> &[u8] {
        &self.serial_number
    }

    pub fn subject(&self) -> &DistinguishedName {
        &self.subject
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn subject_key_id(&self) -> &[u8; KEY_IDENTIFIER_LEN] {
        &self.subject_key_id
    }

    pub fn key_usage(&self) -> KeyUsage {
        self.key_usage
    }

    pub fn extended_key_usage(&self) -> &[ExtendedKeyUsageOption] {
        &self.extended_key_usage
    }

    /// DNS names for the Subject Alternative Name extension. Empty means the
    /// extension is not written.
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    pub fn basic_constraints_valid(&self) -> bool {
        self.basic_constraints_valid
    }

    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    pub fn signature_algorithm(&self) -> SignatureAlgorithm {
        self.signature_algorithm
    }
}

/// Reads the id's bytes as a big-endian unsigned integer.
fn serial_from_id(id: &str) -> Vec<u8> {
    let magnitude: Vec<u8> = id.bytes().skip_while(|b| *b == 0).collect();
    if magnitude.is_empty() {
        vec![0]
    } else {
        magnitude
    }
}

/// Verifiers ignore the common name once a SAN extension is present, so a
/// non-empty common name is carried into the SAN list.
fn dns_names(alternative_names: &[String], common_name: &str) -> Vec<String> {
    if alternative_names.is_empty() {
        return Vec::new();
    }
    let mut names = alternative_names.to_vec();
    if !common_name.is_empty() && !names.iter().any(|name| name == common_name) {
        names.push(common_name.to_string());
    }
    names
}
