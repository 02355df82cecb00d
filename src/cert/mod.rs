pub mod algorithm;
pub mod extensions;
pub mod params;
pub mod template;
pub mod usage;

use der::{Decode, DecodePem, Encode, EncodePem};
use x509_cert::certificate::CertificateInner;

use crate::error::CertBarError;
use crate::issuer::{Issuer, IssuerRef, sign};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::from_x509_time;
use algorithm::SignatureAlgorithm;
use extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, KeyUsage,
    SubjectAltName, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use params::{CertificateDescriptor, DistinguishedName, ExtensionParam, Validity};
use template::CertificateTemplate;

pub type Result<T> = std::result::Result<T, CertBarError>;

/// Represents an X.509 certificate.
///
/// This struct wraps a parsed certificate and exposes the fields this crate
/// writes and checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Parses a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let inner = CertificateInner::from_der(der)
            .map_err(|e| CertBarError::DecodingError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses a single PEM `CERTIFICATE` block.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = CertificateInner::from_pem(pem)
            .map_err(|e| CertBarError::DecodingError(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertBarError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertBarError::EncodingError(e.to_string()))
    }

    /// Builds a template from `descriptor` and signs it with the descriptor's
    /// own key.
    pub fn new_self_signed(descriptor: &CertificateDescriptor<'_>) -> Result<Self> {
        let template = CertificateTemplate::build(descriptor)?;
        let public_key = PublicKey::from_key_pair(descriptor.private_key);
        let der = sign(
            template,
            IssuerRef::SelfSigned,
            &public_key,
            descriptor.private_key,
        )?;
        Self::from_der(&der)
    }

    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.subject)
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(&self.inner.tbs_certificate.issuer)
    }

    /// `true` when the issuer name equals the subject name.
    pub fn is_self_issued(&self) -> bool {
        self.inner.tbs_certificate.issuer == self.inner.tbs_certificate.subject
    }

    /// Big-endian magnitude of the serial number, without the sign octet.
    pub fn serial_number(&self) -> &[u8] {
        let bytes = self.inner.tbs_certificate.serial_number.as_bytes();
        match bytes {
            [0, rest @ ..] if !rest.is_empty() => rest,
            _ => bytes,
        }
    }

    pub fn validity(&self) -> Validity {
        let validity = &self.inner.tbs_certificate.validity;
        Validity {
            not_before: from_x509_time(&validity.not_before),
            not_after: from_x509_time(&validity.not_after),
        }
    }

    /// The signature algorithm the issuer used, or `None` when it is not one
    /// this crate supports.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(&self.inner.signature_algorithm.oid)
    }

    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// Finds and decodes the extension `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        let Some(extensions) = &self.inner.tbs_certificate.extensions else {
            return Ok(None);
        };
        extensions
            .iter()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| E::from_x509_extension_value(ext.extn_value.as_bytes()))
            .transpose()
    }

    /// All extensions in encoded form.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    pub fn basic_constraints(&self) -> Result<Option<BasicConstraints>> {
        self.extension()
    }

    /// `true` when basic constraints are present and mark a CA.
    pub fn is_ca(&self) -> Result<bool> {
        Ok(self.basic_constraints()?.is_some_and(|bc| bc.is_ca))
    }

    pub fn key_usage(&self) -> Result<Option<KeyUsage>> {
        self.extension()
    }

    /// Extended key usages, or `None` when the extension is absent.
    pub fn extended_key_usage(&self) -> Result<Option<Vec<ExtendedKeyUsageOption>>> {
        Ok(self.extension::<ExtendedKeyUsage>()?.map(|eku| eku.usage))
    }

    /// DNS names of the Subject Alternative Name extension.
    pub fn dns_names(&self) -> Result<Vec<String>> {
        Ok(self
            .extension::<SubjectAltName>()?
            .map(|san| san.names)
            .unwrap_or_default())
    }

    pub fn subject_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0))
    }

    /// Key identifier of the authority key identifier extension. An
    /// extension without the `keyIdentifier` form counts as absent.
    pub fn authority_key_id(&self) -> Result<Option<Vec<u8>>> {
        Ok(self
            .extension::<AuthorityKeyIdentifier>()?
            .map(|aki| aki.key_identifier)
            .filter(|id| !id.is_empty()))
    }
}

/// A CA certificate together with its signing key.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issuer for CertificateWithPrivateKey {
    fn certificate(&self) -> &Certificate {
        &self.cert
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }
}
