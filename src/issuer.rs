use der::Encode;
use der::asn1::BitString;
use tracing::{info, warn};
use x509_cert::certificate::CertificateInner;

use crate::cert::Certificate;
use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, SubjectAltName,
    SubjectKeyIdentifier,
};
use crate::cert::params::{CertificateDescriptor, ExtensionParam};
use crate::cert::template::CertificateTemplate;
use crate::error::CertBarError;
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::TbsCertificate;

pub type Result<T> = std::result::Result<T, CertBarError>;

/// The issuer of a certificate being signed.
#[derive(Debug, Clone, Copy)]
pub enum IssuerRef<'a> {
    /// The template is its own issuer.
    SelfSigned,
    /// The template is issued by this certificate.
    Certificate(&'a Certificate),
}

/// Signs `template` and returns the DER-encoded certificate.
///
/// The issuer name and authority key identifier come from `issuer`; a
/// self-signed certificate carries its own subject as issuer and no
/// authority key identifier. `issuer_key` must belong to the family of the
/// template's signature algorithm and, for a parent certificate, must match
/// the parent's public key.
///
/// Every failure is reported as [`CertBarError::SigningError`].
pub fn sign(
    template: CertificateTemplate,
    issuer: IssuerRef<'_>,
    subject_public_key: &PublicKey,
    issuer_key: &KeyPair,
) -> Result<Vec<u8>> {
    let serial_number = template.serial_number().to_vec();
    sign_template(&template, issuer, subject_public_key, issuer_key)
        .map_err(|err| match err {
            CertBarError::SigningError(_) => err,
            other => CertBarError::SigningError(other.to_string()),
        })
        .inspect(|der| {
            info!(
                serial = %hex(&serial_number),
                self_signed = matches!(issuer, IssuerRef::SelfSigned),
                size = der.len(),
                "signed certificate"
            );
        })
        .inspect_err(|err| {
            warn!(serial = %hex(&serial_number), error = %err, "failed to sign certificate");
        })
}

fn sign_template(
    template: &CertificateTemplate,
    issuer: IssuerRef<'_>,
    subject_public_key: &PublicKey,
    issuer_key: &KeyPair,
) -> Result<Vec<u8>> {
    let algorithm = template.signature_algorithm();
    let issuer_kind = issuer_key.key_kind();
    if algorithm.key_kind() != issuer_kind {
        return Err(CertBarError::SigningError(format!(
            "{algorithm} cannot be produced by an {issuer_kind} issuer key"
        )));
    }

    let subject = template.subject().as_x509_name()?;
    let (issuer_name, authority_key_id) = match issuer {
        IssuerRef::SelfSigned => (subject.clone(), None),
        IssuerRef::Certificate(parent) => {
            if parent.public_key()? != PublicKey::from_key_pair(issuer_key) {
                return Err(CertBarError::SigningError(
                    "issuer key does not match the issuer certificate".to_string(),
                ));
            }
            (
                parent.inner.tbs_certificate.subject.clone(),
                parent.subject_key_id()?,
            )
        }
    };

    let tbs_certificate = TbsCertificate {
        serial_number: template.serial_number().to_vec(),
        signature_algorithm: algorithm,
        issuer: issuer_name,
        validity: template.validity().clone(),
        subject,
        subject_public_key: subject_public_key.clone(),
        extensions: extensions_for(template, authority_key_id)?,
    }
    .to_tbs_certificate_inner()?;

    let signature = issuer_key.sign_data(algorithm, &tbs_certificate.to_der()?)?;

    let certificate = CertificateInner {
        tbs_certificate,
        signature_algorithm: algorithm.into(),
        signature: BitString::from_bytes(&signature)?,
    };
    Ok(certificate.to_der()?)
}

fn extensions_for(
    template: &CertificateTemplate,
    authority_key_id: Option<Vec<u8>>,
) -> Result<Vec<ExtensionParam>> {
    let mut extensions = vec![ExtensionParam::from_extension(
        SubjectKeyIdentifier(template.subject_key_id().to_vec()),
        false,
    )?];

    let key_usage = template.key_usage();
    if !key_usage.0.is_empty() {
        extensions.push(ExtensionParam::from_extension(key_usage, true)?);
    }

    if !template.extended_key_usage().is_empty() {
        let extended_key_usage = ExtendedKeyUsage {
            usage: template.extended_key_usage().to_vec(),
        };
        extensions.push(ExtensionParam::from_extension(extended_key_usage, false)?);
    }

    if template.basic_constraints_valid() {
        let basic_constraints = BasicConstraints {
            is_ca: template.is_ca(),
            max_path_length: None,
        };
        extensions.push(ExtensionParam::from_extension(basic_constraints, true)?);
    }

    if !template.dns_names().is_empty() {
        let san = SubjectAltName {
            names: template.dns_names().to_vec(),
        };
        // RFC 5280 4.2.1.6: critical when the subject is empty.
        let critical = template.subject().is_empty();
        extensions.push(ExtensionParam::from_extension(san, critical)?);
    }

    if let Some(key_identifier) = authority_key_id {
        extensions.push(ExtensionParam::from_extension(
            AuthorityKeyIdentifier { key_identifier },
            false,
        )?);
    }

    Ok(extensions)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Represents an entity capable of issuing certificates.
///
/// Implementors provide the issuing certificate and its signing key;
/// [`Issuer::issue`] builds and signs a child certificate from a descriptor.
pub trait Issuer {
    /// Returns the certificate of the issuer.
    fn certificate(&self) -> &Certificate;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// Issues a certificate for the subject described by `descriptor`.
    ///
    /// The descriptor's key is the subject key. The signature algorithm is
    /// picked for that key, so it must be of the same kind as the issuer's
    /// signing key.
    fn issue(&self, descriptor: &CertificateDescriptor<'_>) -> Result<Certificate> {
        let template = CertificateTemplate::build(descriptor)?;
        let subject_public_key = PublicKey::from_key_pair(descriptor.private_key);
        let der = sign(
            template,
            IssuerRef::Certificate(self.certificate()),
            &subject_public_key,
            self.signing_key(),
        )?;
        Certificate::from_der(&der)
    }
}
