use bon::Builder;
use const_oid::ObjectIdentifier;
use der::Tag;
use der::asn1::{Any, SetOfVec};
use time::Duration;
use time::OffsetDateTime;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::{RdnSequence, RelativeDistinguishedName};

use super::extensions::ToAndFromX509Extension;
use crate::error::CertBarError;
use crate::key::KeyPair;

const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const ORGANIZATION_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const ORGANIZATIONAL_UNIT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");
const COMMON_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// Domain-level description of a certificate to issue.
///
/// # Fields
/// * `id` - Serial number source. Its bytes are read as a big-endian integer.
/// * `country`, `organization`, `organizational_unit` - Subject attributes, written when present.
/// * `common_name` - Subject CN, written only when non-empty.
/// * `alternative_names` - DNS names for the Subject Alternative Name extension.
/// * `usage` - Usage tokens (`certsign`, `serverauth`, ...). Empty selects the defaults.
/// * `is_ca` - Marks the certificate as a CA.
/// * `private_key` - Key of the subject. Its public half is certified.
/// * `signature_hash_algorithm` - `SHA1`, `SHA256`, `SHA384` or `SHA512`. Anything else
///   means `SHA256`.
/// * `valid_from`, `valid_to` - Validity window.
#[derive(Clone, Debug, Builder)]
pub struct CertificateDescriptor<'a> {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organizational_unit: Option<String>,
    #[builder(into, default)]
    pub common_name: String,
    #[builder(default)]
    pub alternative_names: Vec<String>,
    #[builder(default)]
    pub usage: Vec<String>,
    #[builder(default)]
    pub is_ca: bool,
    pub private_key: &'a KeyPair,
    #[builder(into, default)]
    pub signature_hash_algorithm: String,
    pub valid_from: OffsetDateTime,
    pub valid_to: OffsetDateTime,
}

/// Distinguished name of a certificate subject or issuer.
///
/// # Fields
/// * `common_name` - The common name (CN).
/// * `country` - The country (C).
/// * `organization` - The organization (O).
/// * `organizational_unit` - The organizational unit (OU).
#[derive(Clone, Debug, Builder, Default, PartialEq, Eq)]
pub struct DistinguishedName {
    #[builder(into)]
    pub common_name: Option<String>,
    #[builder(into)]
    pub country: Option<String>,
    #[builder(into)]
    pub organization: Option<String>,
    #[builder(into)]
    pub organizational_unit: Option<String>,
}

impl DistinguishedName {
    pub fn is_empty(&self) -> bool {
        self.common_name.is_none()
            && self.country.is_none()
            && self.organization.is_none()
            && self.organizational_unit.is_none()
    }

    /// Converts the distinguished name to an X.509 name, one attribute per RDN
    /// in C, O, OU, CN order.
    pub fn as_x509_name(&self) -> Result<x509_cert::name::DistinguishedName, CertBarError> {
        let attributes = [
            (COUNTRY_NAME, Tag::PrintableString, &self.country),
            (ORGANIZATION_NAME, Tag::Utf8String, &self.organization),
            (ORGANIZATIONAL_UNIT_NAME, Tag::Utf8String, &self.organizational_unit),
            (COMMON_NAME, Tag::Utf8String, &self.common_name),
        ];

        let mut rdns = Vec::new();
        for (oid, tag, value) in attributes {
            let Some(value) = value else { continue };
            let attribute = AttributeTypeAndValue {
                oid,
                value: Any::new(tag, value.as_bytes())?,
            };
            rdns.push(RelativeDistinguishedName(SetOfVec::try_from(vec![attribute])?));
        }
        Ok(RdnSequence(rdns))
    }

    /// Creates a `DistinguishedName` from an X.509 name.
    ///
    /// Attributes other than C, O, OU and CN are ignored. When an attribute
    /// repeats, the last value wins.
    pub fn from_x509_name(x509dn: &x509_cert::name::DistinguishedName) -> Self {
        let mut name = DistinguishedName::default();
        for rdn in x509dn.0.iter() {
            for attr in rdn.0.iter() {
                let value = String::from_utf8_lossy(attr.value.value()).into_owned();
                match attr.oid {
                    COUNTRY_NAME => name.country = Some(value),
                    ORGANIZATION_NAME => name.organization = Some(value),
                    ORGANIZATIONAL_UNIT_NAME => name.organizational_unit = Some(value),
                    COMMON_NAME => name.common_name = Some(value),
                    _ => {}
                }
            }
        }
        name
    }
}

/// Certificate validity period.
///
/// This struct represents the `notBefore` and `notAfter` fields in a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validity {
    pub not_before: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

impl Validity {
    /// Creates a validity period starting now for the given number of days.
    ///
    /// The start is truncated to whole seconds, the precision certificates
    /// store.
    pub fn for_days(days: i64) -> Self {
        let now = OffsetDateTime::now_utc();
        let now = now - Duration::nanoseconds(i64::from(now.nanosecond()));
        Self {
            not_before: now,
            not_after: now + Duration::days(days),
        }
    }

    pub fn contains(&self, instant: OffsetDateTime) -> bool {
        self.not_before <= instant && instant <= self.not_after
    }
}

/// Represents an X.509 extension.
///
/// This struct contains the OID, criticality, and value of an extension.
///
/// # Fields
/// * `oid` - The object identifier of the extension.
/// * `critical` - Indicates if the extension is critical.
/// * `value` - The DER-encoded value of the extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionParam {
    pub oid: ObjectIdentifier,
    pub critical: bool,
    /// DER-encoded extension value
    pub value: Vec<u8>,
}

impl ExtensionParam {
    /// Creates an `ExtensionParam` from a specific extension.
    pub fn from_extension<E: ToAndFromX509Extension>(
        extension: E,
        critical: bool,
    ) -> Result<Self, CertBarError> {
        Ok(Self {
            oid: E::OID,
            critical,
            value: extension.to_x509_extension_value()?,
        })
    }

    /// Decodes an `ExtensionParam` into a specific extension.
    pub fn to_extension<E: ToAndFromX509Extension>(&self) -> Result<E, CertBarError> {
        E::from_x509_extension_value(&self.value)
    }
}
