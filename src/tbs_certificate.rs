use der::asn1::{GeneralizedTime, OctetString, UtcTime};
use time::OffsetDateTime;
use x509_cert::Version;
use x509_cert::certificate::TbsCertificateInner;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::algorithm::SignatureAlgorithm;
use crate::cert::params::{ExtensionParam, Validity};
use crate::error::CertBarError;
use crate::key::PublicKey;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
/// This struct contains all the fields required to generate a valid X.509 certificate.
///
/// # Fields
/// * `serial_number` - Big-endian magnitude of the serial number.
/// * `signature_algorithm` - The algorithm the issuer signs with.
/// * `issuer` - The encoded name of the certificate issuer.
/// * `validity` - The certificate's validity period.
/// * `subject` - The encoded name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - X.509 extensions in the order they are written.
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub signature_algorithm: SignatureAlgorithm,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    ///
    /// Fails with [`CertBarError::SigningError`] when the serial number does
    /// not fit in 20 octets.
    pub fn to_tbs_certificate_inner(&self) -> Result<TbsCertificateInner, CertBarError> {
        let serial_number = SerialNumber::new(&self.serial_number).map_err(|e| {
            CertBarError::SigningError(format!("invalid serial number: {e}"))
        })?;

        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>, CertBarError>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number,
            signature: self.signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(extensions).filter(|exts| !exts.is_empty()),
        })
    }
}

/// RFC 5280 time encoding: UTCTime through 2049, GeneralizedTime after.
pub(crate) fn to_x509_time(instant: OffsetDateTime) -> Result<Time, CertBarError> {
    let system_time: std::time::SystemTime = instant.into();
    if instant.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_system_time(system_time)?))
    } else {
        Ok(Time::GeneralTime(GeneralizedTime::from_system_time(
            system_time,
        )?))
    }
}

pub(crate) fn from_x509_time(time: &Time) -> OffsetDateTime {
    match time {
        Time::UtcTime(ut) => OffsetDateTime::from(ut.to_system_time()),
        Time::GeneralTime(gt) => OffsetDateTime::from(gt.to_system_time()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{Date, Month};

    fn utc(year: i32, month: Month, day: u8, hour: u8, minute: u8, second: u8) -> OffsetDateTime {
        Date::from_calendar_date(year, month, day)
            .unwrap()
            .with_hms(hour, minute, second)
            .unwrap()
            .assume_utc()
    }

    #[test]
    fn times_before_2050_use_utc_time() {
        let instant = utc(2049, Month::December, 31, 23, 59, 59);
        let time = to_x509_time(instant).unwrap();
        assert!(matches!(time, Time::UtcTime(_)));
        assert_eq!(from_x509_time(&time), instant);
    }

    #[test]
    fn times_from_2050_use_generalized_time() {
        let instant = utc(2050, Month::January, 1, 0, 0, 0);
        let time = to_x509_time(instant).unwrap();
        assert!(matches!(time, Time::GeneralTime(_)));
        assert_eq!(from_x509_time(&time), instant);
    }

    #[test]
    fn overlong_serial_is_a_signing_error() {
        let key = crate::key::KeyPair::generate_ecdsa_p256();
        let tbs = TbsCertificate {
            serial_number: vec![0x41; 21],
            signature_algorithm: SignatureAlgorithm::EcdsaWithSha256,
            issuer: Name::default(),
            validity: Validity::for_days(1),
            subject: Name::default(),
            subject_public_key: PublicKey::from_key_pair(&key),
            extensions: Vec::new(),
        };
        let err = tbs.to_tbs_certificate_inner().unwrap_err();
        assert!(matches!(err, CertBarError::SigningError(_)));
    }
}
