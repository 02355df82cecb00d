use std::fmt;

use const_oid::ObjectIdentifier;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use tracing::warn;

use crate::key::KeyKind;

const SHA_1_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");
const SHA_256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const SHA_384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const SHA_512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const ECDSA_WITH_SHA_1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.1");
const ECDSA_WITH_SHA_256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const ECDSA_WITH_SHA_384: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");
const ECDSA_WITH_SHA_512: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

/// Hash strengths that can be requested for a certificate signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parses a hash token (`SHA1`, `SHA256`, `SHA384`, `SHA512`). Tokens are
    /// case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "SHA1" => Some(HashAlgorithm::Sha1),
            "SHA256" => Some(HashAlgorithm::Sha256),
            "SHA384" => Some(HashAlgorithm::Sha384),
            "SHA512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }

    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Represents the supported signature algorithms for certificates.
///
/// Each variant belongs to exactly one [`KeyKind`] and maps to its OID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// SHA-1 with RSA encryption.
    Sha1WithRsa,
    /// SHA-256 with RSA encryption.
    Sha256WithRsa,
    /// SHA-384 with RSA encryption.
    Sha384WithRsa,
    /// SHA-512 with RSA encryption.
    Sha512WithRsa,
    /// ECDSA with SHA-1.
    EcdsaWithSha1,
    /// ECDSA with SHA-256.
    EcdsaWithSha256,
    /// ECDSA with SHA-384.
    EcdsaWithSha384,
    /// ECDSA with SHA-512.
    EcdsaWithSha512,
}

impl SignatureAlgorithm {
    /// The algorithm of `kind`'s family that signs with `hash`.
    pub fn for_key_kind(kind: KeyKind, hash: HashAlgorithm) -> Self {
        match (kind, hash) {
            (KeyKind::Rsa, HashAlgorithm::Sha1) => SignatureAlgorithm::Sha1WithRsa,
            (KeyKind::Rsa, HashAlgorithm::Sha256) => SignatureAlgorithm::Sha256WithRsa,
            (KeyKind::Rsa, HashAlgorithm::Sha384) => SignatureAlgorithm::Sha384WithRsa,
            (KeyKind::Rsa, HashAlgorithm::Sha512) => SignatureAlgorithm::Sha512WithRsa,
            (KeyKind::Ecdsa, HashAlgorithm::Sha1) => SignatureAlgorithm::EcdsaWithSha1,
            (KeyKind::Ecdsa, HashAlgorithm::Sha256) => SignatureAlgorithm::EcdsaWithSha256,
            (KeyKind::Ecdsa, HashAlgorithm::Sha384) => SignatureAlgorithm::EcdsaWithSha384,
            (KeyKind::Ecdsa, HashAlgorithm::Sha512) => SignatureAlgorithm::EcdsaWithSha512,
        }
    }

    pub fn key_kind(self) -> KeyKind {
        match self {
            SignatureAlgorithm::Sha1WithRsa
            | SignatureAlgorithm::Sha256WithRsa
            | SignatureAlgorithm::Sha384WithRsa
            | SignatureAlgorithm::Sha512WithRsa => KeyKind::Rsa,
            SignatureAlgorithm::EcdsaWithSha1
            | SignatureAlgorithm::EcdsaWithSha256
            | SignatureAlgorithm::EcdsaWithSha384
            | SignatureAlgorithm::EcdsaWithSha512 => KeyKind::Ecdsa,
        }
    }

    pub fn hash(self) -> HashAlgorithm {
        match self {
            SignatureAlgorithm::Sha1WithRsa | SignatureAlgorithm::EcdsaWithSha1 => {
                HashAlgorithm::Sha1
            }
            SignatureAlgorithm::Sha256WithRsa | SignatureAlgorithm::EcdsaWithSha256 => {
                HashAlgorithm::Sha256
            }
            SignatureAlgorithm::Sha384WithRsa | SignatureAlgorithm::EcdsaWithSha384 => {
                HashAlgorithm::Sha384
            }
            SignatureAlgorithm::Sha512WithRsa | SignatureAlgorithm::EcdsaWithSha512 => {
                HashAlgorithm::Sha512
            }
        }
    }

    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sha1WithRsa => SHA_1_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha256WithRsa => SHA_256_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha384WithRsa => SHA_384_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::Sha512WithRsa => SHA_512_WITH_RSA_ENCRYPTION,
            SignatureAlgorithm::EcdsaWithSha1 => ECDSA_WITH_SHA_1,
            SignatureAlgorithm::EcdsaWithSha256 => ECDSA_WITH_SHA_256,
            SignatureAlgorithm::EcdsaWithSha384 => ECDSA_WITH_SHA_384,
            SignatureAlgorithm::EcdsaWithSha512 => ECDSA_WITH_SHA_512,
        }
    }

    /// Looks up the algorithm named by a certificate's `signatureAlgorithm`.
    pub fn from_oid(oid: &ObjectIdentifier) -> Option<Self> {
        [
            SignatureAlgorithm::Sha1WithRsa,
            SignatureAlgorithm::Sha256WithRsa,
            SignatureAlgorithm::Sha384WithRsa,
            SignatureAlgorithm::Sha512WithRsa,
            SignatureAlgorithm::EcdsaWithSha1,
            SignatureAlgorithm::EcdsaWithSha256,
            SignatureAlgorithm::EcdsaWithSha384,
            SignatureAlgorithm::EcdsaWithSha512,
        ]
        .into_iter()
        .find(|algorithm| algorithm.oid() == *oid)
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignatureAlgorithm::Sha1WithRsa => "sha1WithRSAEncryption",
            SignatureAlgorithm::Sha256WithRsa => "sha256WithRSAEncryption",
            SignatureAlgorithm::Sha384WithRsa => "sha384WithRSAEncryption",
            SignatureAlgorithm::Sha512WithRsa => "sha512WithRSAEncryption",
            SignatureAlgorithm::EcdsaWithSha1 => "ecdsa-with-SHA1",
            SignatureAlgorithm::EcdsaWithSha256 => "ecdsa-with-SHA256",
            SignatureAlgorithm::EcdsaWithSha384 => "ecdsa-with-SHA384",
            SignatureAlgorithm::EcdsaWithSha512 => "ecdsa-with-SHA512",
        };
        f.write_str(name)
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Converts a `SignatureAlgorithm` into an `AlgorithmIdentifierOwned`.
    ///
    /// RSA algorithms carry an explicit NULL parameter, ECDSA algorithms
    /// omit the parameters.
    fn from(value: SignatureAlgorithm) -> Self {
        let parameters = match value.key_kind() {
            KeyKind::Rsa => Some(der::AnyRef::NULL.into()),
            KeyKind::Ecdsa => None,
        };
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters,
        }
    }
}

/// Picks the signature algorithm for a key kind and a requested hash token.
///
/// Unrecognized tokens, including the empty string, fall back to the
/// family's SHA-256 variant.
pub fn select_algorithm(hash_token: &str, kind: KeyKind) -> SignatureAlgorithm {
    let hash = HashAlgorithm::from_token(hash_token).unwrap_or_else(|| {
        if !hash_token.is_empty() {
            warn!(token = hash_token, "unrecognized signature hash, using SHA256");
        }
        HashAlgorithm::Sha256
    });
    SignatureAlgorithm::for_key_kind(kind, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("SHA1", KeyKind::Rsa => SignatureAlgorithm::Sha1WithRsa)]
    #[test_case("SHA256", KeyKind::Rsa => SignatureAlgorithm::Sha256WithRsa)]
    #[test_case("SHA384", KeyKind::Rsa => SignatureAlgorithm::Sha384WithRsa)]
    #[test_case("SHA512", KeyKind::Rsa => SignatureAlgorithm::Sha512WithRsa)]
    #[test_case("", KeyKind::Rsa => SignatureAlgorithm::Sha256WithRsa)]
    #[test_case("unknown", KeyKind::Rsa => SignatureAlgorithm::Sha256WithRsa)]
    #[test_case("SHA1", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha1)]
    #[test_case("SHA256", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha256)]
    #[test_case("SHA384", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha384)]
    #[test_case("SHA512", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha512)]
    #[test_case("", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha256)]
    #[test_case("unknown", KeyKind::Ecdsa => SignatureAlgorithm::EcdsaWithSha256)]
    fn selects_algorithm(token: &str, kind: KeyKind) -> SignatureAlgorithm {
        let algorithm = select_algorithm(token, kind);
        assert_eq!(algorithm.key_kind(), kind);
        algorithm
    }

    #[test]
    fn hash_tokens_are_case_sensitive() {
        assert_eq!(
            select_algorithm("sha512", KeyKind::Rsa),
            SignatureAlgorithm::Sha256WithRsa
        );
    }

    #[test]
    fn oid_lookup_is_inverse_of_oid() {
        for kind in [KeyKind::Rsa, KeyKind::Ecdsa] {
            for hash in [
                HashAlgorithm::Sha1,
                HashAlgorithm::Sha256,
                HashAlgorithm::Sha384,
                HashAlgorithm::Sha512,
            ] {
                let algorithm = SignatureAlgorithm::for_key_kind(kind, hash);
                assert_eq!(SignatureAlgorithm::from_oid(&algorithm.oid()), Some(algorithm));
                assert_eq!(algorithm.hash(), hash);
            }
        }
    }

    #[test]
    fn rsa_identifiers_carry_null_parameters() {
        let rsa: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::Sha256WithRsa.into();
        assert!(rsa.parameters.is_some());

        let ecdsa: x509_cert::spki::AlgorithmIdentifierOwned =
            SignatureAlgorithm::EcdsaWithSha384.into();
        assert!(ecdsa.parameters.is_none());
    }
}
