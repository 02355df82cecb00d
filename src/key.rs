use std::fmt;

use der::Encode;
use ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use p256::ecdsa::{SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey};
use p384::ecdsa::{SigningKey as P384SigningKey, VerifyingKey as P384VerifyingKey};
use pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha384, Sha512};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use crate::cert::algorithm::{HashAlgorithm, SignatureAlgorithm};
use crate::error::CertBarError;

pub type Result<T> = std::result::Result<T, CertBarError>;

const RSA_ENCRYPTION: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const ID_EC_PUBLIC_KEY: const_oid::ObjectIdentifier =
    const_oid::ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// Length in bytes of a subject key identifier.
pub const KEY_IDENTIFIER_LEN: usize = 20;

const P256_FIELD_LEN: usize = 32;
const P384_FIELD_LEN: usize = 48;

/// The key families that can sign certificates.
///
/// Signature algorithm identifiers are family specific, so an algorithm that
/// is valid for one kind is never valid for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Rsa,
    Ecdsa,
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Rsa => write!(f, "RSA"),
            KeyKind::Ecdsa => write!(f, "ECDSA"),
        }
    }
}

/// Supported key types for certificate operations.
#[derive(Debug, Clone)]
pub enum KeyPair {
    Rsa {
        private: Box<RsaPrivateKey>,
        public: RsaPublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
    EcdsaP384 {
        signing_key: P384SigningKey,
        verifying_key: P384VerifyingKey,
    },
}

impl KeyPair {
    /// Generate an RSA key pair with the specified number of bits.
    pub fn generate_rsa(bits: usize) -> Result<Self> {
        let mut rng = rand_core::OsRng;
        let private = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| CertBarError::KeyGenerationError(e.to_string()))?;
        Ok(Self::from_rsa(private))
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Generate an ECDSA P-384 key pair.
    pub fn generate_ecdsa_p384() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P384SigningKey::random(&mut rng);
        let verifying_key = *signing_key.verifying_key();
        KeyPair::EcdsaP384 {
            signing_key,
            verifying_key,
        }
    }

    fn from_rsa(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        KeyPair::Rsa {
            private: Box::new(private),
            public,
        }
    }

    /// Import a private key from an unencrypted PKCS#8 DER document.
    ///
    /// The key family is detected from the document itself. Keys of any
    /// other family are reported as [`CertBarError::UnsupportedKeyKind`].
    pub fn import_from_pkcs8_der(der: &[u8]) -> Result<Self> {
        if let Ok(private) = RsaPrivateKey::from_pkcs8_der(der) {
            return Ok(Self::from_rsa(private));
        }
        if let Ok(signing_key) = P256SigningKey::from_pkcs8_der(der) {
            let verifying_key = *signing_key.verifying_key();
            return Ok(KeyPair::EcdsaP256 {
                signing_key,
                verifying_key,
            });
        }
        if let Ok(signing_key) = P384SigningKey::from_pkcs8_der(der) {
            let verifying_key = *signing_key.verifying_key();
            return Ok(KeyPair::EcdsaP384 {
                signing_key,
                verifying_key,
            });
        }
        let info = pkcs8::PrivateKeyInfo::try_from(der)?;
        Err(CertBarError::UnsupportedKeyKind(format!(
            "private key algorithm {}",
            info.algorithm.oid
        )))
    }

    /// Import a private key from an unencrypted PKCS#8 PEM document (`PRIVATE KEY` block).
    pub fn import_from_pkcs8_pem(pem_str: &str) -> Result<Self> {
        let block = pem::parse(pem_str).map_err(|e| CertBarError::DecodingError(e.to_string()))?;
        if block.tag() != "PRIVATE KEY" {
            return Err(CertBarError::InvalidInput(format!(
                "expected a PRIVATE KEY block, found {}",
                block.tag()
            )));
        }
        Self::import_from_pkcs8_der(block.contents())
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            KeyPair::Rsa { .. } => KeyKind::Rsa,
            KeyPair::EcdsaP256 { .. } | KeyPair::EcdsaP384 { .. } => KeyKind::Ecdsa,
        }
    }

    /// Signs `data` with the given algorithm and returns the encoded signature
    /// (PKCS#1 v1.5 for RSA, DER `Ecdsa-Sig-Value` for ECDSA).
    pub fn sign_data(&self, algorithm: SignatureAlgorithm, data: &[u8]) -> Result<Vec<u8>> {
        let kind = self.key_kind();
        if algorithm.key_kind() != kind {
            return Err(CertBarError::SigningError(format!(
                "signature algorithm {algorithm} cannot be used with a {kind} key"
            )));
        }

        let digest = algorithm.hash().digest(data);
        match self {
            KeyPair::Rsa { private, .. } => private
                .sign(pkcs1v15_scheme(algorithm.hash()), &digest)
                .map_err(|e| CertBarError::SigningError(e.to_string())),
            KeyPair::EcdsaP256 { signing_key, .. } => {
                let signature: p256::ecdsa::Signature = signing_key
                    .sign_prehash(&pad_prehash(&digest, P256_FIELD_LEN))
                    .map_err(|e| CertBarError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            KeyPair::EcdsaP384 { signing_key, .. } => {
                let signature: p384::ecdsa::Signature = signing_key
                    .sign_prehash(&pad_prehash(&digest, P384_FIELD_LEN))
                    .map_err(|e| CertBarError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
        }
    }
}

/// Left-pads a digest shorter than the curve's field with zero bytes.
///
/// The padded value is the same integer as the digest, so the signature is
/// the one FIPS 186 defines for the short hash. `sign_prehash` otherwise
/// rejects digests shorter than half the field (SHA-1 on P-384).
fn pad_prehash(digest: &[u8], field_len: usize) -> Vec<u8> {
    if digest.len() >= field_len {
        return digest.to_vec();
    }
    let mut padded = vec![0u8; field_len - digest.len()];
    padded.extend_from_slice(digest);
    padded
}

fn pkcs1v15_scheme(hash: HashAlgorithm) -> Pkcs1v15Sign {
    match hash {
        HashAlgorithm::Sha1 => Pkcs1v15Sign::new::<Sha1>(),
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

/// Public half of a [`KeyPair`], or a key read from a certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    EcdsaP256(P256VerifyingKey),
    EcdsaP384(P384VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Rsa { public, .. } => PublicKey::Rsa(public.clone()),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
            KeyPair::EcdsaP384 { verifying_key, .. } => PublicKey::EcdsaP384(*verifying_key),
        }
    }

    /// Decodes the subject public key info of a certificate.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        let der = spki.to_der()?;
        match spki.algorithm.oid {
            RSA_ENCRYPTION => Ok(PublicKey::Rsa(RsaPublicKey::from_public_key_der(&der)?)),
            ID_EC_PUBLIC_KEY => {
                if let Ok(key) = P256VerifyingKey::from_public_key_der(&der) {
                    return Ok(PublicKey::EcdsaP256(key));
                }
                P384VerifyingKey::from_public_key_der(&der)
                    .map(PublicKey::EcdsaP384)
                    .map_err(|_| {
                        CertBarError::UnsupportedKeyKind(
                            "elliptic curve is not P-256 or P-384".to_string(),
                        )
                    })
            }
            other => Err(CertBarError::UnsupportedKeyKind(format!(
                "public key algorithm {other}"
            ))),
        }
    }

    pub fn key_kind(&self) -> KeyKind {
        match self {
            PublicKey::Rsa(_) => KeyKind::Rsa,
            PublicKey::EcdsaP256(_) | PublicKey::EcdsaP384(_) => KeyKind::Ecdsa,
        }
    }

    /// Encodes the key as a `SubjectPublicKeyInfo`.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        match self {
            PublicKey::Rsa(public) => Ok(SubjectPublicKeyInfoOwned::from_key(public.clone())?),
            PublicKey::EcdsaP256(verifying_key) => {
                Ok(SubjectPublicKeyInfoOwned::from_key(*verifying_key)?)
            }
            PublicKey::EcdsaP384(verifying_key) => {
                Ok(SubjectPublicKeyInfoOwned::from_key(*verifying_key)?)
            }
        }
    }

    /// The canonical bit representation of the key: the contents of the
    /// `subjectPublicKey` BIT STRING (PKCS#1 for RSA, an uncompressed SEC1
    /// point for elliptic-curve keys).
    pub fn subject_public_key_bits(&self) -> Result<Vec<u8>> {
        Ok(self.to_spki()?.subject_public_key.raw_bytes().to_vec())
    }

    /// See [`derive_key_identifier`].
    pub fn key_identifier(&self) -> Result<[u8; KEY_IDENTIFIER_LEN]> {
        derive_key_identifier(self)
    }

    /// Checks `signature` over `data`. Returns `false` when the algorithm
    /// does not belong to this key's family or the signature is malformed.
    pub fn verify_data(
        &self,
        algorithm: SignatureAlgorithm,
        data: &[u8],
        signature: &[u8],
    ) -> bool {
        if self.key_kind() != algorithm.key_kind() {
            return false;
        }

        let digest = algorithm.hash().digest(data);
        match self {
            PublicKey::Rsa(public) => public
                .verify(pkcs1v15_scheme(algorithm.hash()), &digest, signature)
                .is_ok(),
            PublicKey::EcdsaP256(verifying_key) => p256::ecdsa::Signature::from_der(signature)
                .map(|sig| {
                    verifying_key
                        .verify_prehash(&pad_prehash(&digest, P256_FIELD_LEN), &sig)
                        .is_ok()
                })
                .unwrap_or(false),
            PublicKey::EcdsaP384(verifying_key) => p384::ecdsa::Signature::from_der(signature)
                .map(|sig| {
                    verifying_key
                        .verify_prehash(&pad_prehash(&digest, P384_FIELD_LEN), &sig)
                        .is_ok()
                })
                .unwrap_or(false),
        }
    }
}

/// Computes the subject key identifier of a public key: SHA-1 over its
/// canonical bit representation.
///
/// The identifier only has to be stable so that descendants can reference
/// their issuer; it is not a security boundary.
pub fn derive_key_identifier(public_key: &PublicKey) -> Result<[u8; KEY_IDENTIFIER_LEN]> {
    let bits = public_key.subject_public_key_bits()?;
    let digest = Sha1::digest(&bits);
    let mut identifier = [0u8; KEY_IDENTIFIER_LEN];
    identifier.copy_from_slice(&digest);
    Ok(identifier)
}
