//! # CertBar - Small Private X.509 Hierarchies in Pure Rust
//!
//! CertBar turns a compact certificate description into signed X.509
//! certificates and checks that a leaf chains to a root. It is built entirely
//! on rustcrypto libraries.
//!
//! ## Supported Key Types
//!
//! - **RSA**: any modulus size the `rsa` crate can generate
//! - **ECDSA**: P-256 and P-384 curves
//!
//! Keys of any other family are rejected on import with
//! [`error::CertBarError::UnsupportedKeyKind`].
//!
//! ## Signature Algorithms
//!
//! The hash is picked by name (`SHA1`, `SHA256`, `SHA384`, `SHA512`) and
//! paired with the signing key's family. Any other name selects SHA-256.
//!
//! ## Quick Start
//!
//! ### Generating a Self-Signed Root
//!
//! ```rust,no_run
//! use certbar::{
//!     cert::{Certificate, params::{CertificateDescriptor, Validity}},
//!     key::KeyPair,
//! };
//!
//! # fn main() -> Result<(), certbar::error::CertBarError> {
//! let key_pair = KeyPair::generate_ecdsa_p256();
//! let validity = Validity::for_days(3650);
//!
//! let descriptor = CertificateDescriptor::builder()
//!     .id("root-1")
//!     .common_name("Example Root CA")
//!     .organization("Example Corp")
//!     .country("US")
//!     .is_ca(true)
//!     .private_key(&key_pair)
//!     .valid_from(validity.not_before)
//!     .valid_to(validity.not_after)
//!     .build();
//!
//! let root = Certificate::new_self_signed(&descriptor)?;
//! println!("{}", root.to_pem()?);
//! # Ok(())
//! # }
//! ```
//!
//! ### Issuing and Verifying a Server Certificate
//!
//! ```rust,no_run
//! use certbar::{
//!     cert::{Certificate, CertificateWithPrivateKey, params::{CertificateDescriptor, Validity}},
//!     issuer::Issuer,
//!     key::KeyPair,
//!     verify::check_certificate,
//! };
//!
//! # fn main() -> Result<(), certbar::error::CertBarError> {
//! let ca_key = KeyPair::generate_ecdsa_p256();
//! let validity = Validity::for_days(365);
//! let ca_descriptor = CertificateDescriptor::builder()
//!     .id("ca")
//!     .common_name("Example CA")
//!     .is_ca(true)
//!     .private_key(&ca_key)
//!     .valid_from(validity.not_before)
//!     .valid_to(validity.not_after)
//!     .build();
//! let ca = CertificateWithPrivateKey {
//!     cert: Certificate::new_self_signed(&ca_descriptor)?,
//!     key: ca_key,
//! };
//!
//! let server_key = KeyPair::generate_ecdsa_p256();
//! let server_descriptor = CertificateDescriptor::builder()
//!     .id("server-1")
//!     .common_name("example.com")
//!     .alternative_names(vec!["www.example.com".to_string()])
//!     .private_key(&server_key)
//!     .valid_from(validity.not_before)
//!     .valid_to(validity.not_after)
//!     .build();
//! let server = ca.issue(&server_descriptor)?;
//!
//! let trusted = check_certificate(
//!     "example.com",
//!     &ca.cert.to_der()?,
//!     &[],
//!     &server.to_der()?,
//! );
//! assert!(trusted);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Building and signing report [`error::CertBarError`]. Verification keeps
//! malformed input apart from untrusted certificates:
//!
//! ```rust
//! use certbar::{error::VerifyError, verify::verify_chain};
//!
//! match verify_chain("example.com", b"not a certificate", &[], b"") {
//!     Ok(chain) => println!("trusted, {} certificates", chain.len()),
//!     Err(VerifyError::Parse { role, reason }) => println!("bad {role} input: {reason}"),
//!     Err(VerifyError::Untrusted(e)) => println!("not trusted: {e}"),
//! }
//! ```
//!
//! ## Logging
//!
//! Diagnostics are emitted as `tracing` events. The library installs no
//! subscriber.
//!
//! ## Module Organization
//!
//! - [`key`]: Key generation, import, and key identifiers
//! - [`cert`]: Certificate descriptions, templates, extensions, and parsed certificates
//! - [`issuer`]: Signing templates into certificates
//! - [`verify`]: Chain building and verification
//! - [`error`]: Error types
//! - [`tbs_certificate`]: Low-level certificate structure assembly
//! - [`pem_utils`]: PEM framing

pub mod cert;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod verify;
