//! Certificate chain verification.
//!
//! A leaf is trusted when a path of signatures leads from it, through
//! optional intermediates, to a certificate of the root pool, and every
//! certificate on that path satisfies the checks in [`verify_certificate`].

use bon::Builder;
use der::Encode;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cert::Certificate;
use crate::cert::algorithm::SignatureAlgorithm;
use crate::cert::extensions::{ExtendedKeyUsageOption, KeyUsages};
use crate::error::{CertBarError, CertificateRole, TrustError, VerifyError};
use crate::pem_utils::pem_to_der;

/// Maximum number of certificates in a verified path, leaf and root included.
pub const MAX_CHAIN_DEPTH: usize = 8;

/// A set of certificates used as trust anchors or as intermediates.
#[derive(Debug, Clone, Default)]
pub struct CertPool {
    certs: Vec<Certificate>,
}

impl CertPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_cert(&mut self, cert: Certificate) {
        if !self.contains(&cert) {
            self.certs.push(cert);
        }
    }

    /// Loads every `CERTIFICATE` block of a PEM bundle.
    pub fn from_pem_bundle(pem: &str) -> Result<Self, CertBarError> {
        let mut pool = Self::new();
        for der in pem_to_der(pem)? {
            pool.add_cert(Certificate::from_der(&der)?);
        }
        Ok(pool)
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn contains(&self, cert: &Certificate) -> bool {
        self.certs.iter().any(|c| c == cert)
    }

    /// Certificates whose subject matches `cert`'s issuer. When both sides
    /// carry key identifiers, they must agree as well.
    fn issuers_of<'a>(&'a self, cert: &'a Certificate) -> impl Iterator<Item = &'a Certificate> {
        let authority_key_id = cert.authority_key_id().ok().flatten();
        self.certs.iter().filter(move |candidate| {
            if candidate.inner.tbs_certificate.subject != cert.inner.tbs_certificate.issuer {
                return false;
            }
            match (&authority_key_id, candidate.subject_key_id().ok().flatten()) {
                (Some(aki), Some(ski)) => *aki == ski,
                _ => true,
            }
        })
    }
}

impl FromIterator<Certificate> for CertPool {
    fn from_iter<I: IntoIterator<Item = Certificate>>(iter: I) -> Self {
        let mut pool = Self::new();
        for cert in iter {
            pool.add_cert(cert);
        }
        pool
    }
}

/// Parameters of a verification.
///
/// # Fields
/// * `dns_name` - Host name the leaf must be valid for. `None` skips the check.
/// * `current_time` - Instant the validity windows are checked at. Defaults to now.
/// * `key_usages` - Acceptable extended key usages. Every certificate on the path that carries
///   the extension must allow one of them. Defaults to server authentication.
/// * `require_cert_sign_usage` - Reject issuers whose key usage lacks `KeyCertSign`.
///   Off by default.
#[derive(Debug, Clone, Builder)]
pub struct VerifyOptions {
    #[builder(into)]
    pub dns_name: Option<String>,
    #[builder(default = OffsetDateTime::now_utc())]
    pub current_time: OffsetDateTime,
    #[builder(default = vec![ExtendedKeyUsageOption::ServerAuth])]
    pub key_usages: Vec<ExtendedKeyUsageOption>,
    #[builder(default)]
    pub require_cert_sign_usage: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Verifies `leaf` against `roots`, using `intermediates` to complete the path.
///
/// Returns the verified path from the leaf to the root.
pub fn verify_certificate(
    leaf: &Certificate,
    roots: &CertPool,
    intermediates: &CertPool,
    options: &VerifyOptions,
) -> Result<Vec<Certificate>, TrustError> {
    check_validity(leaf, options.current_time)?;
    if let Some(dns_name) = &options.dns_name {
        verify_hostname(leaf, dns_name)?;
    }
    check_extended_key_usage(leaf, &options.key_usages)?;

    let mut chain = vec![leaf.clone()];
    if !roots.contains(leaf) {
        extend_chain(&mut chain, roots, intermediates, options)?;
    }
    debug!(depth = chain.len(), "verified certificate chain");
    Ok(chain)
}

/// Depth-first search for a parent of the last certificate in `chain`.
/// Roots are tried before intermediates.
fn extend_chain(
    chain: &mut Vec<Certificate>,
    roots: &CertPool,
    intermediates: &CertPool,
    options: &VerifyOptions,
) -> Result<(), TrustError> {
    if chain.len() >= MAX_CHAIN_DEPTH {
        return Err(TrustError::ChainTooDeep {
            max: MAX_CHAIN_DEPTH,
        });
    }
    let current = chain[chain.len() - 1].clone();
    // CA certificates already on the path below the candidate parent.
    let cas_below = chain.len() - 1;

    let candidates = roots
        .issuers_of(&current)
        .map(|cert| (cert, true))
        .chain(intermediates.issuers_of(&current).map(|cert| (cert, false)));

    let mut last_error = None;
    for (candidate, is_root) in candidates {
        if chain.contains(candidate) {
            continue;
        }
        if let Err(err) = check_parent(&current, candidate, cas_below, options) {
            debug!(error = %err, "rejected candidate issuer");
            last_error = Some(err);
            continue;
        }
        chain.push(candidate.clone());
        if is_root {
            return Ok(());
        }
        match extend_chain(chain, roots, intermediates, options) {
            Ok(()) => return Ok(()),
            Err(err) => {
                chain.pop();
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| TrustError::UnknownAuthority {
        subject: subject_of(&current),
    }))
}

fn check_parent(
    child: &Certificate,
    parent: &Certificate,
    cas_below: usize,
    options: &VerifyOptions,
) -> Result<(), TrustError> {
    let subject = subject_of(parent);
    let basic_constraints = parent
        .basic_constraints()
        .map_err(|e| malformed(parent, e))?;
    let Some(basic_constraints) = basic_constraints.filter(|bc| bc.is_ca) else {
        return Err(TrustError::NotAuthorizedToSign { subject });
    };
    if options.require_cert_sign_usage {
        let key_usage = parent.key_usage().map_err(|e| malformed(parent, e))?;
        if key_usage.is_some_and(|ku| !ku.0.contains(KeyUsages::KeyCertSign)) {
            return Err(TrustError::NotAuthorizedToSign { subject });
        }
    }
    if basic_constraints
        .max_path_length
        .is_some_and(|max| cas_below > max as usize)
    {
        return Err(TrustError::PathLengthExceeded {
            subject: subject_of(child),
        });
    }
    check_validity(parent, options.current_time)?;
    check_extended_key_usage(parent, &options.key_usages)?;
    check_signature(child, parent)
}

fn check_signature(child: &Certificate, parent: &Certificate) -> Result<(), TrustError> {
    let oid = &child.inner.signature_algorithm.oid;
    let algorithm = SignatureAlgorithm::from_oid(oid)
        .ok_or_else(|| TrustError::UnsupportedAlgorithm { oid: oid.to_string() })?;
    let public_key = parent.public_key().map_err(|e| malformed(parent, e))?;
    let tbs = child
        .inner
        .tbs_certificate
        .to_der()
        .map_err(|e| malformed(child, e))?;

    if public_key.verify_data(algorithm, &tbs, child.inner.signature.raw_bytes()) {
        Ok(())
    } else {
        Err(TrustError::BadSignature {
            subject: subject_of(child),
        })
    }
}

fn check_validity(cert: &Certificate, now: OffsetDateTime) -> Result<(), TrustError> {
    let validity = cert.validity();
    if now < validity.not_before {
        Err(TrustError::NotYetValid {
            subject: subject_of(cert),
        })
    } else if now > validity.not_after {
        Err(TrustError::Expired {
            subject: subject_of(cert),
        })
    } else {
        Ok(())
    }
}

/// An absent extension places no restriction; `Any` on either side matches
/// everything.
fn check_extended_key_usage(
    cert: &Certificate,
    wanted: &[ExtendedKeyUsageOption],
) -> Result<(), TrustError> {
    if wanted.is_empty() || wanted.contains(&ExtendedKeyUsageOption::Any) {
        return Ok(());
    }
    let Some(usages) = cert.extended_key_usage().map_err(|e| malformed(cert, e))? else {
        return Ok(());
    };
    if usages.contains(&ExtendedKeyUsageOption::Any)
        || usages.iter().any(|usage| wanted.contains(usage))
    {
        Ok(())
    } else {
        Err(TrustError::IncompatibleUsage {
            subject: subject_of(cert),
        })
    }
}

/// Matches `hostname` against the SAN DNS names of `cert`. The common name
/// is never consulted.
pub fn verify_hostname(cert: &Certificate, hostname: &str) -> Result<(), TrustError> {
    let names = cert.dns_names().map_err(|e| malformed(cert, e))?;
    if names.iter().any(|pattern| matches_hostname(pattern, hostname)) {
        Ok(())
    } else {
        Err(TrustError::HostnameMismatch {
            hostname: hostname.to_string(),
        })
    }
}

/// Case-insensitive comparison that ignores a trailing dot. A leading `*.`
/// label matches exactly one non-empty label.
fn matches_hostname(pattern: &str, hostname: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let hostname = hostname.trim_end_matches('.').to_ascii_lowercase();
    if pattern.is_empty() || hostname.is_empty() {
        return false;
    }
    match pattern.strip_prefix("*.") {
        Some(suffix) => hostname
            .split_once('.')
            .is_some_and(|(label, rest)| !label.is_empty() && rest == suffix),
        None => pattern == hostname,
    }
}

fn subject_of(cert: &Certificate) -> String {
    cert.inner.tbs_certificate.subject.to_string()
}

fn malformed(cert: &Certificate, reason: impl std::fmt::Display) -> TrustError {
    TrustError::Malformed {
        subject: subject_of(cert),
        reason: reason.to_string(),
    }
}

fn parse(der: &[u8], role: CertificateRole) -> Result<Certificate, VerifyError> {
    Certificate::from_der(der).map_err(|e| VerifyError::Parse {
        role,
        reason: e.to_string(),
    })
}

/// Verifies that `leaf_der` chains to `root_der` and is valid for `hostname`
/// right now, for server authentication.
///
/// Every input is parsed before any trust decision is made; a parse failure
/// is reported as [`VerifyError::Parse`] naming the offending input.
pub fn verify_chain(
    hostname: &str,
    root_der: &[u8],
    intermediates_der: &[&[u8]],
    leaf_der: &[u8],
) -> Result<Vec<Certificate>, VerifyError> {
    let root = parse(root_der, CertificateRole::Root)?;
    let intermediates = intermediates_der
        .iter()
        .enumerate()
        .map(|(index, der)| parse(der, CertificateRole::Intermediate(index)))
        .collect::<Result<CertPool, _>>()?;
    let leaf = parse(leaf_der, CertificateRole::Leaf)?;

    let roots = CertPool::from_iter([root]);
    let options = VerifyOptions::builder().dns_name(hostname).build();
    Ok(verify_certificate(&leaf, &roots, &intermediates, &options)?)
}

/// Boolean form of [`verify_chain`]. Failures are logged at `warn` level.
pub fn check_certificate(
    hostname: &str,
    root_der: &[u8],
    intermediates_der: &[&[u8]],
    leaf_der: &[u8],
) -> bool {
    match verify_chain(hostname, root_der, intermediates_der, leaf_der) {
        Ok(_) => true,
        Err(err) => {
            warn!(hostname, error = %err, "certificate verification failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::params::{CertificateDescriptor, Validity};
    use crate::issuer::Issuer;
    use crate::key::KeyPair;
    use test_case::test_case;
    use time::Duration;

    struct Hierarchy {
        root: CertificateWithPrivateKey,
        intermediate: CertificateWithPrivateKey,
        leaf: Certificate,
    }

    fn ca_descriptor<'a>(key: &'a KeyPair, name: &str) -> CertificateDescriptor<'a> {
        let validity = Validity::for_days(365);
        CertificateDescriptor::builder()
            .id(name)
            .common_name(name)
            .is_ca(true)
            .private_key(key)
            .valid_from(validity.not_before)
            .valid_to(validity.not_after)
            .build()
    }

    fn leaf_descriptor(key: &KeyPair) -> CertificateDescriptor<'_> {
        let validity = Validity::for_days(30);
        CertificateDescriptor::builder()
            .id("leaf")
            .common_name("example.com")
            .alternative_names(vec!["*.example.com".to_string()])
            .private_key(key)
            .valid_from(validity.not_before)
            .valid_to(validity.not_after)
            .build()
    }

    fn hierarchy() -> Hierarchy {
        let root_key = KeyPair::generate_ecdsa_p256();
        let root = CertificateWithPrivateKey {
            cert: Certificate::new_self_signed(&ca_descriptor(&root_key, "Root CA")).unwrap(),
            key: root_key,
        };
        let intermediate_key = KeyPair::generate_ecdsa_p256();
        let intermediate = CertificateWithPrivateKey {
            cert: root
                .issue(&ca_descriptor(&intermediate_key, "Intermediate CA"))
                .unwrap(),
            key: intermediate_key,
        };
        let leaf_key = KeyPair::generate_ecdsa_p256();
        let leaf = intermediate.issue(&leaf_descriptor(&leaf_key)).unwrap();
        Hierarchy {
            root,
            intermediate,
            leaf,
        }
    }

    #[test_case("example.com", true ; "exact")]
    #[test_case("EXAMPLE.com", true ; "case insensitive")]
    #[test_case("www.example.com", true ; "wildcard")]
    #[test_case("example.com.", true ; "trailing dot")]
    #[test_case("a.b.example.com", false ; "wildcard spans one label")]
    #[test_case("other.com", false ; "other host")]
    #[test_case("", false ; "empty")]
    fn hostname_matching(hostname: &str, expected: bool) {
        assert_eq!(
            matches_hostname("example.com", hostname)
                || matches_hostname("*.example.com", hostname),
            expected
        );
    }

    #[test]
    fn full_chain_verifies() {
        let h = hierarchy();
        let roots = CertPool::from_iter([h.root.cert.clone()]);
        let intermediates = CertPool::from_iter([h.intermediate.cert.clone()]);
        let options = VerifyOptions::builder().dns_name("www.example.com").build();

        let chain = verify_certificate(&h.leaf, &roots, &intermediates, &options).unwrap();
        assert_eq!(chain, vec![h.leaf, h.intermediate.cert, h.root.cert]);
    }

    #[test]
    fn missing_intermediate_is_unknown_authority() {
        let h = hierarchy();
        let roots = CertPool::from_iter([h.root.cert]);

        let err =
            verify_certificate(&h.leaf, &roots, &CertPool::new(), &VerifyOptions::default())
                .unwrap_err();
        assert!(matches!(err, TrustError::UnknownAuthority { .. }));
    }

    #[test]
    fn expired_leaf_is_rejected() {
        let h = hierarchy();
        let roots = CertPool::from_iter([h.root.cert]);
        let intermediates = CertPool::from_iter([h.intermediate.cert]);
        let options = VerifyOptions::builder()
            .current_time(OffsetDateTime::now_utc() + Duration::days(60))
            .build();

        let err = verify_certificate(&h.leaf, &roots, &intermediates, &options).unwrap_err();
        assert!(matches!(err, TrustError::Expired { .. }));
    }

    #[test]
    fn leaf_without_requested_usage_is_rejected() {
        let h = hierarchy();
        let roots = CertPool::from_iter([h.root.cert]);
        let intermediates = CertPool::from_iter([h.intermediate.cert]);
        let options = VerifyOptions::builder()
            .key_usages(vec![ExtendedKeyUsageOption::CodeSigning])
            .build();

        let err = verify_certificate(&h.leaf, &roots, &intermediates, &options).unwrap_err();
        assert!(matches!(err, TrustError::IncompatibleUsage { .. }));
    }

    #[test]
    fn non_ca_cannot_sign() {
        let root_key = KeyPair::generate_ecdsa_p256();
        let mut not_a_ca = ca_descriptor(&root_key, "Not a CA");
        not_a_ca.is_ca = false;
        not_a_ca.usage = vec!["certsign".to_string()];
        let root = CertificateWithPrivateKey {
            cert: Certificate::new_self_signed(&not_a_ca).unwrap(),
            key: root_key,
        };
        let leaf_key = KeyPair::generate_ecdsa_p256();
        let leaf = root.issue(&leaf_descriptor(&leaf_key)).unwrap();

        let roots = CertPool::from_iter([root.cert]);
        let err = verify_certificate(&leaf, &roots, &CertPool::new(), &VerifyOptions::default())
            .unwrap_err();
        assert!(matches!(err, TrustError::NotAuthorizedToSign { .. }));
    }

    #[test]
    fn issuer_key_usage_is_ignored_by_default() {
        let root_key = KeyPair::generate_ecdsa_p256();
        let mut crl_only = ca_descriptor(&root_key, "CRL Signer");
        crl_only.usage = vec!["crlsign".to_string()];
        let root = CertificateWithPrivateKey {
            cert: Certificate::new_self_signed(&crl_only).unwrap(),
            key: root_key,
        };
        let leaf_key = KeyPair::generate_ecdsa_p256();
        let leaf = root.issue(&leaf_descriptor(&leaf_key)).unwrap();
        let roots = CertPool::from_iter([root.cert]);

        let options = VerifyOptions::default();
        assert!(verify_certificate(&leaf, &roots, &CertPool::new(), &options).is_ok());

        let strict = VerifyOptions::builder().require_cert_sign_usage(true).build();
        let err = verify_certificate(&leaf, &roots, &CertPool::new(), &strict).unwrap_err();
        assert!(matches!(err, TrustError::NotAuthorizedToSign { .. }));
    }

    #[test]
    fn intermediate_usage_restricts_the_path() {
        let root_key = KeyPair::generate_ecdsa_p256();
        let root = CertificateWithPrivateKey {
            cert: Certificate::new_self_signed(&ca_descriptor(&root_key, "Root CA")).unwrap(),
            key: root_key,
        };
        let intermediate_key = KeyPair::generate_ecdsa_p256();
        let mut client_only = ca_descriptor(&intermediate_key, "Client CA");
        client_only.usage = vec!["certsign".to_string(), "clientauth".to_string()];
        let intermediate = CertificateWithPrivateKey {
            cert: root.issue(&client_only).unwrap(),
            key: intermediate_key,
        };
        let leaf_key = KeyPair::generate_ecdsa_p256();
        let leaf = intermediate.issue(&leaf_descriptor(&leaf_key)).unwrap();

        let roots = CertPool::from_iter([root.cert]);
        let intermediates = CertPool::from_iter([intermediate.cert]);
        let err = verify_certificate(&leaf, &roots, &intermediates, &VerifyOptions::default())
            .unwrap_err();
        assert!(matches!(err, TrustError::IncompatibleUsage { .. }));

        let any = VerifyOptions::builder()
            .key_usages(vec![ExtendedKeyUsageOption::Any])
            .build();
        assert!(verify_certificate(&leaf, &roots, &intermediates, &any).is_ok());
    }

    #[test]
    fn root_itself_is_trusted() {
        let h = hierarchy();
        let roots = CertPool::from_iter([h.root.cert.clone()]);
        let chain =
            verify_certificate(&h.root.cert, &roots, &CertPool::new(), &VerifyOptions::default())
                .unwrap();
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn check_certificate_distinguishes_hosts() {
        let h = hierarchy();
        let root = h.root.cert.to_der().unwrap();
        let intermediate = h.intermediate.cert.to_der().unwrap();
        let leaf = h.leaf.to_der().unwrap();

        assert!(check_certificate("example.com", &root, &[intermediate.as_slice()], &leaf));
        assert!(!check_certificate("other.com", &root, &[intermediate.as_slice()], &leaf));
    }

    #[test]
    fn parse_errors_name_the_input() {
        let h = hierarchy();
        let root = h.root.cert.to_der().unwrap();
        let leaf = h.leaf.to_der().unwrap();

        let err = verify_chain("example.com", &root, &[b"garbage".as_slice()], &leaf).unwrap_err();
        assert!(err.is_parse_error());
        assert!(matches!(
            err,
            VerifyError::Parse {
                role: CertificateRole::Intermediate(0),
                ..
            }
        ));

        let err = verify_chain("example.com", &root, &[], &leaf).unwrap_err();
        assert!(!err.is_parse_error());
    }

    #[test]
    fn pool_from_pem_bundle() {
        let h = hierarchy();
        let bundle = format!(
            "{}{}",
            h.root.cert.to_pem().unwrap(),
            h.intermediate.cert.to_pem().unwrap()
        );
        let pool = CertPool::from_pem_bundle(&bundle).unwrap();
        assert_eq!(pool.len(), 2);
        assert!(pool.contains(&h.intermediate.cert));
    }
}
