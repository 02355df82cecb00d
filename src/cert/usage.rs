use der::flagset::FlagSet;
use tracing::warn;

use super::extensions::{ExtendedKeyUsageOption, KeyUsage, KeyUsages};

/// A usage token accepted in a certificate description.
///
/// Tokens are lowercase and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    /// `crlsign`: may sign certificate revocation lists.
    CrlSign,
    /// `certsign`: may sign other certificates.
    CertSign,
    /// `encipherment`: key encipherment.
    Encipherment,
    /// `signature`: digital signatures.
    Signature,
    /// `contentcommitment`: non-repudiation.
    ContentCommitment,
    /// `clientauth`: TLS client authentication.
    ClientAuth,
    /// `serverauth`: TLS server authentication.
    ServerAuth,
}

impl Usage {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "crlsign" => Some(Usage::CrlSign),
            "certsign" => Some(Usage::CertSign),
            "encipherment" => Some(Usage::Encipherment),
            "signature" => Some(Usage::Signature),
            "contentcommitment" => Some(Usage::ContentCommitment),
            "clientauth" => Some(Usage::ClientAuth),
            "serverauth" => Some(Usage::ServerAuth),
            _ => None,
        }
    }

    fn key_usage(self) -> Option<KeyUsages> {
        match self {
            Usage::CrlSign => Some(KeyUsages::CRLSign),
            Usage::CertSign => Some(KeyUsages::KeyCertSign),
            Usage::Encipherment => Some(KeyUsages::KeyEncipherment),
            Usage::Signature => Some(KeyUsages::DigitalSignature),
            Usage::ContentCommitment => Some(KeyUsages::NonRepudiation),
            Usage::ClientAuth | Usage::ServerAuth => None,
        }
    }

    fn extended_key_usage(self) -> Option<ExtendedKeyUsageOption> {
        match self {
            Usage::ClientAuth => Some(ExtendedKeyUsageOption::ClientAuth),
            Usage::ServerAuth => Some(ExtendedKeyUsageOption::ServerAuth),
            _ => None,
        }
    }
}

/// Key usage bits and extended key usages resolved from usage tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedUsage {
    pub key_usage: KeyUsage,
    pub extended_key_usage: Vec<ExtendedKeyUsageOption>,
}

impl ResolvedUsage {
    fn defaults(is_ca: bool) -> Self {
        if is_ca {
            Self {
                key_usage: KeyUsage(KeyUsages::KeyCertSign | KeyUsages::CRLSign),
                extended_key_usage: Vec::new(),
            }
        } else {
            Self {
                key_usage: KeyUsage(KeyUsages::KeyEncipherment | KeyUsages::DigitalSignature),
                extended_key_usage: vec![
                    ExtendedKeyUsageOption::ClientAuth,
                    ExtendedKeyUsageOption::ServerAuth,
                ],
            }
        }
    }
}

/// Maps usage tokens to key usage bits and extended key usages.
///
/// An empty token list selects the defaults for CA or end-entity
/// certificates. Otherwise every recognized token contributes its bit or
/// appends its extended usage in input order (duplicates are kept), and
/// unrecognized tokens are skipped with a warning.
pub fn resolve_usage<S: AsRef<str>>(tokens: &[S], is_ca: bool) -> ResolvedUsage {
    if tokens.is_empty() {
        return ResolvedUsage::defaults(is_ca);
    }

    let mut key_usage: FlagSet<KeyUsages> = FlagSet::default();
    let mut extended_key_usage = Vec::new();
    for token in tokens {
        let token = token.as_ref();
        let Some(usage) = Usage::from_token(token) else {
            warn!(token, "ignoring unrecognized usage token");
            continue;
        };
        if let Some(bit) = usage.key_usage() {
            key_usage |= bit;
        }
        if let Some(option) = usage.extended_key_usage() {
            extended_key_usage.push(option);
        }
    }

    ResolvedUsage {
        key_usage: KeyUsage(key_usage),
        extended_key_usage,
    }
}
