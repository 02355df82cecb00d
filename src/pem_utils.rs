use crate::error::CertBarError;

/// PEM label of an X.509 certificate.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    pem::encode_config(&pem, pem::EncodeConfig::new())
}

/// Extract the DER contents of every `CERTIFICATE` block in `pem_str`.
///
/// Blocks with other labels are skipped. Input without any certificate
/// block is an error.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<Vec<u8>>, CertBarError> {
    let blocks =
        pem::parse_many(pem_str).map_err(|e| CertBarError::DecodingError(e.to_string()))?;
    let certificates: Vec<Vec<u8>> = blocks
        .into_iter()
        .filter(|block| block.tag() == CERTIFICATE_LABEL)
        .map(|block| block.into_contents())
        .collect();
    if certificates.is_empty() {
        return Err(CertBarError::InvalidInput(
            "no CERTIFICATE block found".to_string(),
        ));
    }
    Ok(certificates)
}
