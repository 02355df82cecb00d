use certbar::cert::params::{CertificateDescriptor, Validity};
use certbar::cert::{Certificate, CertificateWithPrivateKey};
use certbar::issuer::Issuer;
use certbar::key::KeyPair;

pub fn ca_descriptor<'a>(
    key: &'a KeyPair,
    id: &str,
    common_name: &str,
) -> CertificateDescriptor<'a> {
    let validity = Validity::for_days(365);
    CertificateDescriptor::builder()
        .id(id)
        .country("SE")
        .organization("Example AB")
        .common_name(common_name)
        .is_ca(true)
        .private_key(key)
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build()
}

pub fn server_descriptor<'a>(
    key: &'a KeyPair,
    id: &str,
    common_name: &str,
) -> CertificateDescriptor<'a> {
    let validity = Validity::for_days(30);
    CertificateDescriptor::builder()
        .id(id)
        .common_name(common_name)
        .alternative_names(vec![common_name.to_string()])
        .private_key(key)
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build()
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    let ca_key = KeyPair::generate_ecdsa_p256();
    let cert = Certificate::new_self_signed(&ca_descriptor(&ca_key, "1", "myca.local"))
        .expect("self-signed root");
    CertificateWithPrivateKey { cert, key: ca_key }
}

pub fn generate_intermediate_cert(parent: &CertificateWithPrivateKey) -> CertificateWithPrivateKey {
    let key = KeyPair::generate_ecdsa_p256();
    let cert = parent
        .issue(&ca_descriptor(&key, "2", "intermediate.myca.local"))
        .expect("intermediate");
    CertificateWithPrivateKey { cert, key }
}
