use certbar::cert::params::{CertificateDescriptor, Validity};
use certbar::cert::{Certificate, CertificateWithPrivateKey};
use certbar::error::CertBarError;
use certbar::issuer::Issuer;
use certbar::key::KeyPair;
use certbar::pem_utils::{CERTIFICATE_LABEL, der_to_pem};
use certbar::verify::check_certificate;

fn main() -> Result<(), CertBarError> {
    // Self-signed root with the CA default usages
    let root_key = KeyPair::generate_ecdsa_p256();
    let validity = Validity::for_days(3650);
    let root_descriptor = CertificateDescriptor::builder()
        .id("1")
        .common_name("My Test CA")
        .organization("Example")
        .is_ca(true)
        .private_key(&root_key)
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build();
    let root = CertificateWithPrivateKey {
        cert: Certificate::new_self_signed(&root_descriptor)?,
        key: root_key,
    };

    // Intermediate signed by the root
    let intermediate_key = KeyPair::generate_ecdsa_p384();
    let validity = Validity::for_days(1825);
    let intermediate_descriptor = CertificateDescriptor::builder()
        .id("2")
        .common_name("My Test Intermediate")
        .is_ca(true)
        .private_key(&intermediate_key)
        .signature_hash_algorithm("SHA384")
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build();
    let intermediate = CertificateWithPrivateKey {
        cert: root.issue(&intermediate_descriptor)?,
        key: intermediate_key,
    };

    // Server leaf signed by the intermediate
    let server_key = KeyPair::generate_ecdsa_p256();
    let validity = Validity::for_days(825);
    let server_descriptor = CertificateDescriptor::builder()
        .id("myserver-1")
        .common_name("myserver.local")
        .alternative_names(vec!["www.myserver.local".to_string()])
        .usage(vec!["signature".to_string(), "serverauth".to_string()])
        .private_key(&server_key)
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build();
    let server = intermediate.issue(&server_descriptor)?;

    let root_der = root.cert.to_der()?;
    let intermediate_der = intermediate.cert.to_der()?;
    let server_der = server.to_der()?;

    println!("CA Certificate PEM:\n{}", der_to_pem(&root_der, CERTIFICATE_LABEL));
    println!(
        "Intermediate Certificate PEM:\n{}",
        der_to_pem(&intermediate_der, CERTIFICATE_LABEL)
    );
    println!("Server Certificate PEM:\n{}", der_to_pem(&server_der, CERTIFICATE_LABEL));

    let trusted = check_certificate(
        "myserver.local",
        &root_der,
        &[intermediate_der.as_slice()],
        &server_der,
    );
    println!("myserver.local trusted: {trusted}");

    Ok(())
}
