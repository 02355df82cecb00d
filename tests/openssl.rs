mod util;

use certbar::cert::Certificate;
use certbar::cert::params::{CertificateDescriptor, Validity};
use certbar::issuer::Issuer;
use certbar::key::{KeyPair, PublicKey};
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509StoreContext};

fn to_openssl(cert: &Certificate) -> X509 {
    X509::from_pem(cert.to_pem().unwrap().as_bytes()).expect("Failed to parse PEM")
}

fn common_name(name: &openssl::x509::X509NameRef) -> String {
    name.entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap()
        .to_string()
}

#[test]
fn test_openssl_crate_validate_cert() {
    let ca_cert_with_key = util::generate_ca_cert();
    let server_key = KeyPair::generate_ecdsa_p256();
    let server_cert = ca_cert_with_key
        .issue(&util::server_descriptor(&server_key, "server-1", "server.myca.local"))
        .unwrap();

    let x509 = to_openssl(&server_cert);

    assert_eq!(common_name(x509.subject_name()), "server.myca.local");
    assert_eq!(common_name(x509.issuer_name()), "myca.local");
    assert_eq!(x509.version(), 2, "X509 version should be 3 (0-based index)");

    let serial = x509.serial_number().to_bn().unwrap().to_vec();
    assert_eq!(serial, b"server-1", "Serial number should be the id bytes");

    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256,
        "Signature algorithm should be ecdsa-with-SHA256"
    );

    let dns_names: Vec<String> = x509
        .subject_alt_names()
        .unwrap()
        .iter()
        .filter_map(|name| name.dnsname().map(str::to_string))
        .collect();
    assert_eq!(dns_names, ["server.myca.local"]);

    assert_eq!(
        x509.subject_key_id().unwrap().as_slice(),
        PublicKey::from_key_pair(&server_key).key_identifier().unwrap()
    );
    assert_eq!(
        x509.authority_key_id().unwrap().as_slice(),
        to_openssl(&ca_cert_with_key.cert)
            .subject_key_id()
            .unwrap()
            .as_slice()
    );
}

#[test]
fn test_openssl_verifies_chain() {
    let root = util::generate_ca_cert();
    let intermediate = util::generate_intermediate_cert(&root);
    let leaf_key = KeyPair::generate_ecdsa_p256();
    let leaf = intermediate
        .issue(&util::server_descriptor(&leaf_key, "leaf", "leaf.myca.local"))
        .unwrap();

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(to_openssl(&root.cert)).unwrap();
    let store = store.build();

    let mut chain = Stack::new().unwrap();
    chain.push(to_openssl(&intermediate.cert)).unwrap();

    let mut context = X509StoreContext::new().unwrap();
    let verified = context
        .init(&store, &to_openssl(&leaf), &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                eprintln!("verification error: {}", c.error());
            }
            Ok(ok)
        })
        .unwrap();
    assert!(verified, "OpenSSL rejected the chain");
}

#[test]
fn test_openssl_rejects_untrusted_root() {
    let root = util::generate_ca_cert();
    let other = util::generate_ca_cert();
    let leaf_key = KeyPair::generate_ecdsa_p256();
    let leaf = other
        .issue(&util::server_descriptor(&leaf_key, "leaf", "leaf.myca.local"))
        .unwrap();

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(to_openssl(&root.cert)).unwrap();
    let store = store.build();

    let chain = Stack::new().unwrap();
    let mut context = X509StoreContext::new().unwrap();
    let verified = context
        .init(&store, &to_openssl(&leaf), &chain, |c| c.verify_cert())
        .unwrap();
    assert!(!verified);
}

#[test]
fn test_openssl_accepts_rsa_signatures() {
    let ca_key = KeyPair::generate_rsa(2048).unwrap();
    let validity = Validity::for_days(30);
    let descriptor = CertificateDescriptor::builder()
        .id("rsa-root")
        .common_name("rsa.myca.local")
        .is_ca(true)
        .private_key(&ca_key)
        .signature_hash_algorithm("SHA512")
        .valid_from(validity.not_before)
        .valid_to(validity.not_after)
        .build();
    let cert = Certificate::new_self_signed(&descriptor).unwrap();

    let x509 = to_openssl(&cert);
    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::SHA512WITHRSAENCRYPTION
    );
    let public_key = x509.public_key().unwrap();
    assert!(x509.verify(&public_key).unwrap());
}

#[test]
fn test_openssl_accepts_p384_signatures() {
    let ca_key = KeyPair::generate_ecdsa_p384();
    let mut descriptor = util::ca_descriptor(&ca_key, "p384-root", "p384.myca.local");
    descriptor.signature_hash_algorithm = "SHA384".to_string();
    let cert = Certificate::new_self_signed(&descriptor).unwrap();

    let x509 = to_openssl(&cert);
    assert_eq!(x509.signature_algorithm().object().nid(), Nid::ECDSA_WITH_SHA384);
    let public_key = x509.public_key().unwrap();
    assert!(x509.verify(&public_key).unwrap());
}

#[test]
fn test_openssl_accepts_p384_sha1_signatures() {
    let ca_key = KeyPair::generate_ecdsa_p384();
    let mut descriptor = util::ca_descriptor(&ca_key, "p384-sha1-root", "sha1.myca.local");
    descriptor.signature_hash_algorithm = "SHA1".to_string();
    let cert = Certificate::new_self_signed(&descriptor).unwrap();

    let x509 = to_openssl(&cert);
    assert_eq!(x509.signature_algorithm().object().nid(), Nid::ECDSA_WITH_SHA1);
    let public_key = x509.public_key().unwrap();
    assert!(x509.verify(&public_key).unwrap());
}
