//! Password scrambling for MySQL authentication plugins.

use crate::error::{Error, Result};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Oaep, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;

/// Compute SHA-1 hash.
pub fn sha1_hash(data: &[u8]) -> [u8; 20] {
    use sha1::Digest;
    let mut hasher = Sha1::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash.
pub fn sha256_hash(data: &[u8]) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

fn xor_in_place(target: &mut [u8], mask: &[u8]) {
    for (t, m) in target.iter_mut().zip(mask) {
        *t ^= m;
    }
}

/// `mysql_native_password` response:
/// `SHA1(password) XOR SHA1(scramble + SHA1(SHA1(password)))`.
///
/// An empty password produces an empty response.
pub fn scramble_native_password(password: &[u8], scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let stage1 = sha1_hash(password);
    let stage2 = sha1_hash(&stage1);

    use sha1::Digest;
    let mut hasher = Sha1::new();
    hasher.update(scramble);
    hasher.update(stage2);
    let mask: [u8; 20] = hasher.finalize().into();

    let mut out = stage1.to_vec();
    xor_in_place(&mut out, &mask);
    out
}

/// `caching_sha2_password` fast-path response:
/// `SHA256(password) XOR SHA256(SHA256(SHA256(password)) + scramble)`.
///
/// An empty password produces an empty response.
pub fn scramble_caching_sha2(password: &[u8], scramble: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let stage1 = sha256_hash(password);
    let stage2 = sha256_hash(&stage1);

    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(stage2);
    hasher.update(scramble);
    let mask: [u8; 32] = hasher.finalize().into();

    let mut out = stage1.to_vec();
    xor_in_place(&mut out, &mask);
    out
}

/// `caching_sha2_password` full-authentication response over an insecure
/// transport: `password\0` XOR the scramble (repeated), RSA-OAEP encrypted
/// with the server's PEM public key.
pub fn encrypt_password_rsa(password: &[u8], scramble: &[u8], public_key_pem: &[u8]) -> Result<Vec<u8>> {
    if scramble.is_empty() {
        return Err(Error::protocol("Empty scramble for RSA password exchange"));
    }

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|_| Error::protocol("Server public key is not valid PEM text"))?
        .trim_matches(|c: char| c == '\0' || c.is_whitespace());
    // SubjectPublicKeyInfo from MySQL, PKCS#1 from some proxies
    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| Error::AuthenticationFailed {
            message: format!("Invalid server public key: {}", e),
        })?;

    let mut plain = password.to_vec();
    plain.push(0);
    for (i, byte) in plain.iter_mut().enumerate() {
        *byte ^= scramble[i % scramble.len()];
    }

    key.encrypt(&mut rand::thread_rng(), Oaep::new::<Sha1>(), &plain)
        .map_err(|e| Error::AuthenticationFailed {
            message: format!("RSA password encryption failed: {}", e),
        })
}
