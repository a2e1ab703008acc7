//! RSA key fixtures for tests.
//!
//! The key pair is a throwaway 2048-bit RSA key generated for this repository.
//! It is never used outside of tests.

/// PKCS#8 PEM private key, the same shape the video platform hands out.
pub const TEST_RSA_PRIVATE_KEY_PEM: &str = include_str!("testdata/rsa_private.pem");

/// SPKI PEM public key matching [`TEST_RSA_PRIVATE_KEY_PEM`].
pub const TEST_RSA_PUBLIC_KEY_PEM: &str = include_str!("testdata/rsa_public.pem");
