#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use proptest::prelude::*;

    use crate::codec::{decode, decode_str, encode, encoded_len, EncodedBytes};
    use crate::error::CryptoError;
    use crate::keys::{generate_key_pair, KeyPair, KeyParams};
    use crate::signer::sign;
    use crate::verifier::{verify, VerificationResult};

    // RSA generation is slow; share one pair per algorithm across cases.
    fn rsa_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(KeyParams::default()).unwrap())
    }

    fn rsa_other_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(KeyParams::default()).unwrap())
    }

    fn rsa_3072_pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| generate_key_pair(KeyParams::rsa(3072)).unwrap())
    }

    fn flip_bit(bytes: &mut [u8], bit: usize) {
        let bit = bit % (bytes.len() * 8);
        bytes[bit / 8] ^= 1 << (bit % 8);
    }

    proptest! {
        #[test]
        fn prop_codec_round_trip(data in prop::collection::vec(any::<u8>(), 0..2048)) {
            let encoded = encode(&data);
            prop_assert_eq!(decode(&encoded)?, data);
        }

        #[test]
        fn prop_codec_deterministic(data in any::<Vec<u8>>()) {
            let a = encode(&data);
            let b = encode(&data);
            prop_assert_eq!(a.len(), encoded_len(data.len()));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_decode_rejects_foreign_characters(
            prefix in "[A-Za-z0-9+/]{0,8}",
            bad in "[!#$%&*.,;:?@~ ]",
        ) {
            let text = format!("{prefix}{bad}AAA");
            prop_assert!(matches!(decode_str(&text), Err(CryptoError::MalformedEncoding(_))));
        }

        #[test]
        fn prop_ed25519_sign_verify_soundness(message in any::<Vec<u8>>()) {
            let pair = generate_key_pair(KeyParams::ed25519())?;
            let sig = sign(pair.algorithm(), pair.private_key(), &message)?;
            prop_assert_eq!(
                verify(pair.algorithm(), pair.public_key(), &sig, &message),
                VerificationResult::Valid
            );
        }

        #[test]
        fn prop_ed25519_message_tamper_detected(
            message in prop::collection::vec(any::<u8>(), 1..512),
            bit in any::<usize>(),
        ) {
            let pair = generate_key_pair(KeyParams::ed25519())?;
            let sig = sign(pair.algorithm(), pair.private_key(), &message)?;

            let mut tampered = message.clone();
            flip_bit(&mut tampered, bit);
            prop_assert_eq!(
                verify(pair.algorithm(), pair.public_key(), &sig, &tampered),
                VerificationResult::Invalid
            );
        }

        #[test]
        fn prop_ed25519_signature_tamper_detected(
            message in any::<Vec<u8>>(),
            bit in 0usize..512,
        ) {
            let pair = generate_key_pair(KeyParams::ed25519())?;
            let sig = sign(pair.algorithm(), pair.private_key(), &message)?;

            let mut raw = sig.decode()?;
            flip_bit(&mut raw, bit);
            prop_assert_eq!(
                verify(pair.algorithm(), pair.public_key(), &encode(&raw), &message),
                VerificationResult::Invalid
            );
        }

        #[test]
        fn prop_ed25519_cross_key_rejected(message in any::<Vec<u8>>()) {
            let signer = generate_key_pair(KeyParams::ed25519())?;
            let other = generate_key_pair(KeyParams::ed25519())?;
            let sig = sign(signer.algorithm(), signer.private_key(), &message)?;
            prop_assert_eq!(
                verify(other.algorithm(), other.public_key(), &sig, &message),
                VerificationResult::Invalid
            );
        }

        #[test]
        fn prop_garbage_public_key_is_error(junk in prop::collection::vec(any::<u8>(), 0..64)) {
            let pair = generate_key_pair(KeyParams::ed25519())?;
            let sig = sign(pair.algorithm(), pair.private_key(), b"m")?;
            let result = verify(pair.algorithm(), &encode(&junk), &sig, b"m");
            prop_assert!(matches!(result, VerificationResult::Error(CryptoError::InvalidKeyFormat(_))));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_rsa_sign_verify_and_tamper(
            message in prop::collection::vec(any::<u8>(), 1..256),
            bit in any::<usize>(),
        ) {
            let pair = rsa_pair();
            let sig = sign(pair.algorithm(), pair.private_key(), &message)?;
            prop_assert!(verify(pair.algorithm(), pair.public_key(), &sig, &message).is_valid());

            let mut tampered = message.clone();
            flip_bit(&mut tampered, bit);
            prop_assert_eq!(
                verify(pair.algorithm(), pair.public_key(), &sig, &tampered),
                VerificationResult::Invalid
            );

            let mut raw_sig = sig.decode()?;
            flip_bit(&mut raw_sig, bit);
            prop_assert_eq!(
                verify(pair.algorithm(), pair.public_key(), &encode(&raw_sig), &message),
                VerificationResult::Invalid
            );

            let other = rsa_other_pair();
            prop_assert_eq!(
                verify(other.algorithm(), other.public_key(), &sig, &message),
                VerificationResult::Invalid
            );
        }

        #[test]
        fn prop_rsa_signature_deterministic(message in any::<Vec<u8>>()) {
            let pair = rsa_pair();
            let a = sign(pair.algorithm(), pair.private_key(), &message)?;
            let b = sign(pair.algorithm(), pair.private_key(), &message)?;
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn test_rsa_hello_world_scenario() {
        let pair = rsa_pair();
        let message = b"hello world";
        assert_eq!(message.len(), 11);

        let sig = sign(pair.algorithm(), pair.private_key(), message).unwrap();
        assert_eq!(sig.decode().unwrap().len(), 256);
        assert_eq!(
            verify(pair.algorithm(), pair.public_key(), &sig, message),
            VerificationResult::Valid
        );
    }

    #[test]
    fn test_rsa_signature_from_other_modulus_size_is_invalid() {
        let small = rsa_pair();
        let large = rsa_3072_pair();
        let sig = sign(small.algorithm(), small.private_key(), b"m").unwrap();
        assert_eq!(sig.decode().unwrap().len(), 256);
        assert_eq!(
            verify(large.algorithm(), large.public_key(), &sig, b"m"),
            VerificationResult::Invalid
        );

        let sig = sign(large.algorithm(), large.private_key(), b"m").unwrap();
        assert_eq!(
            verify(small.algorithm(), small.public_key(), &sig, b"m"),
            VerificationResult::Invalid
        );
    }

    #[test]
    fn test_rsa_truncated_signature_is_invalid() {
        let pair = rsa_pair();
        let sig = sign(pair.algorithm(), pair.private_key(), b"m").unwrap();
        let mut raw = sig.decode().unwrap();
        raw.pop();
        assert_eq!(
            verify(pair.algorithm(), pair.public_key(), &encode(&raw), b"m"),
            VerificationResult::Invalid
        );
    }

    #[test]
    fn test_ed25519_signature_against_rsa_key() {
        let rsa = rsa_pair();
        let ed = generate_key_pair(KeyParams::ed25519()).unwrap();
        let sig = sign(ed.algorithm(), ed.private_key(), b"m").unwrap();
        assert_eq!(sig.decode().unwrap().len(), 64);

        // Decodable signature, decodable key: a mismatch, not an error.
        assert_eq!(
            verify(rsa.algorithm(), rsa.public_key(), &sig, b"m"),
            VerificationResult::Invalid
        );
        // An RSA key read as Ed25519 is a key error.
        assert!(matches!(
            verify(ed.algorithm(), rsa.public_key(), &sig, b"m"),
            VerificationResult::Error(CryptoError::InvalidKeyFormat(_))
        ));
    }

    #[test]
    fn test_non_encoded_string_is_malformed() {
        let err = decode(&EncodedBytes::new("this is not base64")).unwrap_err();
        assert!(matches!(err, CryptoError::MalformedEncoding(_)));
    }
}
