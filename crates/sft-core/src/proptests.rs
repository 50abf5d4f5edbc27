//! Property tests for envelope handling.

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use proptest::prelude::*;
    use sft_crypto::{encode, KeyManager, KeyPair, KeyParams, VerificationResult};

    use crate::envelope::{validate_file_name, TransferEnvelope};
    use crate::errors::EnvelopeError;
    use crate::session::TransferSession;
    use crate::source::OutboundFile;

    fn pair() -> &'static KeyPair {
        static PAIR: OnceLock<KeyPair> = OnceLock::new();
        PAIR.get_or_init(|| KeyManager::new(KeyParams::ed25519()).generate().unwrap())
    }

    fn plain_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_][A-Za-z0-9_. -]{0,40}"
    }

    proptest! {
        /// Sealed envelopes survive JSON and verify on the other side.
        #[test]
        fn prop_seal_json_open_verify(
            name in plain_name(),
            data in prop::collection::vec(any::<u8>(), 0..2048),
        ) {
            let file = OutboundFile::new(name.clone(), "", data.clone());
            let envelope = TransferEnvelope::seal_with_key_pair(&file, pair())?;
            let received = TransferEnvelope::from_json(&envelope.to_json()?)?;
            prop_assert_eq!(&received, &envelope);

            let mut session = TransferSession::open(received).unwrap();
            prop_assert_eq!(session.bytes(), &data[..]);
            prop_assert_eq!(session.verify(), VerificationResult::Valid);
        }

        /// Any single flipped byte in the file is detected.
        #[test]
        fn prop_tampered_file_rejected(
            data in prop::collection::vec(any::<u8>(), 1..512),
            index in any::<prop::sample::Index>(),
            flip in 1u8..=255,
        ) {
            let file = OutboundFile::new("f.bin", "", data.clone());
            let mut envelope = TransferEnvelope::seal_with_key_pair(&file, pair())?;

            let mut tampered = data;
            let i = index.index(tampered.len());
            tampered[i] ^= flip;
            envelope.file_data = encode(&tampered);

            let mut session = TransferSession::open(envelope).unwrap();
            prop_assert_eq!(session.verify(), VerificationResult::Invalid);
            prop_assert!(!session.is_verified());
        }

        /// Names with a separator never validate.
        #[test]
        fn prop_separator_names_rejected(
            head in "[a-z.]{0,8}",
            sep in prop::sample::select(vec!['/', '\\']),
            tail in "[a-z.]{0,8}",
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(matches!(
                validate_file_name(&name),
                Err(EnvelopeError::PathInFileName(_))
            ));
        }
    }
}
