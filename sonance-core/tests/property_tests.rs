#![forbid(unsafe_code)]

use std::sync::Arc;

use sonance_core::{
    backend::MemoryStorage,
    clock::SystemClock,
    crypto::{decrypt, derive_key, derive_subkey, encrypt, KdfParams, SecretKey},
    strength::{evaluate, Feedback, MAX_SCORE, MIN_LENGTH},
    StoreConfig, WalletData, WalletError, WalletStore,
};
use proptest::prelude::*;

fn test_store() -> WalletStore {
    WalletStore::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(SystemClock),
        StoreConfig::default().with_kdf(KdfParams::TESTING),
    )
}

fn strong_passphrase() -> impl Strategy<Value = String> {
    "[a-z]{4,12}".prop_map(|s| format!("Aa1!{s}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn strength_score_bounded(passphrase in ".{0,64}") {
        let report = evaluate(&passphrase);
        prop_assert!(report.score <= MAX_SCORE);
    }

    #[test]
    fn short_passphrases_never_valid(passphrase in ".{0,7}") {
        prop_assume!(passphrase.chars().count() < MIN_LENGTH);
        let report = evaluate(&passphrase);
        prop_assert!(!report.is_valid);
        prop_assert!(report.feedback.contains(&Feedback::TooShort));
    }

    #[test]
    fn validity_follows_score_rule(passphrase in "[a-zA-Z0-9!@# ]{0,24}") {
        let report = evaluate(&passphrase);
        let expected = report.score >= 4 && passphrase.chars().count() >= MIN_LENGTH;
        prop_assert_eq!(report.is_valid, expected);
    }

    #[test]
    fn feedback_mentions_every_missing_class(passphrase in "[a-z]{8,20}") {
        let report = evaluate(&passphrase);
        prop_assert!(report.feedback.contains(&Feedback::AddUppercase));
        prop_assert!(report.feedback.contains(&Feedback::AddDigit));
        prop_assert!(report.feedback.contains(&Feedback::AddSpecial));
        prop_assert!(!report.feedback.contains(&Feedback::AddLowercase));
    }

    #[test]
    fn encrypt_decrypt_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 1..4096),
        iv in prop::array::uniform16(any::<u8>())
    ) {
        let key = SecretKey::generate();
        let encrypted = encrypt(&plaintext, &key, &iv).unwrap();
        let decrypted = decrypt(&encrypted, &key, &iv).unwrap();
        prop_assert_eq!(&plaintext[..], &decrypted[..]);
    }

    #[test]
    fn subkey_derivation_deterministic(context in prop::collection::vec(any::<u8>(), 1..64)) {
        let master = SecretKey::generate();
        let subkey1 = derive_subkey(&master, &context);
        let subkey2 = derive_subkey(&master, &context);
        prop_assert_eq!(subkey1.expose(), subkey2.expose());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    #[ignore]
    fn key_derivation_deterministic(
        password in prop::collection::vec(any::<u8>(), 1..128),
        salt in prop::array::uniform16(any::<u8>())
    ) {
        let key1 = derive_key(&password, &salt, KdfParams::TESTING).unwrap();
        let key2 = derive_key(&password, &salt, KdfParams::TESTING).unwrap();
        prop_assert_eq!(key1.expose(), key2.expose());
    }

    #[test]
    #[ignore]
    fn different_salts_produce_different_keys(
        password in prop::collection::vec(any::<u8>(), 1..64),
        salt1 in prop::array::uniform16(any::<u8>()),
        salt2 in prop::array::uniform16(any::<u8>())
    ) {
        prop_assume!(salt1 != salt2);
        let key1 = derive_key(&password, &salt1, KdfParams::TESTING).unwrap();
        let key2 = derive_key(&password, &salt2, KdfParams::TESTING).unwrap();
        prop_assert_ne!(key1.expose(), key2.expose());
    }

    #[test]
    #[ignore]
    fn wallet_roundtrip(
        words in prop::collection::vec("[a-z]{3,8}", 12..=24),
        secret in prop::array::uniform32(any::<u8>()),
        label in "[ -~]{0,32}",
        passphrase in strong_passphrase()
    ) {
        let store = test_store();
        let data = WalletData::new(words.join(" "), hex::encode(secret), "bc1qprop", label);

        store.store(&data, &passphrase).unwrap();
        let restored = store.retrieve(&passphrase).unwrap().unwrap();
        prop_assert_eq!(restored, data);
    }

    #[test]
    #[ignore]
    fn wrong_passphrase_never_yields_data(
        secret in prop::array::uniform32(any::<u8>()),
        right in strong_passphrase(),
        wrong in strong_passphrase()
    ) {
        prop_assume!(right != wrong);
        let store = test_store();
        let data = WalletData::new("legal winner thank year", hex::encode(secret), "bc1qprop", "p");

        store.store(&data, &right).unwrap();
        let result = store.retrieve(&wrong);
        prop_assert!(matches!(result, Err(WalletError::DecryptionFailed)));
    }

    #[test]
    #[ignore]
    fn wrong_key_never_yields_plaintext(
        plaintext in prop::collection::vec(any::<u8>(), 1..256),
        iv in prop::array::uniform16(any::<u8>())
    ) {
        let key1 = SecretKey::generate();
        let key2 = SecretKey::generate();
        let encrypted = encrypt(&plaintext, &key1, &iv).unwrap();
        match decrypt(&encrypted, &key2, &iv) {
            Ok(garbage) => prop_assert_ne!(&garbage[..], &plaintext[..]),
            Err(e) => prop_assert!(matches!(e, WalletError::DecryptionFailed)),
        }
    }
}
