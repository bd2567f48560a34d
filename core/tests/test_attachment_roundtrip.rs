// # 📂 `tests/test_attachment_roundtrip.rs`

// * ✅ encrypt → split → decrypt for empty, small, chunk-aligned and multi-chunk inputs
// * ✅ armored path (armor → split_armor → decrypt)
// * ✅ passphrase-locked rings, wrong passphrase, wrong key
// * ✅ tampered and truncated data packets fail without plaintext
// * ✅ time policy stamps the literal packet and gates key validity
// * ✅ chunking of the plaintext does not change the result (proptest)

#[cfg(test)]
mod tests {
    use attachment_core::attachment::{decrypt_split, split_armor};
    use attachment_core::crypto::{CryptoError, KdfParams, KeyEntity, KeyError, KeyRing};
    use attachment_core::packet::{PacketConfig, PacketError, SymmetricAlgorithm};
    use attachment_core::telemetry::Stage;
    use attachment_core::{AttachmentConfig, AttachmentCrypto, AttachmentError};
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn key_created() -> DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    fn ring(seed: u8) -> KeyRing {
        KeyRing::from_entity(KeyEntity::from_secret([seed; 32], key_created()))
    }

    /// 512-octet partial chunks and 64-octet AEAD chunks: small inputs cross many boundaries.
    fn small_chunks() -> AttachmentCrypto {
        AttachmentCrypto::with_config(AttachmentConfig {
            partial_chunk_size: 512,
            aead_chunk_octet: 0,
            low_memory_reclaim_threshold: 4096,
            ..AttachmentConfig::default()
        })
        .unwrap()
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 256) as u8).collect()
    }

    fn roundtrip(crypto: &AttachmentCrypto, plaintext: &[u8]) -> Vec<u8> {
        let mut keys = ring(1);
        let split = crypto.encrypt_attachment(plaintext, "file.bin", &keys).unwrap();
        assert!(!split.key_packet.is_empty());
        assert!(!split.data_packet.is_empty());
        assert_eq!(split.algorithm, SymmetricAlgorithm::Aes256);
        crypto
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "")
            .unwrap()
    }

    #[test]
    fn test_roundtrip_default_config() {
        init_tracing();
        let crypto = AttachmentCrypto::new();
        for len in [0usize, 1, 100, 64 * 1024, 2 * 64 * 1024, 200_000] {
            let plaintext = pattern(len);
            assert_eq!(roundtrip(&crypto, &plaintext), plaintext, "len {len}");
        }
    }

    #[test]
    fn test_roundtrip_small_chunks() {
        init_tracing();
        let crypto = small_chunks();
        for len in [0usize, 63, 64, 65, 511, 512, 513, 4096, 10_000] {
            let plaintext = pattern(len);
            assert_eq!(roundtrip(&crypto, &plaintext), plaintext, "len {len}");
        }
    }

    #[test]
    fn test_concatenated_split_is_a_complete_message() -> anyhow::Result<()> {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(2);
        let split = crypto.encrypt_attachment(b"whole message", "w.txt", &keys)?;

        let whole = split.concatenated();
        let (key, data) = whole.split_at(split.key_packet.len());
        let plain = crypto.decrypt_attachment(key, data, &mut keys, "")?;
        assert_eq!(plain, b"whole message");
        Ok(())
    }

    #[test]
    fn test_key_packet_is_one_pkesk() {
        let crypto = AttachmentCrypto::new();
        let keys = ring(1);
        let split = crypto.encrypt_attachment(b"hello", "a.txt", &keys).unwrap();

        // new-format tag 1, one-octet length 92, version 3
        assert_eq!(split.key_packet.len(), 2 + 92);
        assert_eq!(&split.key_packet[..3], &[0xC1, 92, 3]);
        assert_eq!(split.data_packet[0], 0xD2);
    }

    #[test]
    fn test_multiple_recipients_each_decrypt() {
        let crypto = AttachmentCrypto::new();
        let alice = KeyEntity::from_secret([1; 32], key_created());
        let bob = KeyEntity::from_secret([2; 32], key_created());
        let recipients = KeyRing::new(vec![alice.to_public(), bob.to_public()]);

        let split = crypto.encrypt_attachment(b"for both", "both.txt", &recipients).unwrap();
        for entity in [alice, bob] {
            let mut own = KeyRing::from_entity(entity);
            let plain = crypto
                .decrypt_attachment(&split.key_packet, &split.data_packet, &mut own, "")
                .unwrap();
            assert_eq!(plain, b"for both");
        }
    }

    #[test]
    fn test_armored_split_roundtrip() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(3);
        let plaintext = pattern(70_000);
        let split = crypto.encrypt_attachment(&plaintext, "armored.bin", &keys).unwrap();

        let resplit = split_armor(&split.armored()).unwrap();
        assert_eq!(resplit, split);

        let plain = crypto
            .decrypt_attachment(&resplit.key_packet, &resplit.data_packet, &mut keys, "")
            .unwrap();
        assert_eq!(plain, plaintext);
    }

    #[test]
    fn test_locked_ring_unlocks_with_passphrase() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(4);
        let split = crypto.encrypt_attachment(b"secret data", "s.txt", &keys).unwrap();
        keys.lock(b"hunter2", KdfParams::insecure_fast()).unwrap();

        let plain = crypto
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "hunter2")
            .unwrap();
        assert_eq!(plain, b"secret data");
        assert!(!keys.is_locked());
    }

    #[test]
    fn test_wrong_passphrase_is_reported() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(5);
        let split = crypto.encrypt_attachment(b"secret data", "s.txt", &keys).unwrap();
        keys.lock(b"hunter2", KdfParams::insecure_fast()).unwrap();

        let err = crypto
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "hunter3")
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Unlock(KeyError::BadPassphrase)));
        assert_eq!(err.to_string(), "cannot decrypt attachment: incorrect passphrase");
        assert!(keys.is_locked());
    }

    #[test]
    fn test_mixed_passphrases_open_the_addressed_key() {
        let crypto = AttachmentCrypto::new();
        let mut alpha = KeyEntity::from_secret([21; 32], key_created());
        let mut beta = KeyEntity::from_secret([22; 32], key_created());
        let split = crypto
            .encrypt_attachment(b"for alpha", "a.txt", &KeyRing::from_entity(alpha.to_public()))
            .unwrap();
        alpha.lock(b"alpha", KdfParams::insecure_fast()).unwrap();
        beta.lock(b"beta", KdfParams::insecure_fast()).unwrap();
        let mut keys = KeyRing::new(vec![alpha, beta]);

        for _ in 0..2 {
            let plain = crypto
                .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "alpha")
                .unwrap();
            assert_eq!(plain, b"for alpha");
        }
        assert!(keys.entities()[1].is_locked());
    }

    #[test]
    fn test_decrypt_split_reports_telemetry() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(23);
        let plaintext = pattern(5000);
        let split = crypto.encrypt_attachment(&plaintext, "t.bin", &keys).unwrap();
        keys.lock(b"pw", KdfParams::insecure_fast()).unwrap();

        let config = PacketConfig::at(Utc::now());
        let (attachment, snap) =
            decrypt_split(&split.key_packet, &split.data_packet, &mut keys, "pw", &config).unwrap();

        assert_eq!(attachment.data, plaintext);
        assert_eq!(attachment.file_name, "t.bin");
        assert_eq!(snap.bytes_plaintext, 5000);
        assert_eq!(snap.bytes_key_packet, split.key_packet.len() as u64);
        assert_eq!(snap.bytes_data_packet, split.data_packet.len() as u64);
        assert!(snap.has_all_stages(&[Stage::Unlock, Stage::Decrypt]));
    }

    #[test]
    fn test_wrong_key_finds_no_match() {
        let crypto = AttachmentCrypto::new();
        let split = crypto.encrypt_attachment(b"data", "d.txt", &ring(6)).unwrap();

        let err = crypto
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut ring(7), "")
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::NoMatchingKey)));
    }

    #[test]
    fn test_public_only_ring_cannot_decrypt() {
        let crypto = AttachmentCrypto::new();
        let keys = ring(8);
        let split = crypto.encrypt_attachment(b"data", "d.txt", &keys).unwrap();

        let err = crypto
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys.to_public(), "")
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::NoMatchingKey)));
    }

    #[test]
    fn test_tampered_data_packet_fails() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(9);
        let split = crypto.encrypt_attachment(&pattern(100), "t.bin", &keys).unwrap();

        let mut data = split.data_packet.clone();
        let idx = data.len() - 20;
        data[idx] ^= 0x01;

        let err = crypto
            .decrypt_attachment(&split.key_packet, &data, &mut keys, "")
            .unwrap_err();
        assert!(matches!(
            err,
            AttachmentError::Packet(PacketError::Crypto(CryptoError::TagMismatch))
        ));
    }

    #[test]
    fn test_tampered_final_tag_fails_after_full_read() {
        let crypto = small_chunks();
        let mut keys = ring(9);
        let split = crypto.encrypt_attachment(&pattern(1000), "t.bin", &keys).unwrap();

        let mut data = split.data_packet.clone();
        let last = data.len() - 1;
        data[last] ^= 0x80;

        let err = crypto
            .decrypt_attachment(&split.key_packet, &data, &mut keys, "")
            .unwrap_err();
        assert!(matches!(
            err,
            AttachmentError::Packet(PacketError::Crypto(CryptoError::TagMismatch))
        ));
    }

    #[test]
    fn test_truncated_data_packet_fails() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(10);
        let split = crypto.encrypt_attachment(&pattern(5000), "t.bin", &keys).unwrap();

        let cut = &split.data_packet[..split.data_packet.len() - 10];
        let err = crypto
            .decrypt_attachment(&split.key_packet, cut, &mut keys, "")
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::Truncated)));
    }

    #[test]
    fn test_swapped_key_packet_fails() {
        let crypto = AttachmentCrypto::new();
        let mut keys = ring(11);
        let first = crypto.encrypt_attachment(b"first", "1.txt", &keys).unwrap();
        let second = crypto.encrypt_attachment(b"second", "2.txt", &keys).unwrap();

        let err = crypto
            .decrypt_attachment(&first.key_packet, &second.data_packet, &mut keys, "")
            .unwrap_err();
        assert!(matches!(
            err,
            AttachmentError::Packet(PacketError::Crypto(CryptoError::TagMismatch))
        ));
    }

    #[test]
    fn test_time_generator_stamps_literal_packet() {
        let fixed = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let crypto = AttachmentCrypto::new().with_time_generator(move || fixed);
        let mut keys = ring(12);

        let split = crypto.encrypt_attachment(b"dated", "dated.txt", &keys).unwrap();
        let details = crypto
            .decrypt_attachment_details(&split.key_packet, &split.data_packet, &mut keys, "")
            .unwrap();
        assert_eq!(details.data, b"dated");
        assert_eq!(details.file_name, "dated.txt");
        assert_eq!(details.modified, fixed);
    }

    #[test]
    fn test_server_time_anchor_is_used() {
        let mut crypto = AttachmentCrypto::new();
        crypto.update_time(1_650_000_000);
        let now = crypto.now().timestamp();
        assert!((1_650_000_000..1_650_000_060).contains(&now));

        // older anchors never move time backwards
        crypto.update_time(1_640_000_000);
        assert!(crypto.now().timestamp() >= 1_650_000_000);

        let mut keys = ring(13);
        let split = crypto.encrypt_attachment(b"anchored", "a.txt", &keys).unwrap();
        let details = crypto
            .decrypt_attachment_details(&split.key_packet, &split.data_packet, &mut keys, "")
            .unwrap();
        assert!(details.modified.timestamp() >= 1_650_000_000);
        assert!(details.modified.timestamp() < 1_650_000_060);
    }

    #[test]
    fn test_key_not_yet_valid() {
        let before_key = key_created() - chrono::Duration::days(1);
        let crypto = AttachmentCrypto::new().with_time_generator(move || before_key);

        let err = crypto.encrypt_attachment(b"too early", "e.txt", &ring(14)).unwrap_err();
        assert!(matches!(
            err,
            AttachmentError::Construction(PacketError::Key(KeyError::NoUsableKey(_)))
        ));
    }

    #[test]
    fn test_decrypt_ignores_keys_not_yet_valid() {
        let mut keys = ring(15);
        let split = AttachmentCrypto::new()
            .encrypt_attachment(b"later", "l.txt", &keys)
            .unwrap();

        let before_key = key_created() - chrono::Duration::days(1);
        let early = AttachmentCrypto::new().with_time_generator(move || before_key);
        let err = early
            .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "")
            .unwrap_err();
        assert!(matches!(err, AttachmentError::Packet(PacketError::NoMatchingKey)));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_chunking_does_not_change_plaintext(
            plaintext in proptest::collection::vec(any::<u8>(), 0..3000),
            cuts in proptest::collection::vec(1usize..700, 1..8),
        ) {
            let crypto = small_chunks();
            let mut keys = ring(16);

            let mut processor = crypto
                .encrypt_attachment_low_memory(plaintext.len(), "prop.bin", &keys)
                .unwrap();
            let mut rest = plaintext.as_slice();
            let mut i = 0;
            while !rest.is_empty() {
                let n = cuts[i % cuts.len()].min(rest.len());
                processor.process(&rest[..n]).unwrap();
                rest = &rest[n..];
                i += 1;
            }
            let split = processor.finish().unwrap();

            let one_shot = crypto.encrypt_attachment(&plaintext, "prop.bin", &keys).unwrap();
            prop_assert_eq!(split.data_packet.len(), one_shot.data_packet.len());

            let plain = crypto
                .decrypt_attachment(&split.key_packet, &split.data_packet, &mut keys, "")
                .unwrap();
            prop_assert_eq!(plain, plaintext);
        }
    }
}
