#[cfg(test)]
mod tests {
    use attachment_core::crypto::{
        unwrap_session_key, wrap_session_key, KdfParams, KeyEntity, KeyError, KeyId, KeyRing, SessionKey,
    };
    use chrono::{Duration, TimeZone, Utc};

    // ------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------
    fn created() -> chrono::DateTime<Utc> {
        Utc.timestamp_opt(1_600_000_000, 0).unwrap()
    }

    fn entity(seed: u8) -> KeyEntity {
        KeyEntity::from_secret([seed; 32], created())
    }

    #[test]
    fn test_key_id_is_stable_and_public_derived() {
        let a = entity(1);
        let b = entity(1);
        let c = entity(2);
        assert_eq!(a.key_id(), b.key_id());
        assert_ne!(a.key_id(), c.key_id());
        assert_eq!(a.to_public().key_id(), a.key_id());

        let public = KeyEntity::from_public(a.public_key().to_bytes(), created());
        assert_eq!(public.key_id(), a.key_id());
        assert!(!public.has_secret());
    }

    #[test]
    fn test_key_id_display_is_hex() {
        let id = KeyId([0xAB; 8]);
        assert_eq!(id.to_string(), "ABABABABABABABAB");
        assert!(KeyId::WILDCARD.is_wildcard());
    }

    #[test]
    fn test_session_key_wrap_roundtrip() {
        let recipient = entity(9);
        let session = SessionKey::generate();
        let wrapped = wrap_session_key(&session, recipient.public_key()).unwrap();
        assert_eq!(wrapped.wrapped.len(), 48);

        let secret = recipient.secret().unwrap();
        let opened = unwrap_session_key(secret, &wrapped.ephemeral_public, &wrapped.wrapped).unwrap();
        assert_eq!(opened.as_bytes(), session.as_bytes());

        let stranger = entity(10);
        assert!(unwrap_session_key(stranger.secret().unwrap(), &wrapped.ephemeral_public, &wrapped.wrapped).is_err());
    }

    #[test]
    fn test_lock_and_unlock() {
        let mut ring = KeyRing::from_entity(entity(3));
        assert!(!ring.is_locked());

        ring.lock(b"correct horse", KdfParams::insecure_fast()).unwrap();
        assert!(ring.is_locked());
        assert!(ring.entities()[0].secret().is_none());

        assert_eq!(ring.unlock(b"wrong"), Err(KeyError::BadPassphrase));
        assert!(ring.is_locked());

        ring.unlock(b"correct horse").unwrap();
        assert!(!ring.is_locked());
        assert!(ring.entities()[0].secret().is_some());
    }

    #[test]
    fn test_unlock_opens_matching_entities_only() {
        let mut first = entity(4);
        let mut second = entity(5);
        first.lock(b"one", KdfParams::insecure_fast()).unwrap();
        second.lock(b"two", KdfParams::insecure_fast()).unwrap();
        let mut ring = KeyRing::new(vec![first, second]);

        ring.unlock(b"one").unwrap();
        assert!(!ring.entities()[0].is_locked());
        assert!(ring.entities()[1].is_locked());
        assert!(ring.is_locked());
        assert!(ring.has_unlocked_secret());

        // the other entity still refuses, but an unlocked secret remains
        ring.unlock(b"one").unwrap();
        assert!(ring.entities()[1].is_locked());

        ring.unlock(b"two").unwrap();
        assert!(!ring.is_locked());
    }

    #[test]
    fn test_unlock_fails_when_nothing_opens() {
        let mut first = entity(8);
        let mut second = entity(9);
        first.lock(b"one", KdfParams::insecure_fast()).unwrap();
        second.lock(b"two", KdfParams::insecure_fast()).unwrap();
        let mut ring = KeyRing::new(vec![first, second]);

        assert_eq!(ring.unlock(b"three"), Err(KeyError::BadPassphrase));
        assert!(ring.entities().iter().all(KeyEntity::is_locked));
        assert!(!ring.has_unlocked_secret());
    }

    #[test]
    fn test_decryption_keys_respect_id_and_time() {
        let a = entity(6);
        let b = entity(7);
        let id_a = a.key_id();
        let ring = KeyRing::new(vec![a, b]);
        let now = created() + Duration::days(1);

        assert_eq!(ring.decryption_keys(id_a, now).len(), 1);
        assert_eq!(ring.decryption_keys(KeyId::WILDCARD, now).len(), 2);
        assert!(ring.decryption_keys(id_a, created() - Duration::seconds(1)).is_empty());
        assert!(ring.to_public().decryption_keys(id_a, now).is_empty());
    }
}
