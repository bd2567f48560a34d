// # 📂 `tests/test_packet_framing.rs`

// * ✅ body length encodings (1, 2 and 5 octets, partial)
// * ✅ header validation (partial lengths only on data packets, first chunk >= 512)
// * ✅ old-format headers on read
// * ✅ partial body writer / reader symmetry at chunk boundaries

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use attachment_core::packet::{
        encode_body_length, read_body_length, read_packet_header, write_packet, write_packet_header, BodyLength,
        PacketError, PartialBodyReader, PartialBodyWriter, Tag,
    };

    fn encoded(length: BodyLength) -> Vec<u8> {
        let mut out = Vec::new();
        encode_body_length(length, &mut out).unwrap();
        out
    }

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_body_length_encodings() {
        assert_eq!(encoded(BodyLength::Fixed(100)), vec![100]);
        assert_eq!(encoded(BodyLength::Fixed(191)), vec![191]);
        assert_eq!(encoded(BodyLength::Fixed(192)), vec![192, 0]);
        assert_eq!(encoded(BodyLength::Fixed(1000)), vec![0xC3, 0x28]);
        assert_eq!(encoded(BodyLength::Fixed(8383)), vec![223, 255]);
        assert_eq!(encoded(BodyLength::Fixed(100_000)), vec![255, 0x00, 0x01, 0x86, 0xA0]);
        assert_eq!(encoded(BodyLength::Partial(512)), vec![233]);
        assert_eq!(encoded(BodyLength::Partial(1 << 16)), vec![240]);
    }

    #[test]
    fn test_body_length_decodes_what_it_encodes() {
        for length in [
            BodyLength::Fixed(0),
            BodyLength::Fixed(191),
            BodyLength::Fixed(192),
            BodyLength::Fixed(8383),
            BodyLength::Fixed(8384),
            BodyLength::Fixed(u32::MAX),
            BodyLength::Partial(1),
            BodyLength::Partial(1 << 30),
        ] {
            let bytes = encoded(length);
            let mut raw = Vec::new();
            let decoded = read_body_length(&mut bytes.as_slice(), &mut raw).unwrap();
            assert_eq!(decoded, length);
            assert_eq!(raw, bytes, "raw octets are kept verbatim");
        }
    }

    #[test]
    fn test_invalid_lengths_rejected() {
        let mut out = Vec::new();
        assert!(matches!(
            encode_body_length(BodyLength::Partial(1000), &mut out),
            Err(PacketError::InvalidLength(_))
        ));
        assert!(matches!(
            encode_body_length(BodyLength::Indeterminate, &mut out),
            Err(PacketError::InvalidLength(_))
        ));
        assert!(matches!(
            write_packet_header(&mut out, Tag::PublicKeyEncryptedSessionKey, BodyLength::Partial(512)),
            Err(PacketError::InvalidLength(_))
        ));
        assert!(matches!(
            write_packet_header(&mut out, Tag::LiteralData, BodyLength::Partial(256)),
            Err(PacketError::InvalidLength(_))
        ));
    }

    #[test]
    fn test_read_header_variants() {
        let mut empty: &[u8] = &[];
        assert!(read_packet_header(&mut empty).unwrap().is_none());

        let mut bad: &[u8] = &[0x00];
        assert!(matches!(read_packet_header(&mut bad), Err(PacketError::Malformed(_))));

        let mut cut: &[u8] = &[0xC1];
        assert!(matches!(read_packet_header(&mut cut), Err(PacketError::Truncated)));

        let mut unknown: &[u8] = &[0xC0 | 60, 0];
        assert!(matches!(read_packet_header(&mut unknown), Err(PacketError::UnknownTag(60))));

        // partial length on a session-key packet
        let mut partial_pkesk: &[u8] = &[0xC1, 0xE9];
        assert!(matches!(read_packet_header(&mut partial_pkesk), Err(PacketError::InvalidLength(_))));
    }

    #[test]
    fn test_old_format_header() {
        // tag 1, one-octet length
        let mut input: &[u8] = &[0x84, 7];
        let header = read_packet_header(&mut input).unwrap().unwrap();
        assert_eq!(header.tag, Tag::PublicKeyEncryptedSessionKey);
        assert_eq!(header.length, BodyLength::Fixed(7));
        assert_eq!(header.raw, vec![0x84, 7]);

        // tag 10, two-octet length
        let mut input: &[u8] = &[0xA9, 0x01, 0x00];
        let header = read_packet_header(&mut input).unwrap().unwrap();
        assert_eq!(header.tag, Tag::Marker);
        assert_eq!(header.length, BodyLength::Fixed(256));

        // tag 11, indeterminate length
        let mut input: &[u8] = &[0xAF];
        let header = read_packet_header(&mut input).unwrap().unwrap();
        assert_eq!(header.tag, Tag::LiteralData);
        assert_eq!(header.length, BodyLength::Indeterminate);
    }

    #[test]
    fn test_write_packet_definite() {
        let mut out = Vec::new();
        write_packet(&mut out, Tag::Marker, b"PGP").unwrap();
        assert_eq!(out, vec![0xCA, 3, b'P', b'G', b'P']);
    }

    #[test]
    fn test_partial_writer_layout() {
        let data = pattern(1300);
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 512).unwrap();
        w.write_all(&data).unwrap();
        let out = w.finish().unwrap();

        // tag, 512 chunk, 512 chunk, 2-octet final length + 276 octets
        assert_eq!(out.len(), 1 + 1 + 512 + 1 + 512 + 2 + 276);
        assert_eq!(out[0], 0xCB);
        assert_eq!(out[1], 0xE9);
        assert_eq!(out[514], 0xE9);
        assert_eq!(&out[1027..1029], &[0xC0, 0x54]);
    }

    #[test]
    fn test_partial_writer_exact_multiple_ends_with_zero_length() {
        let data = pattern(1024);
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::SymEncryptedIntegrityProtectedData, 512).unwrap();
        w.write_all(&data).unwrap();
        let out = w.finish().unwrap();
        assert_eq!(out.len(), 1 + 1 + 512 + 1 + 512 + 1);
        assert_eq!(*out.last().unwrap(), 0);
    }

    #[test]
    fn test_partial_writer_small_body_uses_definite_length() {
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 512).unwrap();
        w.write_all(b"hi").unwrap();
        assert_eq!(w.finish().unwrap(), vec![0xCB, 2, b'h', b'i']);

        let w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 512).unwrap();
        assert_eq!(w.finish().unwrap(), vec![0xCB, 0]);
    }

    #[test]
    fn test_partial_writer_rejects_bad_settings() {
        assert!(PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 1000).is_err());
        assert!(PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 256).is_err());
        assert!(PartialBodyWriter::new(Vec::new(), Tag::Marker, 512).is_err());
    }

    #[test]
    fn test_partial_reader_reassembles_body() {
        for len in [0usize, 1, 511, 512, 513, 1024, 5000] {
            let data = pattern(len);
            let mut w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 512).unwrap();
            // odd write sizes exercise buffering across chunk boundaries
            for piece in data.chunks(77) {
                w.write_all(piece).unwrap();
            }
            let out = w.finish().unwrap();

            let mut input = out.as_slice();
            let header = read_packet_header(&mut input).unwrap().unwrap();
            let mut body = Vec::new();
            PartialBodyReader::new(&mut input, header.length).read_to_end(&mut body).unwrap();
            assert_eq!(body, data, "len {len}");
            assert!(input.is_empty());
        }
    }

    #[test]
    fn test_partial_reader_detects_truncation() {
        let data = pattern(2000);
        let mut w = PartialBodyWriter::new(Vec::new(), Tag::LiteralData, 512).unwrap();
        w.write_all(&data).unwrap();
        let mut out = w.finish().unwrap();
        out.truncate(out.len() - 10);

        let mut input = out.as_slice();
        let header = read_packet_header(&mut input).unwrap().unwrap();
        let mut body = Vec::new();
        let err = PartialBodyReader::new(&mut input, header.length)
            .read_to_end(&mut body)
            .unwrap_err();
        assert!(matches!(PacketError::from(err), PacketError::Truncated));
    }
}
