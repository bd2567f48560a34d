#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read, Write};
    use std::thread;

    use attachment_core::attachment::pipe;

    #[test]
    fn test_pipe_delivers_in_order_across_threads() {
        let (mut writer, mut reader) = pipe(0);
        let producer = thread::spawn(move || {
            for i in 0..100u8 {
                writer.write_all(&[i; 10]).unwrap();
            }
            // dropping the writer ends the stream
        });

        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        producer.join().unwrap();

        assert_eq!(out.len(), 1000);
        assert!(out.chunks(10).enumerate().all(|(i, c)| c.iter().all(|&b| b == i as u8)));
    }

    #[test]
    fn test_small_reads_split_messages() {
        let (mut writer, mut reader) = pipe(4);
        writer.write_all(b"abcdef").unwrap();
        writer.write_all(&[]).unwrap();
        drop(writer);

        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_after_reader_dropped_is_broken_pipe() {
        let (mut writer, reader) = pipe(1);
        drop(reader);
        let err = writer.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }
}
