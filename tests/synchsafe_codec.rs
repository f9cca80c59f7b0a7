use tagbox::error::Error;
use tagbox::synchsafe::{MAX_U28, decode_u28, decode_unsync, encode_u28, encode_unsync};

#[test]
fn u28_known_encodings() {
    assert_eq!(encode_u28(0).expect("encode"), [0, 0, 0, 0]);
    assert_eq!(encode_u28(0x7f).expect("encode"), [0, 0, 0, 0x7f]);
    assert_eq!(encode_u28(0x80).expect("encode"), [0, 0, 0x01, 0x00]);
    assert_eq!(encode_u28(257).expect("encode"), [0, 0, 0x02, 0x01]);
    assert_eq!(
        encode_u28(MAX_U28).expect("encode"),
        [0x7f, 0x7f, 0x7f, 0x7f]
    );
}

#[test]
fn u28_roundtrip_across_the_range() {
    let samples = [
        0u32,
        1,
        0x7f,
        0x80,
        0x3fff,
        0x4000,
        0x1f_ffff,
        0x20_0000,
        12_345_678,
        MAX_U28,
    ];
    for v in samples {
        let bytes = encode_u28(v).expect("encode");
        assert!(bytes.iter().all(|b| b & 0x80 == 0), "high bit set for {v}");
        assert_eq!(decode_u28(bytes), v, "roundtrip failed for {v}");
    }
}

#[test]
fn u28_rejects_values_above_28_bits() {
    assert!(matches!(
        encode_u28(MAX_U28 + 1),
        Err(Error::EncodingRange(_))
    ));
    assert!(matches!(encode_u28(u32::MAX), Err(Error::EncodingRange(_))));
}

#[test]
fn unsync_encode_inserts_after_ff() {
    // 0x00 and top-bits-set bytes get a stuffing byte, others do not
    assert_eq!(encode_unsync(&[0xff, 0x00]), vec![0xff, 0x00, 0x00]);
    assert_eq!(encode_unsync(&[0xff, 0xe2]), vec![0xff, 0x00, 0xe2]);
    assert_eq!(encode_unsync(&[0xff, 0xff]), vec![0xff, 0x00, 0xff]);
    assert_eq!(encode_unsync(&[0xff, 0x41]), vec![0xff, 0x41]);
    // trailing 0xff gets no insertion
    assert_eq!(encode_unsync(&[0x41, 0xff]), vec![0x41, 0xff]);
}

#[test]
fn unsync_decode_drops_stuffing() {
    assert_eq!(decode_unsync(&[0xff, 0x00, 0xe2]), vec![0xff, 0xe2]);
    assert_eq!(decode_unsync(&[0xff, 0x00, 0x00]), vec![0xff, 0x00]);
    assert_eq!(decode_unsync(&[0xff, 0x41]), vec![0xff, 0x41]);
}

#[test]
fn unsync_roundtrip_is_identity() {
    let cases: Vec<Vec<u8>> = vec![
        vec![],
        vec![0xff],
        vec![0x00],
        vec![0xff, 0x00],
        vec![0xff, 0xff, 0xff],
        vec![0xff, 0x00, 0xff, 0xe0, 0x00],
        b"plain text payload".to_vec(),
        (0u8..=255).collect(),
        (0u8..=255).rev().collect(),
    ];
    for data in cases {
        assert_eq!(
            decode_unsync(&encode_unsync(&data)),
            data,
            "roundtrip failed for {data:02x?}"
        );
    }
}
