use super::*;

const MASK: [u8; 4] = [0x37, 0xFA, 0x21, 0x3D];

/// A masked client frame as it would appear on the wire.
fn masked_frame(fin: bool, opcode: Opcode, payload: &[u8]) -> Frame {
    Frame {
        fin,
        rsv1: false,
        rsv2: false,
        rsv3: false,
        opcode,
        mask: Some(MASK),
        payload: apply_mask(payload, MASK),
    }
}

async fn read_from(bytes: &[u8]) -> Result<Frame, WsError> {
    let mut cursor = bytes;
    Frame::read(&mut cursor).await
}

#[tokio::test]
async fn round_trip_across_length_encodings() {
    for len in [0usize, 1, 125, 126, 65535, 65536] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let original = masked_frame(true, Opcode::Binary, &payload);

        let parsed = read_from(&original.to_bytes()).await.expect("parse");

        assert_eq!(parsed.fin, original.fin, "len {len}");
        assert_eq!(parsed.opcode, Opcode::Binary, "len {len}");
        assert_eq!(parsed.mask, Some(MASK), "len {len}");
        assert_eq!(parsed.payload.len(), len, "len {len}");
        assert_eq!(parsed.decode().expect("decode"), payload, "len {len}");
    }
}

#[tokio::test]
async fn length_encoding_boundaries() {
    // 125 fits inline in the 7-bit field.
    let bytes = masked_frame(true, Opcode::Text, &[b'x'; 125]).to_bytes();
    assert_eq!(bytes[1] & 0x7F, 125);
    assert_eq!(bytes.len(), 2 + 4 + 125);

    // 126 switches to the 2-byte extended form.
    let bytes = masked_frame(true, Opcode::Text, &[b'x'; 126]).to_bytes();
    assert_eq!(bytes[1] & 0x7F, 126);
    assert_eq!(u16::from_be_bytes([bytes[2], bytes[3]]), 126);
    assert_eq!(bytes.len(), 2 + 2 + 4 + 126);

    // 65536 switches to the 8-byte extended form.
    let bytes = masked_frame(true, Opcode::Binary, &vec![0u8; 65536]).to_bytes();
    assert_eq!(bytes[1] & 0x7F, 127);
    let mut ext = [0u8; 8];
    ext.copy_from_slice(&bytes[2..10]);
    assert_eq!(u64::from_be_bytes(ext), 65536);
}

#[test]
fn masking_is_an_involution() {
    let payloads: [&[u8]; 3] = [b"", b"Hello", &[0xFF, 0x00, 0x7F, 0x80, 0x01]];
    for payload in payloads {
        for mask in [[0u8; 4], MASK, [0xFF, 0xFF, 0xFF, 0xFF]] {
            assert_eq!(apply_mask(&apply_mask(payload, mask), mask), payload);
        }
    }
}

#[tokio::test]
async fn unmasked_frame_is_rejected() {
    let bytes = Frame::data(Opcode::Text, b"nope".to_vec()).to_bytes();
    assert!(matches!(read_from(&bytes).await, Err(WsError::UnmaskedFrame)));
}

#[tokio::test]
async fn unknown_opcode_is_rejected() {
    // Opcode 0x3 is reserved.
    let bytes = [0x83, 0x80, 0, 0, 0, 0];
    assert!(matches!(read_from(&bytes).await, Err(WsError::UnknownOpcode(0x3))));
}

#[tokio::test]
async fn short_reads_are_transport_errors() {
    // Truncated at every stage: header, extended length, mask, payload.
    let full = masked_frame(true, Opcode::Text, &[b'y'; 200]).to_bytes();
    for cut in [1, 3, 5, full.len() - 1] {
        let result = read_from(&full[..cut]).await;
        assert!(matches!(result, Err(WsError::IncompleteRead(_))), "cut at {cut}");
    }
}

#[test]
fn decode_rejects_continuation_and_non_final_frames() {
    let continuation = masked_frame(true, Opcode::Continuation, b"frag");
    assert!(matches!(continuation.decode(), Err(WsError::CannotDecodeContinuation)));

    let non_final = masked_frame(false, Opcode::Text, b"frag");
    assert!(matches!(non_final.decode(), Err(WsError::CannotDecodeContinuation)));
}

#[test]
fn decode_without_mask_returns_payload_verbatim() {
    let frame = Frame::data(Opcode::Text, b"server side".to_vec());
    assert_eq!(frame.decode().expect("decode"), b"server side");
}

#[test]
fn close_frame_carries_big_endian_status() {
    let frame = Frame::close(CLOSE_PROTOCOL_ERROR);
    assert_eq!(frame.payload, vec![0x03, 0xEA]);
    assert_eq!(frame.close_status(), Some(1002));
    assert_eq!(frame.to_bytes(), vec![0x88, 0x02, 0x03, 0xEA]);
}

#[test]
fn close_status_of_masked_close_frame() {
    let frame = masked_frame(true, Opcode::Close, &CLOSE_NORMAL.to_be_bytes());
    assert_eq!(frame.close_status(), Some(1000));

    let empty = masked_frame(true, Opcode::Close, b"");
    assert_eq!(empty.close_status(), None);
}

#[test]
fn control_opcodes() {
    assert!(Opcode::Close.is_control());
    assert!(Opcode::Ping.is_control());
    assert!(Opcode::Pong.is_control());
    assert!(!Opcode::Text.is_control());
    assert!(!Opcode::Binary.is_control());
    assert!(!Opcode::Continuation.is_control());
}

#[tokio::test]
async fn parse_reads_exactly_one_frame() {
    let first = masked_frame(true, Opcode::Text, b"one").to_bytes();
    let second = masked_frame(true, Opcode::Text, b"two").to_bytes();
    let mut stream: Vec<u8> = first;
    stream.extend_from_slice(&second);

    let mut cursor: &[u8] = &stream;
    let a = Frame::read(&mut cursor).await.expect("first frame");
    let b = Frame::read(&mut cursor).await.expect("second frame");
    assert_eq!(a.decode().expect("decode"), b"one");
    assert_eq!(b.decode().expect("decode"), b"two");
    assert!(cursor.is_empty());
}
