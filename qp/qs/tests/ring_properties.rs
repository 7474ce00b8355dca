//! Property-based tests for the QS ring buffer.
//!
//! Encoded records must survive the trip through the ring and the frame
//! decoder unchanged, and an overrun must keep exactly the newest bytes.

use proptest::prelude::*;
use qp_qs::decoder::HdlcDecoder;
use qp_qs::{QSBuffer, QSFilter};

fn drain<const N: usize>(qs: &mut QSBuffer<N>) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(block) = qs.get_block(7) {
        out.extend_from_slice(block);
    }
    out
}

fn emit<const N: usize>(qs: &mut QSBuffer<N>, user: u8, payload: &[u8]) {
    if qs.begin_user(user) {
        for &b in payload {
            qs.u8(b);
        }
        qs.end();
    }
}

fn fresh<const N: usize>() -> QSBuffer<N> {
    let mut qs = QSBuffer::new();
    qs.init();
    qs.filter_on(QSFilter::All);
    qs
}

prop_compose! {
    fn record()(user in 0..25u8, payload in prop::collection::vec(any::<u8>(), 0..24)) -> (u8, Vec<u8>) {
        (user, payload)
    }
}

proptest! {
    #[test]
    fn records_round_trip(records in prop::collection::vec(record(), 1..12)) {
        let mut qs: QSBuffer<4096> = fresh();
        for (user, payload) in &records {
            emit(&mut qs, *user, payload);
        }

        let mut decoder: HdlcDecoder<64> = HdlcDecoder::new();
        let mut frames = Vec::new();
        decoder.push_bytes(&drain(&mut qs), |f| frames.push(f));

        // two bootstrap records come first
        prop_assert_eq!(frames.len(), records.len() + 2);
        for (frame, (user, payload)) in frames[2..].iter().zip(&records) {
            let frame = frame.as_ref().unwrap();
            prop_assert_eq!(frame.record_type, 100 + *user);
            prop_assert_eq!(frame.payload.as_slice(), payload.as_slice());
        }
    }

    #[test]
    fn checksum_sums_to_good_value(payload in prop::collection::vec(any::<u8>(), 0..32)) {
        let mut qs: QSBuffer<256> = fresh();
        drain(&mut qs);
        emit(&mut qs, 0, &payload);

        let raw = drain(&mut qs);
        prop_assert_eq!(*raw.last().unwrap(), 0x7E);

        // undo the byte stuffing by hand
        let mut plain = Vec::new();
        let mut esc = false;
        for &b in &raw[..raw.len() - 1] {
            if esc {
                plain.push(b ^ 0x20);
                esc = false;
            } else if b == 0x7D {
                esc = true;
            } else {
                prop_assert_ne!(b, 0x7E);
                plain.push(b);
            }
        }
        // one's-complement checksum: a good record sums to 0xFF, not 0
        let sum = plain.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
        prop_assert_eq!(sum, 0xFF);
    }

    #[test]
    fn overrun_keeps_newest_bytes(records in prop::collection::vec(record(), 1..20)) {
        let mut reference: QSBuffer<8192> = fresh();
        let mut small: QSBuffer<64> = fresh();
        for (user, payload) in &records {
            emit(&mut reference, *user, payload);
            emit(&mut small, *user, payload);
        }

        let stream = drain(&mut reference);
        let expected = &stream[stream.len().saturating_sub(64)..];

        prop_assert_eq!(small.used(), expected.len());
        let got = drain(&mut small);
        prop_assert_eq!(got.as_slice(), expected);
        prop_assert_eq!(small.used(), 0);
    }
}
