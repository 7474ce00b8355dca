
use crate::QSBuffer;

/// Drain every byte currently held by the buffer
fn drain<const N: usize>(qs: &mut QSBuffer<N>) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(b) = qs.get_byte() {
        out.push(b);
    }
    out
}
