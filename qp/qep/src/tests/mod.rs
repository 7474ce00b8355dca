mod hsm_test;

use qp_qs::{QSRecordType, QSpy};

/// Sink that remembers the id of every record it was asked to write
#[derive(Default)]
struct RecordLog {
    records: Vec<QSRecordType>,
}

impl RecordLog {
    fn count(&self, rec: QSRecordType) -> usize {
        self.records.iter().filter(|&&r| r == rec).count()
    }
}

impl QSpy for RecordLog {
    fn begin(&mut self, rec: QSRecordType, _obj: usize) -> bool {
        self.records.push(rec);
        true
    }

    fn end(&mut self) {}
    fn time(&mut self) {}
    fn u8(&mut self, _value: u8) {}
    fn u16(&mut self, _value: u16) {}
    fn u32(&mut self, _value: u32) {}
    fn sig(&mut self, _sig: u16) {}
    fn obj(&mut self, _obj: usize) {}
    fn fun(&mut self, _fun: usize) {}
}
