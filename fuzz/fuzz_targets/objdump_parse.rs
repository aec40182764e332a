#![no_main]
use libfuzzer_sys::fuzz_target;
use ropcheck::binary::tools::{ObjdumpParser, ReadelfParser};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let _ = ObjdumpParser::new().parse(&text);
    let _ = ReadelfParser::new().parse(&text);
});
