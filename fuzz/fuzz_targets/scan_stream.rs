#![no_main]
use libfuzzer_sys::fuzz_target;
use ropcheck::config::GadgetConfig;
use ropcheck::disasm::iced::IcedDecoder;
use ropcheck::disasm::Architecture;

fuzz_target!(|data: &[u8]| {
    let Ok(decoder) = IcedDecoder::new(Architecture::X86_64) else {
        return;
    };
    let cfg = GadgetConfig::with_window(8);
    if let Ok(set) = ropcheck::gadgets::scan(data, &cfg, &decoder) {
        for c in &set {
            assert_eq!(data[c.end_offset], cfg.anchor_byte);
            assert!(c.window(data).is_some());
        }
    }
});
