#![no_main]

use libfuzzer_sys::fuzz_target;
use cilstrip::{strip, to_bytes, Module};

fuzz_target!(|data: &[u8]| {
    if let Ok(mut module) = Module::from_mem(data.to_vec()) {
        strip(&mut module);
        let _ = to_bytes(&module);
    }
});
