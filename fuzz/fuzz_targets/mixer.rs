#![no_main]

use libfuzzer_sys::fuzz_target;
use lstm_mixer::LstmMixer;

// Every byte becomes one step: the low bit is the target, and the byte
// (scaled) is the input. Occasional out-of-range targets and resets must be
// handled without panics, and the prediction must stay inside (0, 1).
fuzz_target!(|data: &[u8]| {
    let mut mixer = LstmMixer::new(2, 4, 0.1).unwrap();
    for (i, &byte) in data.iter().enumerate() {
        let x = (byte as f32 - 128.) * 100.;
        let p = mixer.predict(&[x, i as f32]).unwrap();
        assert!(p > 0. && p < 1.);
        match byte {
            0xff => mixer.reset(),
            0xfe => assert!(mixer.learn(2).is_err()),
            _ => mixer.learn(byte & 1).unwrap(),
        }
    }
});
