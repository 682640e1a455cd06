#![no_main]

use apicompat::config::FileConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(config) = toml::from_str::<FileConfig>(data) {
        let _ = config.validate();
    }
});
