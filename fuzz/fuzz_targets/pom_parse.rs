#![no_main]

use std::path::Path;

use apicompat::project::ProjectInfo;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(project) = ProjectInfo::from_pom_str(data, Path::new("/work")) {
        let _ = project.artifact_file();
        let _ = project.coordinate_string();
    }
});
