// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::fs;
use std::path::{Path, PathBuf};

const HEADER: &str = "// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/\n\
                      // SPDX-License-Identifier: Apache-2.0\n";

fn rust_sources(dir: &Path, found: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("failed to read source dir") {
        let path = entry.expect("failed to read dir entry").path();
        if path.is_dir() {
            rust_sources(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn every_source_file_carries_license_header() {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut sources = Vec::new();
    for dir in [
        manifest_dir.join("src"),
        manifest_dir.join("tests"),
        manifest_dir.join("../cloudwatch-logger-pipe/src"),
    ] {
        rust_sources(&dir, &mut sources);
    }
    assert!(sources.len() > 10, "found only {sources:?}");

    let missing: Vec<&PathBuf> = sources
        .iter()
        .filter(|path| {
            !fs::read_to_string(path)
                .expect("failed to read source file")
                .starts_with(HEADER)
        })
        .collect();
    assert!(missing.is_empty(), "missing license header: {missing:?}");
}
