//! Artifact kind detection
//!
//! Maps a supplied file name to the artifact kind it most likely is. The ingest
//! side uses this to build run metadata (which of README / API_SPEC / TEST were
//! actually supplied), so coverage and `MISSING_*` warnings are computed
//! against what the run really had.

use std::path::Path;

use crate::claims::ArtifactKind;

const README_EXTENSIONS: [&str; 3] = ["md", "txt", "rst"];
const SPEC_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];
const SPEC_NAME_PATTERNS: [&str; 5] = ["openapi", "swagger", "api-spec", "api_spec", "spec"];
const TEST_NAME_PATTERNS: [&str; 2] = ["test", "spec"];
const CODE_EXTENSIONS: [&str; 9] = ["py", "java", "cs", "js", "ts", "go", "rs", "cpp", "c"];

/// Detect which artifact kind a file represents
///
/// Order matters: README names win over test patterns, and a spec-named file
/// only counts as API_SPEC when it is YAML/JSON (a `user_spec.rb` is a test).
pub fn detect_artifact_kind(path: impl AsRef<Path>) -> Option<ArtifactKind> {
    let path = path.as_ref();
    let file_name = path.file_name()?.to_string_lossy().to_lowercase();
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if file_name == "readme"
        || (file_name.contains("readme") && README_EXTENSIONS.contains(&extension.as_str()))
    {
        return Some(ArtifactKind::Readme);
    }

    let is_structured = SPEC_EXTENSIONS.contains(&extension.as_str());
    if is_structured
        && (SPEC_NAME_PATTERNS.iter().any(|p| file_name.contains(p)) || file_name.contains("api"))
    {
        return Some(ArtifactKind::ApiSpec);
    }

    if TEST_NAME_PATTERNS.iter().any(|p| file_name.contains(p)) {
        return Some(ArtifactKind::Test);
    }

    let in_test_dir = path
        .parent()
        .map(|p| p.to_string_lossy().to_lowercase().contains("test"))
        .unwrap_or(false);
    if in_test_dir || CODE_EXTENSIONS.contains(&extension.as_str()) {
        return Some(ArtifactKind::Test);
    }

    None
}
