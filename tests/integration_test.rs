#[path = "integration/common/mod.rs"]
mod common;

#[path = "integration/compile.rs"]
mod compile;

#[path = "integration/merge.rs"]
mod merge;

#[path = "integration/compress.rs"]
mod compress;

#[path = "integration/error_cases.rs"]
mod error_cases;
