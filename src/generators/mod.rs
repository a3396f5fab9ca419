//! Output generators built on the tree visitor engine.
//!
//! A generator consumes a parsed CST and produces one or more artifacts.
//! Each artifact is either structured data for programmatic consumers or
//! rendered text destined for a file.

pub mod json;
pub mod lower;
pub mod ts_enum;
pub mod visit;

pub use lower::{lower, Lowering};

use crate::diagnostics::TidlError;
use crate::grammar::cst::CstNode;
use crate::timing::TimingInfo;

/// One artifact produced by a generator run.
#[derive(Debug, Clone)]
pub enum GeneratorOutput {
    /// Structured value, for consumers that post-process the result.
    Object(serde_json::Value),
    /// Rendered text with the file extension it should be written under.
    Text {
        contents: String,
        extension: &'static str,
    },
}

impl GeneratorOutput {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            GeneratorOutput::Text { contents, .. } => Some(contents),
            GeneratorOutput::Object(_) => None,
        }
    }
}

/// Everything a generator run reports back: artifacts, non-fatal problems,
/// and per-stage timings.
#[derive(Debug, Clone, Default)]
pub struct GeneratorResult {
    pub outputs: Vec<GeneratorOutput>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub performance: Vec<TimingInfo>,
}

/// A named transformation from CST to artifacts.
pub trait Generator {
    fn name(&self) -> &'static str;

    fn process(&self, cst: &CstNode) -> Result<GeneratorResult, TidlError>;
}

/// Resolves a generator by its CLI name.
pub fn generator_for(name: &str) -> Result<Box<dyn Generator>, TidlError> {
    match name {
        "json" => Ok(Box::new(json::JsonGenerator)),
        "ts-enum" => Ok(Box::new(ts_enum::TsEnumGenerator)),
        other => Err(TidlError::UnknownGenerator(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_resolves_known_generators() {
        assert_eq!(generator_for("json").unwrap().name(), "json");
        assert_eq!(generator_for("ts-enum").unwrap().name(), "ts-enum");
    }

    #[test]
    fn factory_rejects_unknown_names() {
        let error = generator_for("protobuf").err();
        assert!(matches!(error, Some(TidlError::UnknownGenerator(name)) if name == "protobuf"));
    }
}
