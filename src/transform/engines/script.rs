//! Script parse and re-print via oxc.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::core::{Asset, AssetKind};
use crate::transform::{OptionError, Options, StepContext, StepError, StepOutput, Transform};

pub struct Script;

/// Source type from the identifier; unknown extensions parse as modules.
pub(super) fn source_type(id: &str) -> SourceType {
    SourceType::from_path(Path::new(id)).unwrap_or_else(|_| SourceType::mjs())
}

/// Parse `source` and print it back, minified or not.
pub fn compile_js(source: &str, source_type: SourceType, minify: bool) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(error.to_string());
    }
    let mut program = ret.program;

    if !minify {
        return Ok(Codegen::new().build(&program).code);
    }

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

impl Transform for Script {
    fn validate(&self, options: &Options) -> Result<(), OptionError> {
        options.check_known(&["minify"])?;
        options.bool("minify").map(drop)
    }

    fn apply(
        &self,
        asset: &mut Asset,
        options: &Options,
        _cx: &StepContext,
    ) -> Result<StepOutput, StepError> {
        let minify = options.bool("minify")?.unwrap_or(false);
        let code = compile_js(asset.text()?, source_type(&asset.id), minify)
            .map_err(StepError::Rejected)?;
        asset.content = code.into_bytes();
        asset.kind = AssetKind::Script;
        Ok(StepOutput::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_reprints() {
        let mut asset = Asset::new("index.js", "const   a =  1;\nexport default a");
        Script
            .apply(&mut asset, &Options::default(), &StepContext::default())
            .unwrap();
        let code = asset.text().unwrap();
        assert!(code.contains("const a = 1;"));
        assert!(code.contains("export default a"));
    }

    #[test]
    fn test_script_minify_shrinks() {
        let source = "function add(first, second) {\n  return first + second;\n}\nconsole.log(add(1, 2));\n";
        let mut options = Options::default();
        options.set("minify", true);
        let mut asset = Asset::new("index.js", source);
        Script.apply(&mut asset, &options, &StepContext::default()).unwrap();
        assert!(asset.size() < source.len() as u64);
    }

    #[test]
    fn test_script_syntax_error() {
        let mut asset = Asset::new("index.js", "let = ;");
        let err = Script
            .apply(&mut asset, &Options::default(), &StepContext::default())
            .unwrap_err();
        assert!(matches!(err, StepError::Rejected(_)));
    }

    #[test]
    fn test_source_type_fallback() {
        assert!(source_type("a.ts").is_typescript());
        assert!(source_type("a.weird").is_module());
    }
}
