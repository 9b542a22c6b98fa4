//! Formatting and writing of typed resources

use crate::imports::ImportResolver;
use crate::{GeneratorError, Result};
use hemmer_provider_migrator_common::MigrationConfig;
use quote::ToTokens;
use std::fs;
use std::path::{Path, PathBuf};
use syn::File;
use tracing::{debug, warn};

/// `<dir>/<stem><suffix>.rs` beside the source file
pub fn output_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("resource");
    source.with_file_name(format!("{stem}{suffix}.rs"))
}

/// Pretty-print a file; falls back to raw tokens when the tree does not
/// survive a round trip through the parser
pub fn render(file: &File) -> String {
    let tokens = file.to_token_stream();
    match syn::parse2::<File>(tokens.clone()) {
        Ok(parsed) => prettyplease::unparse(&parsed),
        Err(e) => {
            warn!(error = %e, "generated code does not parse, writing it unformatted");
            tokens.to_string()
        }
    }
}

/// Writes typed resources next to their sources and resolves their imports
pub struct Emitter {
    suffix: String,
    resolver: Box<dyn ImportResolver>,
}

impl Emitter {
    pub fn new(config: &MigrationConfig, resolver: Box<dyn ImportResolver>) -> Self {
        Self {
            suffix: config.output_suffix.clone(),
            resolver,
        }
    }

    /// Write `file` for the resource defined in `source`
    ///
    /// A failed write fails the resource. Import resolution problems are only
    /// logged: the file is already on disk and usually one `use` away from
    /// compiling.
    pub fn emit(&self, source: &Path, file: &File) -> Result<PathBuf> {
        let output = output_path(source, &self.suffix);
        fs::write(&output, render(file)).map_err(|e| GeneratorError::Write {
            path: output.clone(),
            source: e,
        })?;

        match self.resolver.resolve(&output) {
            Ok(changed) => debug!(output = ?output, changed, "resolved imports"),
            Err(e) => warn!(output = ?output, error = %e, "import resolution failed"),
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imports::MockImportResolver;

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("internal/redis/redis_cache_resource.rs"), "_typed"),
            PathBuf::from("internal/redis/redis_cache_resource_typed.rs")
        );
        assert_eq!(
            output_path(Path::new("widget.rs"), "_v2"),
            PathBuf::from("widget_v2.rs")
        );
    }

    #[test]
    fn test_render_formats() {
        let file: File = syn::parse_quote! {
            pub struct WidgetResource;
            fn f() -> u32 { 1 }
        };
        let rendered = render(&file);
        assert!(rendered.starts_with("pub struct WidgetResource;\n"));
        assert!(rendered.contains("fn f() -> u32 {\n    1\n}\n"));
    }

    #[test]
    fn test_emit_writes_and_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("widget_resource.rs");
        let expected = dir.path().join("widget_resource_typed.rs");

        let mut resolver = MockImportResolver::new();
        let resolved = expected.clone();
        resolver
            .expect_resolve()
            .withf(move |path| path.to_path_buf() == resolved)
            .times(1)
            .returning(|_| Err(GeneratorError::ImportResolution("no toolchain".to_string())));

        let emitter = Emitter::new(&MigrationConfig::default(), Box::new(resolver));
        let file: File = syn::parse_quote!(pub struct WidgetResource;);
        let output = emitter.emit(&source, &file).unwrap();

        assert_eq!(output, expected);
        assert_eq!(fs::read_to_string(&output).unwrap(), "pub struct WidgetResource;\n");
    }

    #[test]
    fn test_emit_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing").join("widget.rs");

        let mut resolver = MockImportResolver::new();
        resolver.expect_resolve().never();

        let emitter = Emitter::new(&MigrationConfig::default(), Box::new(resolver));
        let file: File = syn::parse_quote!(pub struct WidgetResource;);
        assert!(matches!(
            emitter.emit(&source, &file),
            Err(GeneratorError::Write { .. })
        ));
    }
}
