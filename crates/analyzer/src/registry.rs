//! Pre-scanned registry of untyped resource definitions

use crate::{AnalyzerError, Result};
use hemmer_provider_migrator_common::MigrationConfig;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use syn::visit::Visit;
use syn::{Expr, ExprStruct, ExprTuple, Item, ItemFn, Lit, Member, ReturnType, Stmt, Type};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A resource definition found in the source tree
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Resource type name (e.g., "azurerm_redis_cache")
    pub name: String,
    /// Function returning the untyped resource definition
    pub function: String,
    /// File the definition lives in
    pub path: PathBuf,
    /// Parsed contents of that file
    pub file: syn::File,
}

/// Resource type name → definition
#[derive(Debug, Default)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Walk `root` and register every resource definition under it
    ///
    /// Files that cannot be read or parsed are logged and skipped.
    pub fn scan(root: &Path, config: &MigrationConfig) -> Result<Self> {
        fs::read_dir(root)?;

        let mut sources = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        {
            let path = entry.path();
            // Skip our own output from earlier runs
            let is_output = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.ends_with(&config.output_suffix));
            if is_output {
                continue;
            }
            match fs::read_to_string(path) {
                Ok(content) => sources.push((path.to_path_buf(), content)),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable source file, skipping"),
            }
        }
        Ok(Self::from_sources(sources, config))
    }

    /// Build a registry from already-read sources; unparseable files are skipped
    pub fn from_sources(
        sources: impl IntoIterator<Item = (PathBuf, String)>,
        config: &MigrationConfig,
    ) -> Self {
        let mut files = Vec::new();
        for (path, content) in sources {
            match syn::parse_file(&content) {
                Ok(file) => files.push((path, file)),
                Err(e) => {
                    let err = AnalyzerError::SynParse {
                        path: path.clone(),
                        message: e.to_string(),
                    };
                    warn!("{err}, skipping");
                }
            }
        }

        // Registration tuples may live in any file
        let mut registrations = RegistrationCollector::default();
        for (_, file) in &files {
            registrations.visit_file(file);
        }
        // Keyed by the bare function name so `widget::resource_widget` matches
        let mut names_by_function: HashMap<String, Vec<String>> = HashMap::new();
        for (name, function) in registrations.found {
            names_by_function.entry(function).or_default().push(name);
        }

        let mut registry = Self::default();
        for (path, file) in &files {
            for item in &file.items {
                let Item::Fn(func) = item else {
                    continue;
                };
                if resource_literal(func, &config.resource_type_name).is_none() {
                    continue;
                }
                let function = func.sig.ident.to_string();
                let names = names_by_function.get(&function).cloned().unwrap_or_else(|| {
                    let stem = function.strip_prefix("resource_").unwrap_or(&function);
                    vec![format!("{}{stem}", config.name_prefix)]
                });
                for name in names {
                    debug!(%name, %function, path = %path.display(), "registered resource");
                    registry.entries.insert(
                        name.clone(),
                        RegistryEntry {
                            name,
                            function: function.clone(),
                            path: path.clone(),
                            file: file.clone(),
                        },
                    );
                }
            }
        }
        registry
    }

    /// Look `name` up verbatim, then with the fixed prefix prepended
    pub fn resolve(&self, name: &str, prefix: &str) -> Option<&RegistryEntry> {
        self.entries
            .get(name)
            .or_else(|| self.entries.get(&format!("{prefix}{name}")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The `Resource { .. }` literal a definition function evaluates to
///
/// A definition returns the resource type and ends in a literal carrying
/// both a `schema` and a `read` field; nested block resources have no `read`.
pub fn resource_literal<'a>(func: &'a ItemFn, type_name: &str) -> Option<&'a ExprStruct> {
    let ReturnType::Type(_, ty) = &func.sig.output else {
        return None;
    };
    let Type::Path(ty) = ty.as_ref() else {
        return None;
    };
    if !ty.path.segments.last().is_some_and(|s| s.ident == type_name) {
        return None;
    }

    let tail = match func.block.stmts.last()? {
        Stmt::Expr(Expr::Return(ret), _) => ret.expr.as_deref()?,
        Stmt::Expr(expr, None) => expr,
        _ => return None,
    };
    let Expr::Struct(literal) = tail else {
        return None;
    };
    let has = |field: &str| {
        literal
            .fields
            .iter()
            .any(|f| matches!(&f.member, Member::Named(n) if n == field))
    };
    (literal.path.segments.last().is_some_and(|s| s.ident == type_name)
        && has("schema")
        && has("read"))
    .then_some(literal)
}

/// Collects `("type_name", resource_fn)` tuples
#[derive(Default)]
struct RegistrationCollector {
    found: Vec<(String, String)>,
}

impl<'ast> Visit<'ast> for RegistrationCollector {
    fn visit_expr_tuple(&mut self, tuple: &'ast ExprTuple) {
        if tuple.elems.len() == 2 {
            if let (Expr::Lit(lit), Expr::Path(func)) = (&tuple.elems[0], &tuple.elems[1]) {
                if let (Lit::Str(name), Some(last)) = (&lit.lit, func.path.segments.last()) {
                    self.found.push((name.value(), last.ident.to_string()));
                }
            }
        }
        syn::visit::visit_expr_tuple(self, tuple);
    }
}
