//! Post-write import resolution for emitted files

use crate::{GeneratorError, Result};
use proc_macro2::{Spacing, TokenStream, TokenTree};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use syn::punctuated::Punctuated;
use syn::visit::{self, Visit};
use syn::{Item, ItemUse, Token, UseTree};
use tracing::{debug, warn};

/// Fixes up the `use` items of a written file
#[cfg_attr(test, mockall::automock)]
pub trait ImportResolver {
    /// Resolve imports of the file at `path`, returning how many items changed
    fn resolve(&self, path: &Path) -> Result<usize>;
}

/// Resolves imports from a fixed root → path table
///
/// Roots referenced but not imported get a `use` item; simple imports of a
/// known root that nothing references any more are removed.
#[derive(Debug, Clone, Default)]
pub struct KnownImports {
    imports: BTreeMap<String, syn::Path>,
}

impl KnownImports {
    pub fn new(table: &BTreeMap<String, String>) -> Self {
        let imports = table
            .iter()
            .filter_map(|(root, path)| match syn::parse_str::<syn::Path>(path) {
                Ok(parsed) => Some((root.clone(), parsed)),
                Err(e) => {
                    warn!(%root, %path, error = %e, "ignoring known import with an invalid path");
                    None
                }
            })
            .collect();
        Self { imports }
    }

    /// Add missing and drop unused known imports; returns the number of changes
    pub fn fix_file(&self, file: &mut syn::File) -> usize {
        let mut references = References::default();
        references.visit_file(file);

        let mut bound = BTreeSet::new();
        let mut local = BTreeSet::new();
        for item in &file.items {
            match item {
                Item::Use(item) => use_bindings(&item.tree, None, &mut bound),
                other => {
                    if let Some(name) = item_name(other) {
                        local.insert(name);
                    }
                }
            }
        }

        let before = file.items.len();
        file.items.retain(|item| match item {
            Item::Use(item) => match simple_leaf(&item.tree) {
                Some(leaf) => {
                    !self.imports.contains_key(&leaf) || references.roots.contains(&leaf)
                }
                None => true,
            },
            _ => true,
        });
        let removed = before - file.items.len();

        let missing: Vec<Item> = self
            .imports
            .iter()
            .filter(|(root, _)| {
                references.roots.contains(*root) && !bound.contains(*root) && !local.contains(*root)
            })
            .map(|(_, path)| Item::Use(syn::parse_quote!(use #path;)))
            .collect();
        let added = missing.len();
        let at = file
            .items
            .iter()
            .rposition(|item| matches!(item, Item::Use(_)))
            .map_or(0, |i| i + 1);
        file.items.splice(at..at, missing);

        if added + removed > 0 {
            debug!(added, removed, "resolved imports");
        }
        added + removed
    }
}

impl ImportResolver for KnownImports {
    fn resolve(&self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .map_err(|e| GeneratorError::ImportResolution(format!("{:?}: {}", path, e)))?;
        let mut file = syn::parse_file(&content)
            .map_err(|e| GeneratorError::ImportResolution(format!("{:?}: {}", path, e)))?;

        let changed = self.fix_file(&mut file);
        if changed > 0 {
            fs::write(path, prettyplease::unparse(&file))
                .map_err(|e| GeneratorError::ImportResolution(format!("{:?}: {}", path, e)))?;
        }
        Ok(changed)
    }
}

/// First segments of every path used outside `use` items
#[derive(Default)]
struct References {
    roots: BTreeSet<String>,
}

impl References {
    fn record(&mut self, path: &syn::Path) {
        if path.leading_colon.is_none() {
            if let Some(first) = path.segments.first() {
                self.roots.insert(first.ident.to_string());
            }
        }
    }

    fn scan_tokens(&mut self, tokens: TokenStream) {
        let trees: Vec<TokenTree> = tokens.into_iter().collect();
        for (i, tree) in trees.iter().enumerate() {
            match tree {
                TokenTree::Ident(ident) => {
                    let is_colon = |tree: Option<&TokenTree>| {
                        matches!(tree, Some(TokenTree::Punct(p)) if p.as_char() == ':')
                    };
                    let starts_path = matches!(
                        trees.get(i + 1),
                        Some(TokenTree::Punct(p)) if p.as_char() == ':' && p.spacing() == Spacing::Joint
                    );
                    let inside_path = i > 0 && is_colon(trees.get(i - 1));
                    if starts_path && !inside_path {
                        self.roots.insert(ident.to_string());
                    }
                }
                TokenTree::Group(group) => self.scan_tokens(group.stream()),
                _ => {}
            }
        }
    }
}

impl<'ast> Visit<'ast> for References {
    fn visit_item_use(&mut self, _: &'ast ItemUse) {}

    fn visit_path(&mut self, path: &'ast syn::Path) {
        self.record(path);
        visit::visit_path(self, path);
    }

    fn visit_attribute(&mut self, attr: &'ast syn::Attribute) {
        if attr.path().is_ident("derive") {
            let derived =
                attr.parse_args_with(Punctuated::<syn::Path, Token![,]>::parse_terminated);
            if let Ok(paths) = derived {
                paths.iter().for_each(|path| self.record(path));
            }
        }
        visit::visit_attribute(self, attr);
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        self.scan_tokens(mac.tokens.clone());
        visit::visit_macro(self, mac);
    }
}

/// Names a `use` tree brings into scope; `a::{self, B}` binds `a` and `B`
fn use_bindings(tree: &UseTree, parent: Option<&syn::Ident>, out: &mut BTreeSet<String>) {
    match tree {
        UseTree::Path(path) => use_bindings(&path.tree, Some(&path.ident), out),
        UseTree::Name(name) if name.ident == "self" => {
            if let Some(parent) = parent {
                out.insert(parent.to_string());
            }
        }
        UseTree::Name(name) => {
            out.insert(name.ident.to_string());
        }
        UseTree::Rename(rename) => {
            out.insert(rename.rename.to_string());
        }
        UseTree::Group(group) => group.items.iter().for_each(|t| use_bindings(t, parent, out)),
        UseTree::Glob(_) => {}
    }
}

/// Leaf of a plain `use a::b::c;` import
fn simple_leaf(tree: &UseTree) -> Option<String> {
    match tree {
        UseTree::Path(path) => simple_leaf(&path.tree),
        UseTree::Name(name) => Some(name.ident.to_string()),
        _ => None,
    }
}

fn item_name(item: &Item) -> Option<String> {
    let ident = match item {
        Item::Const(i) => &i.ident,
        Item::Enum(i) => &i.ident,
        Item::Fn(i) => &i.sig.ident,
        Item::Mod(i) => &i.ident,
        Item::Static(i) => &i.ident,
        Item::Struct(i) => &i.ident,
        Item::Trait(i) => &i.ident,
        Item::Type(i) => &i.ident,
        Item::Union(i) => &i.ident,
        Item::Macro(i) => i.ident.as_ref()?,
        _ => return None,
    };
    Some(ident.to_string())
}
