//! Ordered rewrite stages over function bodies
//!
//! Stage 1 normalizes the untyped accessor idioms (state reads and writes,
//! client downcasts, timeouts, identifier handling). Stage 2 relies on those
//! normal forms to promote helpers to methods and map literals to models.
//!
//! Each stage is a list of rewriters run together in one pre-order walk of
//! a function body. At every node the first rewriter that applies wins, and
//! the walk then descends into the rewritten node.

mod accessor;
mod composite;
mod control_flow;
mod import_guard;
mod inline;
mod meta;
mod rename;
pub(crate) mod syntax;

pub use accessor::{AccessorGet, AccessorSet};
pub use composite::CompositeLiteral;
pub use control_flow::ControlFlow;
pub use import_guard::ImportGuard;
pub use inline::InlineFunction;
pub use meta::MetaAccess;
pub use rename::FunctionRename;

use hemmer_provider_migrator_analyzer::{Function, FunctionRole, MetaInfo, ModelSet};
use hemmer_provider_migrator_common::MigrationConfig;
use quote::ToTokens;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use syn::punctuated::Punctuated;
use syn::visit_mut::{self, VisitMut};
use syn::{Block, Expr, FnArg, ItemFn, Macro, ReturnType, Stmt, Token, Type};
use tracing::{debug, info, warn};

/// A node handed to the rewriters
pub enum SyntaxNode<'a> {
    Block(&'a mut Block),
    Stmt(&'a mut Stmt),
    Expr(&'a mut Expr),
}

/// A node-level rewrite
pub trait Rewriter {
    fn name(&self) -> &'static str;

    /// Rewrite `node` in place; `false` leaves it untouched
    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool;
}

/// Rewriters that run together in one traversal
pub struct Stage {
    name: &'static str,
    rewriters: Vec<Box<dyn Rewriter>>,
}

impl Stage {
    pub fn new(name: &'static str, rewriters: Vec<Box<dyn Rewriter>>) -> Self {
        Self { name, rewriters }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn rewriter_names(&self) -> Vec<&'static str> {
        self.rewriters.iter().map(|r| r.name()).collect()
    }

    /// Run this stage over a whole function body
    pub fn run(&self, block: &mut Block, cx: &mut RewriteContext<'_>) {
        StageWalker { stage: self, cx }.visit_block_mut(block);
    }
}

/// The ordered stages of a migration
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    /// Accessor normalization followed by structural promotion
    pub fn standard(config: &MigrationConfig) -> Self {
        Self::new(vec![
            Stage::new(
                "normalize",
                vec![
                    Box::new(MetaAccess),
                    Box::new(AccessorGet),
                    Box::new(AccessorSet),
                    Box::new(ImportGuard),
                    Box::new(ControlFlow),
                    Box::new(FunctionRename::new(&config.function_renames)),
                ],
            ),
            Stage::new(
                "promote",
                vec![Box::new(InlineFunction), Box::new(CompositeLiteral)],
            ),
        ])
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Rewrite every function of a resource
    ///
    /// CRUD functions go first so that helper signatures are settled by the
    /// time the helpers themselves are rewritten.
    pub fn run(&self, meta: &mut MetaInfo, config: &MigrationConfig) -> PipelineState {
        let MetaInfo {
            models,
            functions,
            read,
            ..
        } = &mut *meta;
        let mut state = PipelineState::default();

        let mut order: Vec<usize> = (0..functions.len()).collect();
        order.sort_by_key(|&i| role_rank(functions[i].role));

        for index in order {
            let helpers = helper_signatures(functions);
            let function = &mut functions[index];
            let scope = FunctionScope::of(function);
            let mut cx = RewriteContext {
                config,
                models: &*models,
                helpers: &helpers,
                read_fn: read.as_str(),
                function: &scope,
                state: &mut state,
            };
            self.run_function(&mut function.item, &mut cx);
            state.apply_pending(functions);
        }

        info!(
            resource = %meta.resource_type,
            promoted = state.promoted.len(),
            unresolved = state.unresolved.len(),
            "rewrote resource functions"
        );
        state
    }

    /// Run every stage, in order, over one function body
    pub fn run_function(&self, item: &mut ItemFn, cx: &mut RewriteContext<'_>) {
        for stage in &self.stages {
            debug!(function = %cx.function.name, stage = stage.name(), "running stage");
            stage.run(&mut item.block, cx);
        }
    }
}

fn role_rank(role: FunctionRole) -> u8 {
    match role {
        FunctionRole::Create => 0,
        FunctionRole::Read => 1,
        FunctionRole::Update => 2,
        FunctionRole::Delete => 3,
        FunctionRole::Helper => 4,
    }
}

/// Current signatures of every helper, as seen by call sites
fn helper_signatures(functions: &[Function]) -> BTreeMap<String, HelperSignature> {
    functions
        .iter()
        .filter(|f| !f.role.is_crud())
        .map(|f| (f.name.clone(), HelperSignature::of(&f.item)))
        .collect()
}

/// Parameter and return types of a helper function
#[derive(Debug, Clone)]
pub struct HelperSignature {
    pub params: Vec<Type>,
    pub output: Option<Type>,
}

impl HelperSignature {
    pub fn of(item: &ItemFn) -> Self {
        let params = item
            .sig
            .inputs
            .iter()
            .filter_map(|arg| match arg {
                FnArg::Typed(typed) => Some((*typed.ty).clone()),
                FnArg::Receiver(_) => None,
            })
            .collect();
        let output = match &item.sig.output {
            ReturnType::Type(_, ty) => Some((**ty).clone()),
            ReturnType::Default => None,
        };
        Self { params, output }
    }
}

/// The function currently being rewritten
#[derive(Debug, Clone)]
pub struct FunctionScope {
    pub name: String,
    pub role: FunctionRole,
    pub var_model: String,
    pub accessor: Option<String>,
}

impl FunctionScope {
    pub fn of(function: &Function) -> Self {
        Self {
            name: function.name.clone(),
            role: function.role,
            var_model: function.var_model.clone(),
            accessor: function.accessor.clone(),
        }
    }
}

/// Everything a rewriter may consult or record
pub struct RewriteContext<'a> {
    pub config: &'a MigrationConfig,
    pub models: &'a ModelSet,
    pub helpers: &'a BTreeMap<String, HelperSignature>,
    /// Name of the resource's Read function
    pub read_fn: &'a str,
    pub function: &'a FunctionScope,
    pub state: &'a mut PipelineState,
}

impl RewriteContext<'_> {
    /// Whether `expr` is the accessor parameter of the current function
    pub fn is_accessor(&self, expr: &Expr) -> bool {
        self.function
            .accessor
            .as_deref()
            .is_some_and(|accessor| syntax::is_ident(syntax::strip_reference(expr), accessor))
    }

    /// Record a lookup that could not be resolved; the node stays as it was
    pub fn unresolved(&mut self, message: String) {
        warn!(function = %self.function.name, "{message}, leaving node unrewritten");
        self.state
            .unresolved
            .push(format!("{}: {message}", self.function.name));
    }
}

/// Parameter and return type changes for one helper
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignatureEdit {
    /// Parameter index (receivers excluded) → new type
    pub params: BTreeMap<usize, Type>,
    pub output: Option<Type>,
}

impl SignatureEdit {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.output.is_none()
    }

    pub fn apply(&self, item: &mut ItemFn) {
        let typed = item.sig.inputs.iter_mut().filter_map(|arg| match arg {
            FnArg::Typed(typed) => Some(typed),
            FnArg::Receiver(_) => None,
        });
        for (index, param) in typed.enumerate() {
            if let Some(ty) = self.params.get(&index) {
                param.ty = Box::new(ty.clone());
            }
        }
        if let Some(output) = &self.output {
            item.sig.output = ReturnType::Type(Default::default(), Box::new(output.clone()));
        }
    }
}

/// Per-resource bookkeeping shared by all functions of one run
#[derive(Debug, Default)]
pub struct PipelineState {
    transformed: HashSet<String>,
    pending: BTreeMap<String, SignatureEdit>,
    promoted: BTreeSet<String>,
    unresolved: Vec<String>,
}

impl PipelineState {
    /// Whether a helper's signature has already been rewritten
    pub fn is_transformed(&self, helper: &str) -> bool {
        self.transformed.contains(helper)
    }

    /// Helpers now called as methods on the receiver
    pub fn promoted(&self) -> &BTreeSet<String> {
        &self.promoted
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn into_unresolved(self) -> Vec<String> {
        self.unresolved
    }

    pub(crate) fn promote(&mut self, helper: &str) {
        self.promoted.insert(helper.to_string());
    }

    /// Queue a signature edit; only the first non-empty edit per helper counts
    pub(crate) fn record_signature_edit(&mut self, helper: &str, edit: SignatureEdit) -> bool {
        if edit.is_empty() || self.transformed.contains(helper) {
            return false;
        }
        self.transformed.insert(helper.to_string());
        self.pending.insert(helper.to_string(), edit);
        true
    }

    fn apply_pending(&mut self, functions: &mut [Function]) {
        for (name, edit) in std::mem::take(&mut self.pending) {
            match functions.iter_mut().find(|f| f.name == name) {
                Some(function) => {
                    edit.apply(&mut function.item);
                    debug!(helper = %name, signature = %function.item.sig.to_token_stream(), "rewrote helper signature");
                }
                None => warn!(helper = %name, "signature edit for unknown helper dropped"),
            }
        }
    }
}

struct StageWalker<'s, 'c, 'a> {
    stage: &'s Stage,
    cx: &'c mut RewriteContext<'a>,
}

impl StageWalker<'_, '_, '_> {
    fn first_match(&mut self, mut apply: impl FnMut(&dyn Rewriter, &mut RewriteContext<'_>) -> bool) {
        let stage = self.stage;
        for rewriter in &stage.rewriters {
            if apply(rewriter.as_ref(), &mut *self.cx) {
                debug!(
                    function = %self.cx.function.name,
                    stage = stage.name,
                    rewriter = rewriter.name(),
                    "applied rewrite"
                );
                break;
            }
        }
    }
}

impl VisitMut for StageWalker<'_, '_, '_> {
    fn visit_block_mut(&mut self, block: &mut Block) {
        self.first_match(|rewriter, cx| rewriter.try_apply(SyntaxNode::Block(&mut *block), cx));
        visit_mut::visit_block_mut(self, block);
    }

    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        self.first_match(|rewriter, cx| rewriter.try_apply(SyntaxNode::Stmt(&mut *stmt), cx));
        visit_mut::visit_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        self.first_match(|rewriter, cx| rewriter.try_apply(SyntaxNode::Expr(&mut *expr), cx));
        visit_mut::visit_expr_mut(self, expr);
    }

    // `vec![..]` bodies are plain expressions; everything else stays opaque
    fn visit_macro_mut(&mut self, mac: &mut Macro) {
        if !mac.path.is_ident("vec") {
            return;
        }
        let Ok(mut elems) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        else {
            return;
        };
        for elem in elems.iter_mut() {
            self.visit_expr_mut(elem);
        }
        mac.tokens = elems.to_token_stream();
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use hemmer_provider_migrator_analyzer::naming::render_type;
    use syn::parse_quote;

    #[test]
    fn test_standard_pipeline_order() {
        let pipeline = Pipeline::standard(&MigrationConfig::default());
        let names: Vec<_> = pipeline.stages().iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["normalize", "promote"]);
        assert_eq!(
            pipeline.stages()[0].rewriter_names(),
            vec!["meta", "accessor_get", "accessor_set", "import_guard", "control_flow", "function_rename"]
        );
        assert_eq!(
            pipeline.stages()[1].rewriter_names(),
            vec!["inline_function", "composite_literal"]
        );
    }

    #[test]
    fn test_signature_edit_recorded_once() {
        let mut state = PipelineState::default();
        let edit = SignatureEdit {
            params: BTreeMap::from([(0, parse_quote!(Vec<SkuModel>))]),
            output: None,
        };
        assert!(!state.record_signature_edit("flatten_sku", SignatureEdit::default()));
        assert!(!state.is_transformed("flatten_sku"));
        assert!(state.record_signature_edit("flatten_sku", edit.clone()));
        assert!(!state.record_signature_edit("flatten_sku", edit));
        assert!(state.is_transformed("flatten_sku"));
    }

    #[test]
    fn test_signature_edit_apply() {
        let mut item: ItemFn = parse_quote! {
            fn expand_sku(d: &ResourceData, extra: bool) -> Vec<Sku> { todo!() }
        };
        let edit = SignatureEdit {
            params: BTreeMap::from([(0, parse_quote!(&mut WidgetModel))]),
            output: Some(parse_quote!(Vec<SkuModel>)),
        };
        edit.apply(&mut item);
        let signature = HelperSignature::of(&item);
        assert_eq!(render_type(&signature.params[0]), "&mut WidgetModel");
        assert_eq!(render_type(&signature.params[1]), "bool");
        assert_eq!(render_type(signature.output.as_ref().unwrap()), "Vec<SkuModel>");
    }

    #[test]
    fn test_vec_macro_bodies_are_walked() {
        let config = MigrationConfig::default();
        let mut block: Block = parse_quote!({
            let names = vec![d.get("name"), d.get("location")];
        });
        let mut state = PipelineState::default();
        rewrite_block(
            AccessorGet,
            &mut block,
            &config,
            &scope("resource_widget_create", FunctionRole::Create),
            &BTreeMap::new(),
            &mut state,
        );
        let expected: Block = parse_quote!({
            let names = vec![model.name, model.location];
        });
        assert_eq!(render(&block), render(&expected));
    }
}
