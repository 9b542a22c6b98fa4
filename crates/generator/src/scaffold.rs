//! Typed resource declaration assembled from rewritten functions

use crate::pipeline::syntax::is_ok_unit;
use crate::pipeline::PipelineState;
use crate::{GeneratorError, Result};
use hemmer_provider_migrator_analyzer::naming::{make_ident, parse_type};
use hemmer_provider_migrator_analyzer::{Function, FunctionRole, MetaInfo, Model, SchemaField};
use hemmer_provider_migrator_common::MigrationConfig;
use proc_macro2::{Literal, TokenStream};
use quote::{quote, ToTokens};
use syn::{Expr, File, ImplItemFn, Item, ItemFn, Stmt};
use tracing::debug;

/// Build the typed rendition of a resource
///
/// The output keeps the source's imports and passthrough items, adds the
/// model structs and the receiver, and re-homes every rewritten function:
/// CRUD bodies move into `sdk::ResourceFunc` closures, promoted helpers
/// become receiver methods, and the remaining helpers stay free functions.
pub fn build_typed_file(
    meta: &MetaInfo,
    state: &PipelineState,
    config: &MigrationConfig,
) -> Result<File> {
    if meta.top_model().is_none() {
        return Err(GeneratorError::Scaffold(format!(
            "{} has no top model {}",
            meta.resource_type, meta.model_name
        )));
    }
    let sdk = syn::parse_str::<syn::Path>(&config.sdk_path)
        .map_err(|e| GeneratorError::Scaffold(format!("invalid sdk_path {:?}: {}", config.sdk_path, e)))?;
    let receiver = make_ident(&meta.receiver);

    let mut items: Vec<Item> = meta.imports.iter().cloned().map(Item::Use).collect();
    for model in meta.models.models().iter().filter(|m| !m.declared) {
        items.push(model_struct(model)?);
    }
    items.extend(meta.passthrough.iter().cloned());
    items.push(parse_item(quote! {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct #receiver;
    })?);

    items.push(resource_impl(meta, config, &sdk)?);
    if let Some(update) = &meta.update {
        let method = crud_method(crud_function(meta, update)?, meta, config, &sdk)?;
        items.push(parse_item(quote! {
            impl #sdk::ResourceWithUpdate for #receiver {
                #method
            }
        })?);
    }
    if meta.schema_version > 0 {
        let version = Literal::u32_unsuffixed(meta.schema_version);
        let upgraders = meta
            .state_upgraders
            .as_ref()
            .map(ToTokens::to_token_stream)
            .unwrap_or_else(|| quote!(Default::default()));
        items.push(parse_item(quote! {
            impl #sdk::ResourceWithStateMigration for #receiver {
                fn state_upgraders(&self) -> #sdk::StateUpgradeData {
                    #sdk::StateUpgradeData {
                        schema_version: #version,
                        upgraders: #upgraders,
                    }
                }
            }
        })?);
    }

    let helpers: Vec<&Function> = meta
        .functions
        .iter()
        .filter(|f| f.role == FunctionRole::Helper)
        .collect();
    let methods: Vec<ImplItemFn> = helpers
        .iter()
        .filter(|f| state.promoted().contains(&f.name))
        .map(|f| helper_method(&f.item))
        .collect();
    if !methods.is_empty() {
        items.push(parse_item(quote! {
            impl #receiver {
                #(#methods)*
            }
        })?);
    }
    items.extend(
        helpers
            .iter()
            .filter(|f| !state.promoted().contains(&f.name))
            .map(|f| Item::Fn(f.item.clone())),
    );

    debug!(resource = %meta.resource_type, items = items.len(), "assembled typed resource");
    Ok(File {
        shebang: None,
        attrs: Vec::new(),
        items,
    })
}

fn model_struct(model: &Model) -> Result<Item> {
    let name = make_ident(&model.name);
    let mut fields = Vec::with_capacity(model.fields.len());
    for field in &model.fields {
        let ident = make_ident(&field.name);
        let ty = parse_type(&field.ty).ok_or_else(|| {
            GeneratorError::Scaffold(format!("{}.{} has invalid type {:?}", model.name, field.name, field.ty))
        })?;
        let tag = &field.tag;
        fields.push(quote! {
            #[tfschema(#tag)]
            pub #ident: #ty
        });
    }
    parse_item(quote! {
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct #name {
            #(#fields),*
        }
    })
}

fn resource_impl(meta: &MetaInfo, config: &MigrationConfig, sdk: &syn::Path) -> Result<Item> {
    let receiver = make_ident(&meta.receiver);
    let model = make_ident(&meta.model_name);
    let resource_type = &meta.resource_type;
    let arguments = schema_map(&meta.arguments, meta.schema_ctor.as_ref());
    let attributes = schema_map(&meta.attributes, meta.schema_ctor.as_ref());
    let id_validation = meta.id_validator.as_ref().map(|validator| {
        quote! {
            fn id_validation_func(&self) -> #sdk::IdValidationFunc {
                #validator
            }
        }
    });

    let mut crud = Vec::new();
    for name in [&meta.create, &meta.read, &meta.delete] {
        crud.push(crud_method(crud_function(meta, name)?, meta, config, sdk)?);
    }

    parse_item(quote! {
        impl #sdk::Resource for #receiver {
            type Model = #model;

            fn resource_type(&self) -> &'static str {
                #resource_type
            }

            fn model_object(&self) -> Box<dyn std::any::Any> {
                Box::new(#model::default())
            }

            #id_validation

            fn arguments(&self) -> #sdk::SchemaMap {
                #arguments
            }

            fn attributes(&self) -> #sdk::SchemaMap {
                #attributes
            }

            #(#crud)*
        }
    })
}

fn crud_function<'m>(meta: &'m MetaInfo, name: &str) -> Result<&'m Function> {
    meta.function(name).ok_or_else(|| {
        GeneratorError::Scaffold(format!("{} lost its function {}", meta.resource_type, name))
    })
}

/// `fn create(&self) -> sdk::ResourceFunc { .. }` wrapping a rewritten body
fn crud_method(
    function: &Function,
    meta: &MetaInfo,
    config: &MigrationConfig,
    sdk: &syn::Path,
) -> Result<ImplItemFn> {
    let Some(method) = function.role.method_name() else {
        return Err(GeneratorError::Scaffold(format!("{} is not a CRUD function", function.name)));
    };
    let method = make_ident(method);
    let model = make_ident(&meta.model_name);
    let model_var = make_ident(&function.var_model);
    let meta_var = make_ident(&config.meta_var);

    let seconds = match function.timeout.as_secs() {
        0 => config.default_timeout_secs,
        seconds => seconds,
    };
    let timeout = if seconds % 60 == 0 {
        let minutes = Literal::u64_unsuffixed(seconds / 60);
        quote!(Duration::from_secs(#minutes * 60))
    } else {
        let seconds = Literal::u64_unsuffixed(seconds);
        quote!(Duration::from_secs(#seconds))
    };

    let mut body = function.item.block.stmts.clone();
    let prelude = if function.role == FunctionRole::Read {
        encode_on_success(&mut body, &model_var, &meta_var);
        TokenStream::new()
    } else {
        quote!(#meta_var.decode(&mut #model_var)?;)
    };

    let tokens = quote! {
        fn #method(&self) -> #sdk::ResourceFunc {
            #sdk::ResourceFunc {
                timeout: #timeout,
                func: Box::new(move |ctx, #meta_var| {
                    let mut #model_var = #model::default();
                    #prelude
                    #(#body)*
                }),
            }
        }
    };
    syn::parse2(tokens).map_err(|e| GeneratorError::Scaffold(format!("{}: {}", function.name, e)))
}

/// Read ends by encoding the model instead of returning bare success
fn encode_on_success(body: &mut [Stmt], model_var: &syn::Ident, meta_var: &syn::Ident) {
    let encode: Expr = syn::parse_quote!(#meta_var.encode(&#model_var));
    match body.last_mut() {
        Some(Stmt::Expr(Expr::Return(ret), _)) if ret.expr.as_deref().is_some_and(is_ok_unit) => {
            ret.expr = Some(Box::new(encode));
        }
        Some(Stmt::Expr(expr, None)) if is_ok_unit(expr) => *expr = encode,
        _ => {}
    }
}

/// `pluginsdk::schema_map([("name", ..), ..])` from the kept schema expressions
fn schema_map(fields: &[SchemaField], ctor: Option<&syn::Path>) -> TokenStream {
    let entries = fields.iter().map(|field| {
        let tag = &field.tag;
        let expr = &field.expr;
        quote!((#tag, #expr))
    });
    match ctor {
        Some(ctor) => quote!(#ctor([#(#entries),*])),
        None => quote!([#(#entries),*].into_iter().collect()),
    }
}

/// A promoted helper as a `&self` method
fn helper_method(item: &ItemFn) -> ImplItemFn {
    let mut sig = item.sig.clone();
    sig.inputs.insert(0, syn::parse_quote!(&self));
    ImplItemFn {
        attrs: item.attrs.clone(),
        vis: item.vis.clone(),
        defaultness: None,
        sig,
        block: (*item.block).clone(),
    }
}

fn parse_item(tokens: TokenStream) -> Result<Item> {
    syn::parse2(tokens).map_err(|e| GeneratorError::Scaffold(e.to_string()))
}
