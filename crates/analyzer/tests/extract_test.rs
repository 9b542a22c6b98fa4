//! Integration test for metadata extraction

use hemmer_provider_migrator_analyzer::{extract, AnalyzerError, FunctionRole, Registry};
use hemmer_provider_migrator_common::MigrationConfig;
use std::path::PathBuf;
use std::time::Duration;

const STORAGE_ACCOUNT: &str = r#"
    use crate::client::Client;
    use hemmer_provider_sdk::pluginsdk::{self, ResourceData};

    const MAX_RULES: usize = 10;

    pub struct NetworkRuleModel {
        #[tfschema("ip_rules")]
        pub ip_rules: Vec<String>,
        #[tfschema("default_action")]
        pub default_action: String,
    }

    pub fn resource_storage_account() -> pluginsdk::Resource {
        pluginsdk::Resource {
            create: resource_storage_account_create,
            read: resource_storage_account_read,
            update: None,
            delete: resource_storage_account_delete,
            importer: pluginsdk::importer_validating_resource_id(validate::storage_account_id),
            timeouts: pluginsdk::ResourceTimeout {
                create: Some(Duration::from_mins(60)),
                read: Some(Duration::from_secs(5 * 60)),
                delete: Some(Duration::from_secs(3600)),
                ..Default::default()
            },
            schema_version: 2,
            schema: pluginsdk::schema_map([
                ("name", pluginsdk::Schema {
                    type_: pluginsdk::ValueType::String,
                    required: true,
                    ..Default::default()
                }),
                ("account_tier", pluginsdk::Schema {
                    type_: pluginsdk::ValueType::String,
                    optional: true,
                    computed: true,
                    ..Default::default()
                }),
                ("network_rule", pluginsdk::Schema {
                    type_: pluginsdk::ValueType::List,
                    optional: true,
                    elem: pluginsdk::Elem::resource(pluginsdk::Resource {
                        schema: pluginsdk::schema_map([
                            ("ip_rules", pluginsdk::Schema {
                                type_: pluginsdk::ValueType::Set,
                                optional: true,
                                elem: pluginsdk::Elem::schema(pluginsdk::Schema {
                                    type_: pluginsdk::ValueType::String,
                                    ..Default::default()
                                }),
                                ..Default::default()
                            }),
                            ("default_action", pluginsdk::Schema {
                                type_: pluginsdk::ValueType::String,
                                required: true,
                                ..Default::default()
                            }),
                        ]),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ("primary_endpoint", pluginsdk::Schema {
                    type_: pluginsdk::ValueType::String,
                    computed: true,
                    ..Default::default()
                }),
                ("tags", tags::schema()),
            ]),
            ..Default::default()
        }
    }

    fn resource_storage_account_create(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
        resource_storage_account_read(d, meta)
    }

    fn resource_storage_account_read(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
        Ok(())
    }

    fn resource_storage_account_delete(d: &mut ResourceData, meta: &dyn Any) -> Result<(), Error> {
        Ok(())
    }

    fn expand_network_rule(input: &ResourceData) -> Vec<NetworkRule> {
        Vec::new()
    }
"#;

fn registry(content: &str) -> Registry {
    Registry::from_sources(
        vec![(
            PathBuf::from("internal/storage/storage_account_resource.rs"),
            content.to_string(),
        )],
        &MigrationConfig::default(),
    )
}

#[test]
fn test_extract_storage_account() {
    let config = MigrationConfig::default();
    let registry = registry(STORAGE_ACCOUNT);
    let entry = registry.resolve("storage_account", &config.name_prefix).unwrap();
    let meta = extract(entry, &config).unwrap();

    assert_eq!(meta.resource_name, "StorageAccount");
    assert_eq!(meta.model_name, "StorageAccountModel");
    assert_eq!(meta.receiver, "StorageAccountResource");
    assert_eq!(meta.resource_type, "azurerm_storage_account");
    assert_eq!(meta.package, "storage");
    assert_eq!(meta.schema_version, 2);
    assert!(!meta.has_update);
    assert!(meta.update.is_none());
    assert!(meta.id_validator.is_some());
    assert_eq!(meta.imports.len(), 2);

    // Optional + computed stays an argument; computed-only is an attribute
    let arguments: Vec<_> = meta.arguments.iter().map(|f| f.tag.as_str()).collect();
    assert_eq!(arguments, vec!["name", "account_tier", "network_rule", "tags"]);
    let attributes: Vec<_> = meta.attributes.iter().map(|f| f.tag.as_str()).collect();
    assert_eq!(attributes, vec!["primary_endpoint"]);

    let top = meta.top_model().unwrap();
    assert_eq!(top.field_by_tag("network_rule").unwrap().ty, "Vec<NetworkRuleModel>");
    assert_eq!(top.field_by_tag("tags").unwrap().ty, "HashMap<String, String>");

    // The declared model replaces the synthesized one
    let rules = meta.models.get("NetworkRuleModel").unwrap();
    assert!(rules.declared);
    assert_eq!(meta.find_field_by_tag("NetworkRuleModel", "ip_rules").unwrap().ty, "Vec<String>");
    assert!(meta
        .passthrough
        .iter()
        .any(|item| matches!(item, syn::Item::Struct(s) if s.ident == "NetworkRuleModel")));
    assert!(meta
        .passthrough
        .iter()
        .any(|item| matches!(item, syn::Item::Const(c) if c.ident == "MAX_RULES")));

    let create = meta.function("resource_storage_account_create").unwrap();
    assert_eq!(create.role, FunctionRole::Create);
    assert_eq!(create.timeout, Duration::from_secs(3600));
    assert_eq!(create.var_model, "model");
    let read = meta.function(&meta.read).unwrap();
    assert_eq!(read.timeout, Duration::from_secs(300));

    let helper = meta.function("expand_network_rule").unwrap();
    assert_eq!(helper.role, FunctionRole::Helper);
    assert_eq!(helper.accessor.as_deref(), Some("input"));
    assert_eq!(helper.var_model, "input");
    assert!(meta.function("resource_storage_account").is_none());
}

#[test]
fn test_nested_tag_path() {
    let config = MigrationConfig::default();
    let registry = registry(STORAGE_ACCOUNT);
    let entry = registry.resolve("azurerm_storage_account", &config.name_prefix).unwrap();
    let meta = extract(entry, &config).unwrap();

    assert!(meta.resolve_tag_path("", "network_rule.0.default_action").is_some());
    assert!(meta.resolve_tag_path("", "network_rule.0.missing").is_none());
    assert!(meta.resolve_tag_path("", "name.0").is_none());
    let model = meta.find_model_by_keys(["default_action", "ip_rules"]).unwrap();
    assert_eq!(model.name, "NetworkRuleModel");
}

#[test]
fn test_missing_crud_function() {
    let config = MigrationConfig::default();
    let source = STORAGE_ACCOUNT.replace(
        "fn resource_storage_account_delete(",
        "fn resource_storage_account_remove(",
    );
    let registry = registry(&source);
    let entry = registry.resolve("storage_account", &config.name_prefix).unwrap();

    match extract(entry, &config) {
        Err(AnalyzerError::MissingFunction { resource, function }) => {
            assert_eq!(resource, "azurerm_storage_account");
            assert_eq!(function, "delete");
        }
        other => panic!("expected a missing function error, got {:?}", other.map(|m| m.resource_name)),
    }
}
