//! Migration configuration loading from YAML files
//!
//! Every naming convention the rewriters match against lives here so that
//! providers with a slightly different untyped idiom can be migrated without
//! code changes. All fields are optional in the YAML file and fall back to
//! the conventions of the Hemmer provider SDK.

use crate::{MigratorError, Result, ValueKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Root structure of a migration config file
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Optional fixed prefix of resource type names (e.g., "azurerm_")
    pub name_prefix: String,
    /// Suffix appended to the source file stem for the output file
    pub output_suffix: String,
    /// Fail a whole resource when any metadata lookup is unresolved
    pub strict: bool,
    /// Type name of the untyped accessor parameter
    pub accessor_type: String,
    /// Type name returned by resource definition functions
    pub resource_type_name: String,
    /// Name of the typed model variable inside CRUD functions
    pub model_var: String,
    /// Name of the synthetic resource metadata variable
    pub meta_var: String,
    /// Client container type recovered from `meta` by downcasting
    pub client_type: String,
    /// Variables holding parsed resource identifiers
    pub identity_vars: Vec<String>,
    /// Timeout emitted when the definition specifies none
    pub default_timeout_secs: u64,
    /// Path of the typed SDK module
    pub sdk_path: String,
    /// Helper that turns an optional value into an owned one
    pub pointer_from: String,
    /// Call reporting that a resource already exists
    pub import_guard: String,
    /// Module providing `for_create`, `for_read`, ... timeout acquisitions
    pub timeout_module: String,
    /// Macro releasing an acquired timeout
    pub release_macro: String,
    /// Helper calls renamed to their typed counterparts
    pub function_renames: BTreeMap<String, String>,
    /// Schema helper calls and the attribute they produce
    pub schema_helpers: BTreeMap<String, SchemaHelper>,
    /// Root identifier → `use` path added by import resolution
    pub known_imports: BTreeMap<String, String>,
}

/// Attribute shape produced by a schema helper call
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SchemaHelper {
    /// Value kind of the attribute
    #[serde(rename = "type")]
    pub kind: ValueKind,
    /// Element kind for collections
    #[serde(default)]
    pub elem: Option<ValueKind>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub computed: bool,
}

impl SchemaHelper {
    fn new(kind: ValueKind, elem: Option<ValueKind>, required: bool, computed: bool) -> Self {
        Self {
            kind,
            elem,
            required,
            computed,
        }
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let function_renames = [
            ("zones::flatten_untyped", "zones::flatten"),
            ("zones::expand_untyped", "zones::expand"),
            (
                "identity::expand_system_assigned",
                "identity::expand_system_assigned_from_model",
            ),
            (
                "identity::flatten_system_assigned",
                "identity::flatten_system_assigned_to_model",
            ),
            (
                "identity::expand_system_and_user_assigned_map",
                "identity::expand_system_and_user_assigned_map_from_model",
            ),
            (
                "identity::flatten_system_and_user_assigned_map",
                "identity::flatten_system_and_user_assigned_map_to_model",
            ),
            ("tags::expand", "tags::expand_typed"),
            ("tags::flatten", "tags::flatten_typed"),
        ]
        .into_iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();

        let schema_helpers = [
            (
                "commonschema::location",
                SchemaHelper::new(ValueKind::String, None, true, false),
            ),
            (
                "commonschema::location_computed",
                SchemaHelper::new(ValueKind::String, None, false, true),
            ),
            (
                "commonschema::resource_group_name",
                SchemaHelper::new(ValueKind::String, None, true, false),
            ),
            (
                "commonschema::zones_multiple_optional",
                SchemaHelper::new(ValueKind::Set, Some(ValueKind::String), false, false),
            ),
            (
                "tags::schema",
                SchemaHelper::new(ValueKind::Map, Some(ValueKind::String), false, false),
            ),
            (
                "tags::schema_computed",
                SchemaHelper::new(ValueKind::Map, Some(ValueKind::String), false, true),
            ),
        ]
        .into_iter()
        .map(|(path, helper)| (path.to_string(), helper))
        .collect();

        let known_imports = [
            ("pointer", "hemmer_provider_sdk::pointer"),
            ("sdk", "hemmer_provider_sdk::sdk"),
            ("pluginsdk", "hemmer_provider_sdk::pluginsdk"),
            ("HashMap", "std::collections::HashMap"),
            ("Duration", "std::time::Duration"),
            ("Serialize", "serde::Serialize"),
            ("Deserialize", "serde::Deserialize"),
        ]
        .into_iter()
        .map(|(root, path)| (root.to_string(), path.to_string()))
        .collect();

        Self {
            name_prefix: "azurerm_".to_string(),
            output_suffix: "_typed".to_string(),
            strict: false,
            accessor_type: "ResourceData".to_string(),
            resource_type_name: "Resource".to_string(),
            model_var: "model".to_string(),
            meta_var: "meta".to_string(),
            client_type: "Client".to_string(),
            identity_vars: vec!["id".to_string()],
            default_timeout_secs: 30 * 60,
            sdk_path: "sdk".to_string(),
            pointer_from: "pointer::from".to_string(),
            import_guard: "tf::import_as_exists_error".to_string(),
            timeout_module: "timeouts".to_string(),
            release_macro: "defer".to_string(),
            function_renames,
            schema_helpers,
            known_imports,
        }
    }
}

impl MigrationConfig {
    /// Load a config from a YAML file; absent keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MigratorError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the rewriters cannot work with
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("accessor_type", &self.accessor_type),
            ("model_var", &self.model_var),
            ("meta_var", &self.meta_var),
            ("output_suffix", &self.output_suffix),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(MigratorError::Config(format!("`{key}` must not be empty")));
            }
        }
        let variables = [("model_var", &self.model_var), ("meta_var", &self.meta_var)]
            .into_iter()
            .chain(self.identity_vars.iter().map(|v| ("identity_vars", v)));
        for (key, value) in variables {
            if syn::parse_str::<syn::Ident>(value).is_err() {
                return Err(MigratorError::Config(format!(
                    "`{key}` value `{value}` is not a valid identifier"
                )));
            }
        }
        if self.model_var == self.meta_var {
            return Err(MigratorError::Config(format!(
                "`model_var` and `meta_var` must differ (both are `{}`)",
                self.model_var
            )));
        }
        Ok(())
    }

    /// Whether `name` is a variable holding a parsed resource identifier
    pub fn is_identity_var(&self, name: &str) -> bool {
        self.identity_vars.iter().any(|v| v == name)
    }

    /// The identifier passed to `mark_as_gone` and friends
    pub fn primary_identity_var(&self) -> &str {
        self.identity_vars.first().map(String::as_str).unwrap_or("id")
    }
}
