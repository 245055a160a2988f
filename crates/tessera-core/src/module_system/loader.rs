//! Loading module definitions from manifest files.
//!
//! A manifest is a JSON, TOML or YAML document. Its file stem, converted to
//! lower camel case, names the module (`http-server.toml` → `httpServer`).
//!
//! - A document with a `kind` key is handed to the [`ModuleFactory`]
//!   registered under that kind.
//! - A document made of a `value` key (plus, optionally, `dependencies`) is a
//!   value module that waits for its dependencies.
//! - Any other non-null document is itself the module's value.
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use heck::ToLowerCamelCase;
use serde_json::{Map, Value};

use crate::config::ConfigFormat;
use crate::kernel::constants::{MANIFEST_DEPENDENCIES_KEY, MANIFEST_KIND_KEY, MANIFEST_VALUE_KEY};
use crate::kernel::error::SharedError;
use crate::kernel::{ModuleLoader, Result};
use crate::module_system::definition::{BoxError, ModuleDefinition, StartResult};
use crate::module_system::error::{DefinitionFault, ManifestError, ModuleSystemError};
use crate::module_system::value::{Dependencies, ModuleValue};

/// What a factory sees of the manifest it builds a module from.
#[derive(Debug, Clone, Copy)]
pub struct ManifestContext<'a> {
    /// Module name derived from the file name
    pub name: &'a str,
    pub path: &'a Path,
    /// The whole parsed document, `kind` key included
    pub document: &'a Value,
}

/// Builds a module definition from a manifest document.
pub type ModuleFactory =
    Arc<dyn Fn(&ManifestContext<'_>) -> std::result::Result<ModuleDefinition, BoxError> + Send + Sync>;

/// Reads manifest files and registers the modules they describe.
#[derive(Clone, Default)]
pub struct ManifestLoader {
    factories: HashMap<String, ModuleFactory>,
}

impl ManifestLoader {
    /// A loader that only understands value manifests.
    pub fn new() -> Self {
        Self::default()
    }

    /// A loader with the `merge` and `collect` factories registered.
    pub fn with_builtin_factories() -> Self {
        let mut loader = Self::new();
        loader.add_factory("merge", Arc::new(merge_factory));
        loader.add_factory("collect", Arc::new(collect_factory));
        loader
    }

    /// Register `factory` under `kind`, replacing any previous one.
    pub fn add_factory(&mut self, kind: impl Into<String>, factory: ModuleFactory) {
        let kind = kind.into();
        if self.factories.insert(kind.clone(), factory).is_some() {
            log::debug!("Replaced module factory '{}'", kind);
        }
    }

    pub fn has_factory(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// Parse `path` into a module definition without registering it.
    pub fn load_file(&self, path: &Path) -> std::result::Result<ModuleDefinition, ManifestError> {
        let format = ConfigFormat::from_path(path)
            .ok_or_else(|| ManifestError::UnsupportedFormat(path.to_path_buf()))?;
        let name = module_name_from_path(path)?;

        let data = std::fs::read_to_string(path)
            .map_err(|e| ManifestError::io(e, "read_to_string", path.to_path_buf()))?;
        if data.trim().is_empty() {
            return Err(ManifestError::EmptyDefinition(path.to_path_buf()));
        }
        let document: Value = format.deserialize(&data).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            format: format.name().to_string(),
            source,
        })?;

        self.build(&name, path, document)
    }

    /// Load `path` and register it on `loader`. Returns the module name.
    pub fn register_file(&self, loader: &ModuleLoader, path: &Path) -> Result<String> {
        let definition = self.load_file(path)?;
        let name = definition.name().unwrap_or_default().to_string();
        loader.register(definition)?;
        log::info!("Registered module '{}' from {}", name, path.display());
        Ok(name)
    }

    /// Register every supported manifest in `dir`, in sorted path order.
    ///
    /// Subdirectories are visited only when `recursive` is set. Files whose
    /// extension is not a manifest format are skipped.
    pub fn register_directory(&self, loader: &ModuleLoader, dir: &Path, recursive: bool) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for path in manifest_paths(dir, recursive)? {
            names.push(self.register_file(loader, &path)?);
        }
        Ok(names)
    }

    fn build(&self, name: &str, path: &Path, document: Value) -> std::result::Result<ModuleDefinition, ManifestError> {
        if document.is_null() {
            return Err(ManifestError::EmptyDefinition(path.to_path_buf()));
        }

        let object = document.as_object();
        let declared = || match object.and_then(|map| map.get(MANIFEST_DEPENDENCIES_KEY)) {
            Some(raw) => parse_dependencies(raw)
                .map(Some)
                .ok_or_else(|| invalid_definition(name, path, DefinitionFault::InvalidDependencies)),
            None => Ok(None),
        };

        if let Some(raw_kind) = object.and_then(|map| map.get(MANIFEST_KIND_KEY)) {
            let kind = raw_kind
                .as_str()
                .ok_or_else(|| ManifestError::InvalidKind { path: path.to_path_buf() })?;
            let factory = self.factories.get(kind).ok_or_else(|| ManifestError::UnknownKind {
                path: path.to_path_buf(),
                kind: kind.to_string(),
            })?;
            let declared = declared()?;
            let context = ManifestContext { name, path, document: &document };
            let mut definition = factory(&context)
                .map_err(|e| ManifestError::Factory {
                    path: path.to_path_buf(),
                    kind: kind.to_string(),
                    source: SharedError::from(e),
                })?
                .named(name);
            if let Some(dependencies) = declared {
                definition = definition.depends_on(dependencies);
            }
            log::debug!("Built module '{}' with factory '{}'", name, kind);
            return Ok(definition);
        }

        let wrapped = object.is_some_and(|map| {
            map.contains_key(MANIFEST_VALUE_KEY)
                && map
                    .keys()
                    .all(|key| key == MANIFEST_VALUE_KEY || key == MANIFEST_DEPENDENCIES_KEY)
        });
        let (value, dependencies) = if wrapped {
            let declared = declared()?;
            let mut map = match document {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            let value = map.remove(MANIFEST_VALUE_KEY).unwrap_or(Value::Null);
            if value.is_null() {
                return Err(invalid_definition(name, path, DefinitionFault::MissingValue));
            }
            (value, declared.unwrap_or_default())
        } else {
            (document, Vec::new())
        };

        let value = ModuleValue::new(value);
        Ok(ModuleDefinition::new(name)
            .depends_on(dependencies)
            .on_start(move |_| {
                let value = value.clone();
                async move { Ok(Some(value)) }
            }))
    }
}

impl fmt::Debug for ManifestLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<&String> = self.factories.keys().collect();
        kinds.sort();
        f.debug_struct("ManifestLoader").field("factories", &kinds).finish()
    }
}

fn invalid_definition(name: &str, path: &Path, fault: DefinitionFault) -> ManifestError {
    ManifestError::InvalidDefinition {
        path: path.to_path_buf(),
        source: ModuleSystemError::invalid(name, fault),
    }
}

/// Module name for a manifest at `path`: its file stem in lower camel case.
pub fn module_name_from_path(path: &Path) -> std::result::Result<String, ManifestError> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| ManifestError::InvalidFileName(path.to_path_buf()))?;
    let name = stem.to_lower_camel_case();
    if name.is_empty() {
        return Err(ManifestError::InvalidFileName(path.to_path_buf()));
    }
    Ok(name)
}

/// Manifest files under `dir`, sorted, optionally descending into subdirectories.
pub fn manifest_paths(dir: &Path, recursive: bool) -> std::result::Result<Vec<PathBuf>, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::DirectoryNotFound(dir.to_path_buf()));
    }

    let mut entries = Vec::new();
    let read_dir = std::fs::read_dir(dir).map_err(|e| ManifestError::io(e, "read_dir", dir.to_path_buf()))?;
    for entry in read_dir {
        let entry = entry.map_err(|e| ManifestError::io(e, "read_dir_entry", dir.to_path_buf()))?;
        entries.push(entry.path());
    }
    entries.sort();

    let mut paths = Vec::new();
    for path in entries {
        if path.is_file() {
            if ConfigFormat::from_path(&path).is_some() {
                paths.push(path);
            } else {
                log::debug!("Skipping {}: not a manifest file", path.display());
            }
        } else if path.is_dir() && recursive {
            paths.extend(manifest_paths(&path, recursive)?);
        }
    }
    Ok(paths)
}

/// `dependencies` may be absent, null, a single name, or a list of names.
fn parse_dependencies(raw: &Value) -> Option<Vec<String>> {
    match raw {
        Value::Null => Some(Vec::new()),
        Value::String(name) if name.is_empty() => Some(Vec::new()),
        Value::String(name) => Some(vec![name.clone()]),
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => None,
    }
}

fn json_dependencies(deps: &Dependencies) -> std::result::Result<Vec<(String, Value)>, BoxError> {
    deps.iter()
        .map(|(name, value)| {
            let json = match value {
                None => Value::Null,
                Some(value) => value
                    .downcast_ref::<Value>()
                    .cloned()
                    .ok_or_else(|| format!("dependency '{}' is not a JSON value", name))?,
            };
            Ok((name.to_string(), json))
        })
        .collect()
}

/// `kind = "merge"`: one object built from the dependency objects, in
/// declaration order, then the manifest's own `value` object on top.
fn merge_factory(context: &ManifestContext<'_>) -> std::result::Result<ModuleDefinition, BoxError> {
    let own = match context.document.get(MANIFEST_VALUE_KEY) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => return Err("'value' of a merge module must be an object".into()),
    };

    Ok(ModuleDefinition::new(context.name).on_start(move |deps| {
        let merged = merge_objects(&deps, own.clone());
        async move { merged }
    }))
}

fn merge_objects(deps: &Dependencies, own: Map<String, Value>) -> StartResult {
    let mut merged = Map::new();
    for (name, value) in json_dependencies(deps)? {
        match value {
            Value::Object(map) => merged.extend(map),
            Value::Null => {}
            _ => return Err(format!("dependency '{}' is not a JSON object", name).into()),
        }
    }
    merged.extend(own);
    Ok(Some(ModuleValue::new(Value::Object(merged))))
}

/// `kind = "collect"`: the dependency values as a JSON array.
fn collect_factory(context: &ManifestContext<'_>) -> std::result::Result<ModuleDefinition, BoxError> {
    Ok(ModuleDefinition::new(context.name).on_start(|deps| {
        let collected = collect_values(&deps);
        async move { collected }
    }))
}

fn collect_values(deps: &Dependencies) -> StartResult {
    let values = json_dependencies(deps)?.into_iter().map(|(_, value)| value).collect();
    Ok(Some(ModuleValue::new(Value::Array(values))))
}
