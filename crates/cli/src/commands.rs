//! Command implementations

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::debug;
use typedprop_core::{
    ConverterStrategy, CoreConfig, Dump, Family, FlatArray, Marshal, MetadataProvider, ObjectRef,
    RuntimeCache, SchemaRegistry, Value,
};

use crate::EntityArgs;

/// Registry populated from every sidecar in `schemas`
fn load_registry(schemas: &[PathBuf]) -> Result<SchemaRegistry> {
    let registry = SchemaRegistry::new();
    for path in schemas {
        registry
            .load_sidecar_file(path)
            .with_context(|| format!("loading schema {}", path.display()))?;
    }
    Ok(registry)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    }
}

/// Build the entity described by `args`
fn build_entity(config: &CoreConfig, args: &EntityArgs) -> Result<ObjectRef> {
    let registry = load_registry(&args.schemas)?;
    let marshal = Marshal::with_config(
        Arc::new(registry),
        Arc::new(RuntimeCache::new()),
        config.clone(),
    );

    if let Some(path) = &args.warm {
        let blob = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let count = marshal.cache().import(&blob)?;
        debug!("Warmed cache with {} entries", count);
    }

    let input = Value::from_json_str(&read_input(&args.input)?).context("parsing JSON input")?;
    Ok(marshal.instantiate(&args.type_name, Some(input))?)
}

pub fn dump(
    config: &CoreConfig,
    args: &EntityArgs,
    max_depth: Option<usize>,
) -> Result<Vec<String>> {
    let root = build_entity(config, args)?;
    let mut dump = Dump::from_config(&config.dump);
    if let Some(depth) = max_depth {
        dump = Dump::new(depth).with_indent(config.dump.indent.clone());
    }
    Ok(dump.convert(&Value::Object(root))?)
}

pub fn flat(config: &CoreConfig, args: &EntityArgs, strict: bool, pretty: bool) -> Result<String> {
    let root = build_entity(config, args)?;
    let converter = if strict {
        FlatArray::strict()
    } else {
        FlatArray::from_config(&config.flat)
    };
    let json = converter
        .convert(&Value::Object(root))?
        .to_json()
        .ok_or_else(|| anyhow!("output contains a non-finite float"))?;

    Ok(if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    })
}

/// Instantiate each type once and export the warmed cache
pub fn cache_export(config: &CoreConfig, schemas: &[PathBuf], types: &[String]) -> Result<Vec<u8>> {
    let registry = Arc::new(load_registry(schemas)?);
    let targets: Vec<String> = if types.is_empty() {
        let mut names: Vec<String> = registry
            .type_names()
            .into_iter()
            .filter(|name| {
                registry
                    .describe(name)
                    .is_some_and(|d| d.family() == Family::Entity)
            })
            .collect();
        names.sort();
        names
    } else {
        types.to_vec()
    };

    let marshal = Marshal::with_config(
        registry,
        Arc::new(RuntimeCache::new()),
        config.clone(),
    );
    for name in &targets {
        marshal
            .instantiate(name, None)
            .with_context(|| format!("warming {}", name))?;
    }
    debug!("Warmed {} types", targets.len());

    Ok(marshal.cache().export()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SCHEMA: &str = r#"
[types.Person]
properties = { name = "string", age = "int", friends = "Person[]" }
defaults = { age = 0 }

[types.Point]
family = "record"
"#;

    /// Per-test temp directory, removed on drop
    struct Fixtures {
        dir: PathBuf,
        next: usize,
    }

    impl Fixtures {
        fn new() -> Self {
            static NEXT_DIR: AtomicUsize = AtomicUsize::new(0);
            let dir = std::env::temp_dir().join(format!(
                "typedprop-cli-{}-{}",
                std::process::id(),
                NEXT_DIR.fetch_add(1, Ordering::Relaxed)
            ));
            std::fs::create_dir_all(&dir).unwrap();
            Self { dir, next: 0 }
        }

        /// Write `content` to a fresh file in this directory
        fn file(&mut self, extension: &str, content: &str) -> PathBuf {
            let path = self.dir.join(format!("{}.{}", self.next, extension));
            self.next += 1;
            std::fs::write(&path, content).unwrap();
            path
        }

        fn entity_args(&mut self, input: &str) -> EntityArgs {
            EntityArgs {
                schemas: vec![self.file("toml", SCHEMA)],
                type_name: "Person".to_string(),
                warm: None,
                input: self.file("json", input),
            }
        }
    }

    impl Drop for Fixtures {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn test_dump_command() {
        let mut fx = Fixtures::new();
        let args =
            fx.entity_args(r#"{"name": "Ada", "age": "36", "friends": {"0": {"name": "Grace"}}}"#);
        let lines = dump(&CoreConfig::default(), &args, None).unwrap();
        assert_eq!(lines[0], "Person (3)");
        assert_eq!(lines[1], "  name: \"Ada\"");
        assert_eq!(lines[2], "  age: 36");
        assert_eq!(lines[3], "  friends: array (1)");
        assert_eq!(lines[4], "    0: Person (3)");
    }

    #[test]
    fn test_flat_command() {
        let mut fx = Fixtures::new();
        let args = fx.entity_args(r#"{"name": "Ada"}"#);
        let out = flat(&CoreConfig::default(), &args, true, false).unwrap();
        assert_eq!(out, r#"{"name":"Ada","age":0,"friends":null}"#);
    }

    #[test]
    fn test_cache_export_skips_records() {
        let mut fx = Fixtures::new();
        let schema = fx.file("toml", SCHEMA);
        let blob = cache_export(&CoreConfig::default(), &[schema], &[]).unwrap();

        let cache = RuntimeCache::new();
        assert_eq!(cache.import(&blob).unwrap(), 3);
        assert!(cache.definitions("Person").is_some());
        assert!(cache.definitions("Point").is_none());
    }

    #[test]
    fn test_warm_start_matches_cold() {
        let mut fx = Fixtures::new();
        let schema = fx.file("toml", SCHEMA);
        let blob =
            cache_export(&CoreConfig::default(), std::slice::from_ref(&schema), &[]).unwrap();

        let mut args = fx.entity_args(r#"{"name": "Ada"}"#);
        let cold = flat(&CoreConfig::default(), &args, false, false).unwrap();
        args.warm = Some(fx.file("json", &String::from_utf8(blob).unwrap()));
        let warm = flat(&CoreConfig::default(), &args, false, false).unwrap();
        assert_eq!(cold, warm);
    }

    #[test]
    fn test_fixtures_are_removed() {
        let mut fx = Fixtures::new();
        let path = fx.file("json", "{}");
        let dir = fx.dir.clone();
        assert!(path.exists());
        drop(fx);
        assert!(!dir.exists());
    }
}
