//! Downgrade and upgrade command handlers

use super::utils::{context_for, load_registry, read_payload};
use crate::cli::TransformArgs;
use crate::config::Config;
use crate::error::Result;
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use datever_core::VersionedModel;
use std::path::Path;
use tracing::{info, instrument};

/// Handle the downgrade command
///
/// Serializes a canonical instance and unapplies every change newer than
/// the requested version.
#[instrument(skip(schemas, config, output), fields(model = %args.model))]
pub fn handle_downgrade(
    args: TransformArgs,
    schemas: Option<&Path>,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let registry = load_registry(schemas, config)?;
    let context = context_for(args.api_version.as_deref(), config)?;
    let instance = read_payload(&args.input)?;

    let _timer = Timer::new("downgrade");
    let model = VersionedModel::new(registry.get(&args.model)?)
        .with_context(context)
        .with_instance(instance);
    let active = model.active_changes().len();
    let data = model.into_data()?;

    info!(active_changes = active, "downgraded instance");
    output.data(&data)
}

/// Handle the upgrade command
///
/// Validates input written against the requested version, then applies
/// every newer change to reach the latest shape.
#[instrument(skip(schemas, config, output), fields(model = %args.model))]
pub fn handle_upgrade(
    args: TransformArgs,
    schemas: Option<&Path>,
    config: &Config,
    output: &mut OutputWriter,
) -> Result<()> {
    let registry = load_registry(schemas, config)?;
    let context = context_for(args.api_version.as_deref(), config)?;
    let input = read_payload(&args.input)?;

    let _timer = Timer::new("upgrade");
    let mut model = VersionedModel::new(registry.get(&args.model)?)
        .with_context(context)
        .with_data(input);
    model.validate()?;
    let upgraded = model.updated_data()?;

    info!(active_changes = model.active_changes().len(), "upgraded input");
    output.data(&upgraded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use serde_json::{json, Value};
    use std::fs;
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const DOCUMENT: &str = r#"
schemas:
  - name: Person
    fields:
      - { name: name, type: char }
      - { name: eyeColor, type: char }
      - { name: height, type: integer }
    changes:
      "2018-08-02":
        op: remove_field
        name: hairStyle
        field: { type: char }
        default: short
      "2018-07-29":
        op: rename_field
        from: iColor
        to: eyeColor
"#;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        schemas: std::path::PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let schemas = dir.path().join("schemas.yaml");
            fs::write(&schemas, DOCUMENT).unwrap();
            Self { dir, schemas }
        }

        fn payload(&self, value: Value) -> std::path::PathBuf {
            let path = self.dir.path().join("payload.json");
            fs::write(&path, value.to_string()).unwrap();
            path
        }

        fn args(&self, input: std::path::PathBuf, version: &str) -> TransformArgs {
            TransformArgs {
                model: "Person".to_string(),
                input,
                api_version: Some(version.to_string()),
            }
        }
    }

    fn json_writer() -> (OutputWriter, Captured) {
        let captured = Captured::default();
        let writer = OutputWriter::with_writer(OutputFormat::Json, false, false, Box::new(captured.clone()));
        (writer, captured)
    }

    fn parsed(captured: &Captured) -> Value {
        serde_json::from_slice(&captured.0.lock().unwrap()).unwrap()
    }

    #[test]
    fn test_downgrade_applies_newer_changes() {
        let fixture = Fixture::new();
        let input = fixture.payload(json!({"name": "Chewbacca", "eyeColor": "blue", "height": 228}));
        let (mut output, captured) = json_writer();

        handle_downgrade(
            fixture.args(input, "2018-07-01"),
            Some(&fixture.schemas),
            &Config::default(),
            &mut output,
        )
        .unwrap();

        assert_eq!(
            parsed(&captured),
            json!({"name": "Chewbacca", "height": 228, "hairStyle": "short", "iColor": "blue"})
        );
    }

    #[test]
    fn test_upgrade_returns_latest_shape() {
        let fixture = Fixture::new();
        let input = fixture.payload(json!({
            "name": "Chewbacca",
            "iColor": "blue",
            "height": 228,
            "hairStyle": "long"
        }));
        let (mut output, captured) = json_writer();

        handle_upgrade(
            fixture.args(input, "2018-07-01"),
            Some(&fixture.schemas),
            &Config::default(),
            &mut output,
        )
        .unwrap();

        assert_eq!(
            parsed(&captured),
            json!({"name": "Chewbacca", "eyeColor": "blue", "height": 228})
        );
    }

    #[test]
    fn test_upgrade_rejects_invalid_input() {
        let fixture = Fixture::new();
        let input = fixture.payload(json!({"name": "Chewbacca", "iColor": "blue", "height": "tall"}));
        let (mut output, _) = json_writer();

        let err = handle_upgrade(
            fixture.args(input, "2018-07-01"),
            Some(&fixture.schemas),
            &Config::default(),
            &mut output,
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), 8);
    }

    #[test]
    fn test_downgrade_keeps_core_exit_code() {
        let fixture = Fixture::new();
        let input = fixture.payload(json!({"name": "Chewbacca", "height": 228}));
        let (mut output, _) = json_writer();

        let err = handle_downgrade(
            fixture.args(input, "2018-07-01"),
            Some(&fixture.schemas),
            &Config::default(),
            &mut output,
        )
        .unwrap_err();

        assert!(matches!(
            err,
            crate::error::Error::Core(datever_core::Error::MissingKey { ref key, .. }) if key == "eyeColor"
        ));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_malformed_version_is_not_acceptable() {
        let fixture = Fixture::new();
        let input = fixture.payload(json!({"name": "Chewbacca"}));
        let (mut output, _) = json_writer();

        let err = handle_downgrade(
            fixture.args(input, "last tuesday"),
            Some(&fixture.schemas),
            &Config::default(),
            &mut output,
        )
        .unwrap_err();

        assert_eq!(err.exit_code(), 7);
    }
}
