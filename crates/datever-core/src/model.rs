//! Version-aware models
//!
//! A [`VersionedModel`] is built for one request/response cycle from a shared
//! [`Schema`] and a [`Context`]. It exposes three version-aware surfaces:
//!
//! - [`VersionedModel::fields`]: the canonical declarations with every active
//!   change unapplied, newest first;
//! - [`VersionedModel::data`]: the output payload. A bound instance is first
//!   serialized canonically, then downgraded, then every nested model in the
//!   result is resolved at the same version. Validated input is represented
//!   with the version's own fields;
//! - [`VersionedModel::updated_data`]: the output payload with every active
//!   change applied oldest first, giving the canonical shape of historical
//!   input.
//!
//! Resolution runs at most once per model and is cached. Rebinding the
//! context clears the cache.
//!
//! Copyright (c) 2025 Datever Team
//! Licensed under the Apache-2.0 license

use crate::changeset::ActiveChanges;
use crate::context::Context;
use crate::error::{Error, FieldErrors, Result};
use crate::field::{FieldSet, Payload};
use crate::schema::Schema;
use crate::version::VersionIdentifier;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const DATA_BEFORE_VALIDATION: &str = "When a model is bound to input data you must call \
`.is_valid()` before reading its `.data()` representation. Call `.is_valid()` first, \
or read `.initial_data()` instead.";

/// Where a model is in its resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing computed yet
    Unresolved,
    /// Version and fields are being computed
    Resolving,
    /// Version and version-specific fields are cached
    FieldsResolved,
    /// Output payload is cached as well
    DataResolved,
}

#[derive(Debug)]
struct Resolved {
    version: Option<VersionIdentifier>,
    fields: FieldSet,
    data: Option<Payload>,
}

#[derive(Debug)]
enum State {
    Unresolved,
    Resolving,
    Resolved(Resolved),
}

#[derive(Debug)]
enum Validation {
    NotRun,
    Done { validated: Payload, errors: FieldErrors },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    Instance,
    Data,
}

/// A schema bound to one request's context
#[derive(Debug)]
pub struct VersionedModel {
    schema: Arc<Schema>,
    context: Context,
    instance: Option<Value>,
    initial_data: Option<Value>,
    validation: Validation,
    state: State,
}

impl VersionedModel {
    /// A model with no context, instance or data
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            context: Context::new(),
            instance: None,
            initial_data: None,
            validation: Validation::NotRun,
            state: State::Unresolved,
        }
    }

    /// Bind a context
    pub fn with_context(mut self, context: Context) -> Self {
        self.set_context(context);
        self
    }

    /// Bind an instance to serialize
    pub fn with_instance(mut self, instance: Value) -> Self {
        self.instance = Some(instance);
        self.state = State::Unresolved;
        self
    }

    /// Bind any serializable value as the instance
    pub fn with_instance_of<T: Serialize>(self, instance: &T) -> Result<Self> {
        Ok(self.with_instance(serde_json::to_value(instance)?))
    }

    /// Bind raw input data written against the negotiated version
    pub fn with_data(mut self, data: Value) -> Self {
        self.initial_data = Some(data);
        self.validation = Validation::NotRun;
        self.state = State::Unresolved;
        self
    }

    /// Replace the context and drop everything computed for the old one
    pub fn set_context(&mut self, context: Context) {
        self.context = context;
        self.validation = Validation::NotRun;
        self.state = State::Unresolved;
    }

    /// Drop cached fields and data
    pub fn reset(&mut self) {
        self.state = State::Unresolved;
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn instance(&self) -> Option<&Value> {
        self.instance.as_ref()
    }

    pub fn initial_data(&self) -> Option<&Value> {
        self.initial_data.as_ref()
    }

    /// Current resolution status
    pub fn status(&self) -> Status {
        match &self.state {
            State::Unresolved => Status::Unresolved,
            State::Resolving => Status::Resolving,
            State::Resolved(Resolved { data: None, .. }) => Status::FieldsResolved,
            State::Resolved(Resolved { data: Some(_), .. }) => Status::DataResolved,
        }
    }

    /// The version this model resolves to
    pub fn version(&mut self) -> Result<Option<VersionIdentifier>> {
        self.resolve()?;
        Ok(self.resolved()?.version)
    }

    /// Changes newer than the bound version, newest first
    pub fn active_changes(&self) -> ActiveChanges<'_> {
        self.schema.changes().active_changes(self.context.version())
    }

    /// The field declarations valid at the bound version
    pub fn fields(&mut self) -> Result<&FieldSet> {
        self.resolve()?;
        Ok(&self.resolved()?.fields)
    }

    /// The output representation at the bound version
    pub fn data(&mut self) -> Result<&Payload> {
        if self.initial_data.is_some() && matches!(self.validation, Validation::NotRun) {
            return Err(Error::contract(DATA_BEFORE_VALIDATION));
        }

        self.resolve()?;
        if self.resolved()?.data.is_none() {
            let data = self.build_data()?;
            if let State::Resolved(resolved) = &mut self.state {
                resolved.data = Some(data);
            }
        }

        match &self.state {
            State::Resolved(Resolved { data: Some(data), .. }) => Ok(data),
            _ => Err(Error::contract("model output was not resolved")),
        }
    }

    /// Consume the model and return its output representation
    pub fn into_data(mut self) -> Result<Payload> {
        self.data()?;
        match self.state {
            State::Resolved(Resolved { data: Some(data), .. }) => Ok(data),
            _ => Err(Error::contract("model output was not resolved")),
        }
    }

    /// The output representation upgraded to the canonical shape
    ///
    /// Nested values are upgraded through their own schema's changes at the
    /// same version before the parent's changes run.
    pub fn updated_data(&mut self) -> Result<Payload> {
        let data = self.data()?.clone();
        let resolved = self.resolved()?;
        upgrade(&self.schema, &resolved.fields, resolved.version, data)
    }

    /// Validate bound input against the version's fields
    ///
    /// Returns `Ok(false)` when the input is rejected; the reasons are
    /// available from [`VersionedModel::errors`]. Configuration problems
    /// found along the way are returned as errors.
    pub fn is_valid(&mut self) -> Result<bool> {
        let Some(raw) = self.initial_data.clone() else {
            return Err(Error::contract(
                "Cannot call `.is_valid()` as no input data was bound to the model.",
            ));
        };

        if let Validation::Done { errors, .. } = &self.validation {
            return Ok(errors.is_empty());
        }

        self.resolve()?;
        let fields = self.resolved()?.fields.clone();
        let (validated, errors) = validate_against(&fields, &raw, &self.context)?;
        let valid = errors.is_empty();

        tracing::debug!(
            schema = %self.schema.name(),
            valid,
            errors = errors.len(),
            "validated input"
        );

        self.validation = Validation::Done {
            validated: if valid { validated } else { Payload::new() },
            errors,
        };
        if let State::Resolved(resolved) = &mut self.state {
            resolved.data = None;
        }
        Ok(valid)
    }

    /// Validate and fail with [`Error::Invalid`] on rejected input
    pub fn validate(&mut self) -> Result<&Payload> {
        if !self.is_valid()? {
            return Err(Error::Invalid {
                errors: self.errors()?.clone(),
            });
        }
        self.validated_data()
    }

    /// Data accepted by validation, in internal form
    pub fn validated_data(&self) -> Result<&Payload> {
        match &self.validation {
            Validation::NotRun => Err(Error::contract(
                "You must call `.is_valid()` before accessing `.validated_data()`.",
            )),
            Validation::Done { errors, .. } if !errors.is_empty() => Err(Error::Invalid {
                errors: errors.clone(),
            }),
            Validation::Done { validated, .. } => Ok(validated),
        }
    }

    /// Validation errors, empty when the input was accepted
    pub fn errors(&self) -> Result<&FieldErrors> {
        match &self.validation {
            Validation::NotRun => Err(Error::contract(
                "You must call `.is_valid()` before accessing `.errors()`.",
            )),
            Validation::Done { errors, .. } => Ok(errors),
        }
    }

    /// Render the version's field declarations
    ///
    /// ```text
    /// PersonSerializer(version='2018-08-01'):
    ///     name = CharField()
    ///     homeworld = HomeworldSerializer():
    ///         name = CharField()
    /// ```
    pub fn render(&mut self) -> Result<String> {
        let version = self.version()?;
        let mut out = match version {
            Some(version) => format!("{}(version='{}'):", self.schema.name(), version),
            None => format!("{}():", self.schema.name()),
        };
        let fields = self.fields()?.clone();
        render_fields(&mut out, &fields, &self.context, 1)?;
        Ok(out)
    }

    fn resolved(&self) -> Result<&Resolved> {
        match &self.state {
            State::Resolved(resolved) => Ok(resolved),
            _ => Err(Error::contract("model fields were not resolved")),
        }
    }

    fn resolve(&mut self) -> Result<()> {
        match self.state {
            State::Resolved(_) => return Ok(()),
            State::Resolving => {
                return Err(Error::contract("model resolution re-entered while resolving"));
            }
            State::Unresolved => {}
        }

        self.state = State::Resolving;
        let version = self.context.version();
        let fields = self
            .schema
            .changes()
            .active_changes(version)
            .downgrade_fields(self.schema.fields().clone());

        match fields {
            Ok(fields) => {
                tracing::debug!(
                    schema = %self.schema.name(),
                    version = ?version.map(|v| v.to_string()),
                    fields = fields.len(),
                    "resolved fields"
                );
                self.state = State::Resolved(Resolved {
                    version,
                    fields,
                    data: None,
                });
                Ok(())
            }
            Err(e) => {
                self.state = State::Unresolved;
                Err(e)
            }
        }
    }

    fn has_errors(&self) -> bool {
        matches!(&self.validation, Validation::Done { errors, .. } if !errors.is_empty())
    }

    fn build_data(&self) -> Result<Payload> {
        let fields = &self.resolved()?.fields;

        if let (Some(instance), false) = (&self.instance, self.has_errors()) {
            let canonical = self.schema.to_representation(instance)?;
            let downgraded = self.active_changes().downgrade_payload(canonical)?;
            return self.resolve_nested(fields, downgraded);
        }

        match &self.validation {
            Validation::Done { validated, errors } if errors.is_empty() => {
                let mut payload = Payload::new();
                for (name, field) in fields.iter() {
                    let Some(value) = validated.get(name) else {
                        continue;
                    };
                    let value = match field.nested_schema() {
                        Some((schema, many)) => {
                            self.nested_output(schema, many, value, Binding::Data)?
                        }
                        None => field.to_representation(name, value)?,
                    };
                    payload.insert(name.to_string(), value);
                }
                Ok(payload)
            }
            Validation::Done { .. } => {
                let initial = self.initial_data.as_ref().and_then(Value::as_object);
                Ok(fields
                    .names()
                    .filter_map(|name| {
                        initial
                            .and_then(|raw| raw.get(name))
                            .map(|value| (name.to_string(), value.clone()))
                    })
                    .collect())
            }
            Validation::NotRun => Ok(fields
                .names()
                .map(|name| (name.to_string(), Value::Null))
                .collect()),
        }
    }

    // Nested models are resolved after the parent's own changes, at the
    // parent's version.
    fn resolve_nested(&self, fields: &FieldSet, mut payload: Payload) -> Result<Payload> {
        for (key, value) in payload.iter_mut() {
            let Some((schema, many)) = fields.get(key).and_then(|field| field.nested_schema()) else {
                continue;
            };
            *value = self.nested_output(schema, many, value, Binding::Instance)?;
        }
        Ok(payload)
    }

    fn nested_output(
        &self,
        schema: &Arc<Schema>,
        many: bool,
        value: &Value,
        binding: Binding,
    ) -> Result<Value> {
        match (value, many) {
            (Value::Array(items), true) => items
                .iter()
                .map(|item| self.nested_one(schema, item, binding))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            (Value::Object(_), false) => self.nested_one(schema, value, binding),
            _ => Ok(value.clone()),
        }
    }

    fn nested_one(&self, schema: &Arc<Schema>, value: &Value, binding: Binding) -> Result<Value> {
        let nested = VersionedModel::new(Arc::clone(schema)).with_context(self.context.clone());
        let nested = match binding {
            Binding::Instance => nested.with_instance(value.clone()),
            Binding::Data => {
                let mut nested = nested.with_data(value.clone());
                nested.validate()?;
                nested
            }
        };
        nested.into_data().map(Value::Object)
    }
}

fn validate_against(
    fields: &FieldSet,
    raw: &Value,
    context: &Context,
) -> Result<(Payload, FieldErrors)> {
    let mut validated = Payload::new();
    let mut errors = FieldErrors::new();

    let Value::Object(input) = raw else {
        errors.insert(
            "non_field_errors".to_string(),
            vec!["Invalid data. Expected a dictionary.".to_string()],
        );
        return Ok((validated, errors));
    };

    for (name, field) in fields.iter() {
        let Some(value) = input.get(name) else {
            if field.is_required() {
                errors
                    .entry(name.to_string())
                    .or_default()
                    .push("This field is required.".to_string());
            }
            continue;
        };

        let internal = match field.to_internal_value(name, value) {
            Ok(internal) => internal,
            Err(Error::FieldConversion { message, .. }) => {
                errors.entry(name.to_string()).or_default().push(message);
                continue;
            }
            Err(e) => return Err(e),
        };

        let internal = match (field.nested_schema(), &internal) {
            (Some((schema, false)), Value::Object(_)) => {
                validate_nested(schema, &internal, context, name, &mut errors)?
            }
            (Some((schema, true)), Value::Array(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let prefix = format!("{}[{}]", name, index);
                    out.push(validate_nested(schema, item, context, &prefix, &mut errors)?);
                }
                Value::Array(out)
            }
            _ => internal,
        };
        validated.insert(name.to_string(), internal);
    }

    Ok((validated, errors))
}

fn validate_nested(
    schema: &Arc<Schema>,
    value: &Value,
    context: &Context,
    prefix: &str,
    errors: &mut FieldErrors,
) -> Result<Value> {
    let mut nested = VersionedModel::new(Arc::clone(schema))
        .with_context(context.clone())
        .with_data(value.clone());
    if nested.is_valid()? {
        return nested.validated_data().cloned().map(Value::Object);
    }
    for (field, messages) in nested.errors()? {
        errors
            .entry(format!("{}.{}", prefix, field))
            .or_default()
            .extend(messages.iter().cloned());
    }
    Ok(Value::Null)
}

// `fields` are the declarations at `version`, so payload keys still match them.
fn upgrade(
    schema: &Schema,
    fields: &FieldSet,
    version: Option<VersionIdentifier>,
    mut payload: Payload,
) -> Result<Payload> {
    for (key, value) in payload.iter_mut() {
        let Some((nested, many)) = fields.get(key).and_then(|field| field.nested_schema()) else {
            continue;
        };
        *value = match (std::mem::take(value), many) {
            (Value::Array(items), true) => items
                .into_iter()
                .map(|item| upgrade_nested(nested, version, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array)?,
            (item, _) => upgrade_nested(nested, version, item)?,
        };
    }
    schema.changes().active_changes(version).upgrade_payload(payload)
}

fn upgrade_nested(schema: &Schema, version: Option<VersionIdentifier>, value: Value) -> Result<Value> {
    let Value::Object(payload) = value else {
        return Ok(value);
    };
    let fields = schema
        .changes()
        .active_changes(version)
        .downgrade_fields(schema.fields().clone())?;
    upgrade(schema, &fields, version, payload).map(Value::Object)
}

fn render_fields(out: &mut String, fields: &FieldSet, context: &Context, depth: usize) -> Result<()> {
    let indent = "    ".repeat(depth);
    for (name, field) in fields.iter() {
        match field.nested_schema() {
            Some((schema, _)) => {
                out.push_str(&format!("\n{}{} = {}:", indent, name, field));
                let mut nested = VersionedModel::new(Arc::clone(schema)).with_context(context.clone());
                let nested_fields = nested.fields()?;
                render_fields(out, nested_fields, context, depth + 1)?;
            }
            None => {
                out.push_str(&format!("\n{}{} = {}", indent, name, field));
            }
        }
    }
    Ok(())
}
