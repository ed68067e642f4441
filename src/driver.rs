//! Generation pass: discover marked classes, build models, emit sources.
//!
//! A [`Driver`] keeps a [`GenerationCache`] between passes. A declaration whose
//! model is structurally equal to last pass's reuses the stored text, so
//! unrelated edits to the compilation cost a model rebuild but no emission.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::codegen::{Codegen, CodegenConfig};
use crate::error::{EmitError, Error, ValidationError};
use crate::host::{Compilation, TypeKind};
use crate::lower::{Declaration, lower_to_model};
use crate::model::StubModel;
use crate::validate;

pub const DEFAULT_MARKER: &str = "HubStubs.GenerateHubClientAttribute";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NameCheck {
    /// Run the name checks and skip declarations that fail them.
    #[default]
    Enforce,
    /// Emit whatever the model says, clashes included.
    Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    /// Qualified metadata name of the marker attribute.
    pub marker: String,
    pub codegen: CodegenConfig,
    pub name_check: NameCheck,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            codegen: CodegenConfig::default(),
            name_check: NameCheck::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Generated,
    Cached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub hint_name: String,
    pub source: Arc<str>,
    pub status: ArtifactStatus,
}

/// A declaration that produced no artifact, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Qualified name of the annotated class.
    pub declaration: String,
    pub error: ValidationError,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationOutput {
    /// The marker attribute first, then one artifact per accepted declaration
    /// in discovery order.
    pub artifacts: Vec<Artifact>,
    pub diagnostics: Vec<Diagnostic>,
}

impl GenerationOutput {
    pub fn artifact(&self, hint_name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.hint_name == hint_name)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    model: StubModel,
    source: Arc<str>,
}

/// Hint name → last emitted model and its text.
#[derive(Debug, Clone, Default)]
pub struct GenerationCache {
    entries: HashMap<String, CacheEntry>,
}

impl GenerationCache {
    /// Stored text for `hint_name`, only if it was emitted from an equal model.
    pub fn lookup(&self, hint_name: &str, model: &StubModel) -> Option<Arc<str>> {
        self.entries
            .get(hint_name)
            .filter(|entry| entry.model == *model)
            .map(|entry| Arc::clone(&entry.source))
    }

    pub fn store(&mut self, hint_name: String, model: StubModel, source: Arc<str>) {
        self.entries.insert(hint_name, CacheEntry { model, source });
    }

    /// Drop every entry not named in `live`.
    pub fn evict_except(&mut self, live: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|hint, _| live.contains(hint));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct Driver {
    config: DriverConfig,
    codegen: Codegen,
    cache: GenerationCache,
    marker: Option<Arc<str>>,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        let codegen = Codegen::new(config.codegen.clone());
        Self { config, codegen, cache: GenerationCache::default(), marker: None }
    }

    pub fn cache(&self) -> &GenerationCache {
        &self.cache
    }

    /// Name of the artifact declaring the marker attribute.
    pub fn marker_hint_name(&self) -> String {
        let name = self.config.marker.rsplit('.').next().unwrap_or(&self.config.marker);
        format!("{name}.g.cs")
    }

    /// Classes carrying the marker, in compilation order.
    pub fn discover<'a>(&self, compilation: &'a Compilation) -> Vec<Declaration<'a>> {
        compilation
            .types
            .iter()
            .filter_map(|symbol| {
                let marker = symbol.attribute(&self.config.marker)?;
                if symbol.kind != TypeKind::Class {
                    debug!("skipping `{}`: marker on a {:?}, not a class", symbol.qualified_name(), symbol.kind);
                    return None;
                }
                Some(Declaration { symbol, marker })
            })
            .collect()
    }

    /// Models for every discovered declaration, without validation or emission.
    pub fn models(&self, compilation: &Compilation) -> Vec<StubModel> {
        let symbols = compilation.symbols();
        self.discover(compilation)
            .par_iter()
            .map(|decl| lower_to_model(decl, &symbols))
            .collect()
    }

    pub fn run(&mut self, compilation: &Compilation) -> Result<GenerationOutput, Error> {
        let symbols = compilation.symbols();
        let declarations = self.discover(compilation);
        let models: Vec<StubModel> = declarations
            .par_iter()
            .map(|decl| lower_to_model(decl, &symbols))
            .collect();

        let mut output = GenerationOutput::default();
        output.artifacts.push(self.marker_artifact()?);

        let mut claimed = HashSet::new();
        let mut accepted = Vec::with_capacity(models.len());
        for (decl, model) in declarations.iter().zip(models) {
            let declaration = decl.symbol.qualified_name();
            let hint_name = model.hint_name();
            if claimed.contains(&hint_name) {
                output.diagnostics.push(Diagnostic {
                    declaration,
                    error: ValidationError::DuplicateArtifact { hint_name },
                });
                continue;
            }
            if self.config.name_check == NameCheck::Enforce {
                if let Err(errors) = validate::check(&model) {
                    output.diagnostics.extend(errors.into_iter().map(|error| Diagnostic {
                        declaration: declaration.clone(),
                        error,
                    }));
                    continue;
                }
            }
            claimed.insert(hint_name.clone());
            accepted.push((hint_name, model));
        }
        for diagnostic in &output.diagnostics {
            warn!("{}: {}", diagnostic.declaration, diagnostic.error);
        }

        let cache = &self.cache;
        let codegen = &self.codegen;
        let emitted = accepted
            .into_par_iter()
            .map(|(hint_name, model)| -> Result<_, EmitError> {
                match cache.lookup(&hint_name, &model) {
                    Some(source) => Ok((hint_name, model, source, ArtifactStatus::Cached)),
                    None => {
                        let source: Arc<str> = codegen.emit(&model)?.into();
                        Ok((hint_name, model, source, ArtifactStatus::Generated))
                    }
                }
            })
            .collect::<Result<Vec<_>, EmitError>>()?;

        let mut generated = 0;
        for (hint_name, model, source, status) in emitted {
            if status == ArtifactStatus::Generated {
                generated += 1;
                self.cache.store(hint_name.clone(), model, Arc::clone(&source));
            }
            output.artifacts.push(Artifact { hint_name, source, status });
        }
        let evicted = self.cache.evict_except(&claimed);
        info!(
            "{} declaration(s): {} generated, {} cached, {} diagnostic(s), {} evicted",
            declarations.len(),
            generated,
            output.artifacts.len() - 1 - generated,
            output.diagnostics.len(),
            evicted,
        );
        Ok(output)
    }

    fn marker_artifact(&mut self) -> Result<Artifact, EmitError> {
        let hint_name = self.marker_hint_name();
        if let Some(source) = &self.marker {
            return Ok(Artifact { hint_name, source: Arc::clone(source), status: ArtifactStatus::Cached });
        }
        let source: Arc<str> = self.codegen.marker_attribute(&self.config.marker)?.into();
        self.marker = Some(Arc::clone(&source));
        Ok(Artifact { hint_name, source, status: ArtifactStatus::Generated })
    }
}
