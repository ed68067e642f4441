//! Generates strongly-typed hub client stubs from interface contracts.
//!
//! Pipeline: [`host`] metadata → [`extract`]/[`lower`] → [`model::StubModel`]
//! → [`validate`] → [`codegen`] → [`render`], orchestrated by [`driver`].
pub mod cli;
pub mod codegen;
pub mod driver;
pub mod error;
pub mod extract;
pub mod host;
pub mod lower;
pub mod model;
pub mod path_de;
pub mod render;
pub mod syntax;
pub mod validate;

pub use codegen::{BuildInfo, Codegen, CodegenConfig, TransportConfig};
pub use driver::{Artifact, ArtifactStatus, Diagnostic, Driver, DriverConfig, GenerationOutput, NameCheck};
pub use error::{EmitError, Error, ValidationError};
pub use host::Compilation;
pub use model::StubModel;
