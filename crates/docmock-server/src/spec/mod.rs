//! API specifications: the in-memory model, the RAML and Swagger/OpenAPI
//! parsers, and the sources a specification can be loaded from.

mod model;
mod parser;
mod raml;
mod source;
mod swagger;

pub use model::{
    ApiSpecification, ExampleResponse, HttpMethod, OperationDescriptor, Parameter, ParameterLocation,
    PathItem,
};
pub use parser::{parse_document, SpecFormat};
pub use source::{ApiResource, DeclaredSpec, FileSpec, SpecSource, UrlSpec};
