//! Interactive parameter parsing and validation.
//!
//! Providers declare interactive parameters inline in their result. Each
//! declaration is checked against an embedded JSON Schema and then
//! normalized into a typed [`ParameterDescriptor`].

mod parser;
mod schema;

pub use parser::{
    is_identifier, parse_descriptor, parse_interactive, ParamOptions, ParameterDescriptor,
    ValidationError,
};
pub use schema::{is_valid_descriptor, validate_descriptor_schema, SchemaError, SchemaViolation};
