//! Synthesizes the NovaMuse quotes API into a CloudFormation template.
//!
//! The stack is declared in dependency order: the quotes table, the three
//! request handlers with their table grants, the Cognito user pool, the REST
//! gateway and, in the custom-domain revision, the domain mapping and DNS
//! alias.

pub mod api;
pub mod assembly;
pub mod asset;
pub mod compute;
pub mod edge;
pub mod env;
pub mod error;
pub mod identity;
pub mod resources;
pub mod stack;
pub mod storage;
pub mod template;

pub use env::{Revision, StackEnv};
pub use error::SynthError;
pub use stack::{NovaMuseStack, StackProps, STACK_NAME};
pub use template::{Expr, Template};
