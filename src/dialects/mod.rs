//! Concrete code-emission dialects.
//!
//! Every dialect produces semantically identical layout code; only the
//! surface syntax differs. The hierarchy builder never branches on which
//! dialect is active except through [`Dialect::tag`].

mod csharp;
mod javascript;

pub use csharp::CSharpDialect;
pub use javascript::JavascriptDialect;
