//! Stepglue core library.
//!
//! Glue for BDD step definitions: `%expression%` placeholders in scenario
//! text are resolved against named entity lookup tables, global variables and
//! date and file helpers, and the resolved values feed reusable entity, JSON
//! API and email assertions.
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use stepglue::{
//!     config::StepsConfig, expression::ExpressionEnvironment, lookup::LookupTable,
//!     placeholder, repository::MemoryRepository,
//! };
//!
//! let users = MemoryRepository::new("users")
//!     .with_record(json!({ "id": 1, "email": "a@example.com" }))
//!     .with_record(json!({ "id": 2, "email": "b@example.com" }));
//! let mut env = ExpressionEnvironment::new(&StepsConfig::new());
//! env.add_table("users", LookupTable::new(Arc::new(users), "email"));
//!
//! let text = placeholder::resolve("GET /users/%users.last.id%", &env).expect("resolves");
//! assert_eq!(text, "GET /users/2");
//! ```

pub mod accessor;
pub mod cli;
pub mod config;
pub mod debug;
pub mod expression;
pub mod fixtures;
pub mod lookup;
pub mod payload;
pub mod placeholder;
pub mod record;
pub mod repository;
pub mod runner;
pub mod selectors;
pub mod steps;
