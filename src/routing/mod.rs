//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path, headers) + ProxyState snapshot
//!     → resolver.rs (forbidden-path check)
//!     → flag.rs (feature-flag predicate, aggregator selection)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: InterceptDecision (Forward | ShortCircuit)
//! ```
//!
//! # Design Decisions
//! - Policies compiled from config, immutable at runtime (swapped whole on reload)
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always yields the same decision
//! - The decision is a value threaded through the pipeline, never a header

pub mod flag;
pub mod matcher;
pub mod resolver;
pub mod target;

pub use flag::{FlagPolicy, RouteChoice, SelectionStrategy};
pub use matcher::RequestMeta;
pub use resolver::{InterceptDecision, InterceptPolicy, Resolver, RouteKind, SyntheticResponse};
pub use target::{ProxyTarget, TargetError};
