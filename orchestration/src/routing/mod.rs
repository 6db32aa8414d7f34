//! Event routing
//!
//! Maps inbound business events to agent personas:
//! - Classification: longest-prefix match over the event type.
//! - Availability: per-agent circuit breakers with a fallback ladder that
//!   always terminates at the orchestrator.
//!
//! ```text
//! Event type          | Primary   | Secondaries
//! --------------------|-----------|-------------
//! lead.*              | Nyra      | Zevi
//! booking.*, order.*  | Solari    | Ruvo / Zevi
//! task.*              | Ruvo      | -
//! campaign.*          | Liora     | Zevi
//! community.*, member | Sage      | Liora
//! content.*           | Elan      | -
//! analytics.*         | Zevi      | -
//! knowledge.*, query  | Atlas     | -
//! (unmatched)         | Grace     | -
//! ```

pub mod circuit_breaker;
pub mod rules;

pub use circuit_breaker::{CircuitBreaker, CircuitState, FallbackLadder};
pub use rules::{RouteDecision, RouteRule, RoutingTable};
