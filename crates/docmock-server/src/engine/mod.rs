//! Stub engine: holds the published rules and answers concrete requests.
//!
//! ## Module Structure
//!
//! - `request` - Incoming request model and probe construction
//! - `table` - Priority-ordered rule table
//! - `response` - Rendering of matched rules into HTTP answers
//! - `server` - HTTP listener serving a rule table

mod request;
mod response;
mod server;
mod table;

pub use request::IncomingRequest;
pub use response::{RenderedResponse, ResponseRenderer};
pub use server::HttpStubEngine;
pub use table::StubTable;

use crate::stub::StubRule;

/// The rule store the lifecycle controller publishes to.
///
/// Rules with a lower priority value are consulted first. Generated rules
/// (examples and fallbacks) are consulted by URL specificity before priority.
/// Among remaining ties the rule with more constraints wins, then the most
/// recently added one.
pub trait StubEngine: Send + Sync {
    fn add_rule(&self, rule: StubRule);

    /// Add several rules at once. Requests see all of them or none.
    fn add_rules(&self, rules: Vec<StubRule>);

    /// Drop every rule and install `rules` in a single step.
    fn replace_rules(&self, rules: Vec<StubRule>);

    /// Installed rules in match order.
    fn rules(&self) -> Vec<StubRule>;

    /// First rule answering `request`.
    fn find_rule(&self, request: &IncomingRequest) -> Option<StubRule>;

    /// Stop serving. Calling it more than once has no further effect.
    fn shutdown(&self);

    fn reset(&self) {
        self.replace_rules(Vec::new());
    }
}
