// handlers/mod.rs - endpoint dispatch
//
// A request flows context → route → engine → executors:
// context builds the RequestContext (effective method, token, segments),
// route maps the URL onto a built-in endpoint and table,
// engine runs the shared steps (settings, gate, authorization, hooks),
// executors hold one routine per built-in endpoint.
pub mod context;
pub mod engine;
pub mod executors;
pub mod route;

pub use context::RequestContext;
pub use route::RouteMatch;
