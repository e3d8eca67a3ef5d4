//! HTTP implementations of the alertbridge collaborator traits.

pub mod alpaca;
pub mod prom;
pub mod slack;

pub use alpaca::AlpacaClient;
pub use prom::PrometheusPnl;
pub use slack::SlackNotifier;
