//! Built-in operators.

mod combiner;
mod data_fetcher;
mod echo;
mod enumerator;
mod event_fetcher;

pub use combiner::CombinerOperator;
pub use data_fetcher::DataFetcherOperator;
pub use echo::EchoOperator;
pub use enumerator::EnumeratorOperator;
pub use event_fetcher::EventFetcherOperator;
