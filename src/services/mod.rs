pub mod lookup;
pub mod value_fetcher;

pub use lookup::{HttpValueLookup, StaticValueLookup, ValueLookup};
pub use value_fetcher::{FetchCompletion, FetchContext, FilterValueFetcher};
