pub mod store;

pub use store::{ApplicationStore, InMemoryApplicationStore, StoreError};
