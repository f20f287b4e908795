pub mod memory;
pub mod pool;
pub mod postgres;
pub mod store;

pub use memory::MemoryApplicationStore;
pub use postgres::PgApplicationStore;
pub use store::{
    ApplicationFilter, ApplicationListing, ApplicationStore, SortField, SortOrder, SortSpec,
};
