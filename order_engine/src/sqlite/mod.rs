mod orders;
mod store;

pub use store::SqliteOrderStore;
