pub mod changes;
pub mod cloudinary;
pub mod db;
pub mod memory;

pub use changes::ChangeFeed;
pub use cloudinary::CloudinaryAdapter;
pub use db::DbAdapter;
pub use memory::InMemoryStore;
