pub mod batch;
pub mod create;
pub mod list;
pub mod record;
pub mod utils;

pub use batch::delete as batch_delete;
pub use create::create as address_create;
pub use list::list as address_list;
pub use record::{delete as address_delete, get as address_get, patch as address_patch};
