pub mod index;
pub mod locate;
pub mod lookup;
