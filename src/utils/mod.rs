pub mod crypto;
pub mod keyed_lock;
pub mod links;
pub mod signing;
pub mod time;
pub mod token;
pub mod validation;
