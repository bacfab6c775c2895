pub mod account;
pub mod blacklist;
pub mod character;
pub mod house;
