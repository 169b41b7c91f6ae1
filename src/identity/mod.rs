// Identity module - account addresses

mod address;

pub use address::{Address, AddressError};
