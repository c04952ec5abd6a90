pub mod corner;
pub mod pairing;

pub use corner::{CornerService, Placement};
pub use pairing::PairingService;
