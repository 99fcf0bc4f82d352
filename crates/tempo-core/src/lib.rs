pub mod dates;
pub mod errors;
pub mod ids;
pub mod status;

pub use status::PlaylistStatus;
