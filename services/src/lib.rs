pub mod checkin;
pub mod decision;
pub mod error;
pub mod photo;
pub mod session;
pub mod sweep;
pub mod token;

pub use checkin::CheckInService;
pub use error::AttendanceError;
pub use session::SessionService;
pub use sweep::SweepService;
