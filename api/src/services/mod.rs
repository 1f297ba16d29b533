pub mod absence;
pub mod email;
