pub mod attendance_record;
pub mod class;
pub mod class_session;
pub mod user;
pub mod user_class_role;
