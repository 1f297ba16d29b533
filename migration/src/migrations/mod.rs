pub mod m202608200001_create_users;
pub mod m202608200002_create_classes;
pub mod m202608200003_create_user_class_roles;
pub mod m202608200004_create_class_sessions;
pub mod m202608200005_create_attendance_records;
