pub mod dashboard;
pub mod email;
pub mod metrics;
pub mod points;
pub mod user_detail;
pub mod users;
