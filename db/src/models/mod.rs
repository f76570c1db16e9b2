pub mod attendance_record;
pub mod attendee;
pub mod qr_token;
pub mod schedule_session;
