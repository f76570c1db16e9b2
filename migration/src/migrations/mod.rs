pub mod m202601050001_create_attendees;
pub mod m202601050002_create_schedule_sessions;
pub mod m202601050003_create_qr_tokens;
pub mod m202601050004_create_attendance_records;
