pub mod activity;
pub mod class;
pub mod enrollment;
pub mod payment;
pub mod schedule;
pub mod settings;
pub mod student;
pub mod user;

pub use activity::{Activity, ActivityStatus, ActivityView, Feedback, Registration, RegistrationStatus};
pub use class::{ClassRoom, ClassView, Grade};
pub use enrollment::{ApplicationStatus, EnrollmentApplication, EnrollmentPlan};
pub use payment::{Payment, PaymentMethod};
pub use schedule::ScheduleEntry;
pub use settings::SystemSettings;
pub use student::{Gender, Student, StudentStatus};
pub use user::User;
