pub mod course;
pub mod payment;
pub mod student;

pub use course::{Course, EnrolledCourse, Enrollment, NewEnrollmentRequest, ProrationPreview, ProrationQuery};
pub use payment::{NewPayment, Payment, PaymentKind, PaymentStatus};
pub use student::{DeactivateRequest, FirstClassDateRequest, LastClassDateRequest, Student, StudentStatus};
