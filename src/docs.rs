use crate::model::{
    attendance::{AttendanceEntry, AttendanceStatus},
    school_class::{ClassAttendanceSummary, SchoolClass},
    student::{Student, StudentInput, StudentStatus, StudentWithClass},
    subject::Subject,
};
use crate::service::{
    catalogue::{CatalogueOptions, SessionForm},
    dashboard::{AdminDashboard, AdminStats, TeacherDashboard, TeacherStats},
    listing::{AttendanceIndex, AttendanceQuery},
    pagination::{AttendancePage, StudentPage},
    recorder::{RecordOutcome, RecordSession, StudentMark},
    records::UpdateAttendance,
    roster::RosterEntry,
    students::{StudentDetail, StudentIndex},
};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Attendance API",
        version = "1.0.0",
        description = r#"
## School Attendance Service

Records per-session attendance for classes and subjects and reports on it.

### Key Features
- **Attendance**
  - Record a whole class session in one request (idempotent per student, subject, class and date)
  - Paginated listing with date, class and subject filters
  - View, correct or delete single records
- **Dashboard**
  - School-wide figures for admins, own figures for teachers
- **Students**
  - Search, create, update and remove student records

### Security
Every endpoint except `/health` requires a **JWT Bearer** token.
Teachers only see attendance they recorded; student writes and deletes are **Admin** only.
"#,
    ),
    paths(
        crate::api::health::health,
        crate::api::dashboard::show,
        crate::api::catalogue::options,

        crate::api::attendance::index,
        crate::api::attendance::session_form,
        crate::api::attendance::record,
        crate::api::attendance::show,
        crate::api::attendance::update,
        crate::api::attendance::destroy,

        crate::api::students::index,
        crate::api::students::create,
        crate::api::students::show,
        crate::api::students::update,
        crate::api::students::destroy
    ),
    components(
        schemas(
            AttendanceStatus,
            AttendanceEntry,
            AttendancePage,
            AttendanceIndex,
            AttendanceQuery,
            RecordSession,
            StudentMark,
            RecordOutcome,
            UpdateAttendance,
            SessionForm,
            RosterEntry,
            CatalogueOptions,
            SchoolClass,
            Subject,
            ClassAttendanceSummary,
            AdminStats,
            AdminDashboard,
            TeacherStats,
            TeacherDashboard,
            StudentStatus,
            Student,
            StudentWithClass,
            StudentInput,
            StudentPage,
            StudentIndex,
            StudentDetail
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Session recording and attendance records"),
        (name = "Dashboard", description = "Role-specific statistics"),
        (name = "Student", description = "Student registry"),
        (name = "Catalogue", description = "Class and subject options"),
        (name = "Health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
