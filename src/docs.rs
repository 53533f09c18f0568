use crate::api::attendance::{CheckPayload, CheckResponse, HistoryFilter, HistoryResponse};
use crate::api::leave::{CreateLeave, LeaveFilter, LeaveListResponse};
use crate::api::office::CreateOffice;
use crate::api::qr::MintQr;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, ValidationMethod};
use crate::model::leave::{LeaveBalance, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::office::OfficeLocation;
use crate::model::qr_token::QrToken;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Management API",
        version = "1.0.0",
        description = r#"
## Attendance Management System

Geofenced and QR-validated attendance tracking for an employee workforce.

### Key Features
- **Check-in / Check-out**
  - Location-validated (office geofence) or QR-token-validated
  - Lateness and early-departure detection against configured working hours
- **Leave Management**
  - Balance-aware requests: submitting reserves units, approval commits them
- **Daily Reconciliation**
  - End-of-day sweep marks absentees, closes dangling sessions
- **Office & QR Administration**
  - HR mints per-office QR tokens with configurable expiry

### Security
All endpoints require **JWT Bearer authentication** issued by the
organization's auth service. HR/Admin roles gate administrative routes.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::history,

        crate::api::leave::leave_list,
        crate::api::leave::get_leave,
        crate::api::leave::create_leave,
        crate::api::leave::approve_leave,
        crate::api::leave::reject_leave,
        crate::api::leave::cancel_leave,
        crate::api::leave::leave_balance,

        crate::api::qr::mint,
        crate::api::qr::deactivate,
        crate::api::qr::list_active,

        crate::api::office::create_office,
        crate::api::office::list_offices
    ),
    components(
        schemas(
            CheckPayload,
            CheckResponse,
            HistoryFilter,
            HistoryResponse,
            AttendanceRecord,
            AttendanceStatus,
            ValidationMethod,
            CreateLeave,
            LeaveFilter,
            LeaveListResponse,
            LeaveRequest,
            LeaveBalance,
            LeaveType,
            LeaveStatus,
            MintQr,
            QrToken,
            CreateOffice,
            OfficeLocation
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in/out lifecycle APIs"),
        (name = "Leave", description = "Leave requests and balance ledger APIs"),
        (name = "QR", description = "QR token administration APIs"),
        (name = "Office", description = "Office boundary administration APIs"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
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
}
