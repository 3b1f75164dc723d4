use serde::Serialize;
use utoipa::ToSchema;

use crate::model::{attendance::AttendanceEntry, student::StudentWithClass};

pub const ATTENDANCE_PAGE_SIZE: u32 = 20;
pub const STUDENT_PAGE_SIZE: u32 = 15;

/// A 1-based page of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: Option<u32>, per_page: u32) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn limit(&self) -> u64 {
        self.per_page as u64
    }

    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.per_page as u64
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[aliases(AttendancePage = Page<AttendanceEntry>, StudentPage = Page<StudentWithClass>)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 45)]
    pub total: u64,
    #[schema(example = 3)]
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, request: PageRequest, total: u64) -> Self {
        let per_page = request.per_page as u64;
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            data,
            page: request.page,
            per_page: request.per_page,
            total,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        }
    }
}
