/// Plain CRUD collections the admin, teacher and student screens read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Students,
    Teachers,
    Attendance,
    AttendanceSessions,
    Subjects,
    LibraryBooks,
    LibraryIssues,
    LibraryFines,
    Notes,
    NoteCategories,
    Notices,
    NoticeCategories,
    AcademicYears,
    Semesters,
    Exams,
    Hostels,
    HostelRooms,
    HostelAllocations,
    Users,
}

impl Resource {
    pub const ALL: [Resource; 19] = [
        Resource::Students,
        Resource::Teachers,
        Resource::Attendance,
        Resource::AttendanceSessions,
        Resource::Subjects,
        Resource::LibraryBooks,
        Resource::LibraryIssues,
        Resource::LibraryFines,
        Resource::Notes,
        Resource::NoteCategories,
        Resource::Notices,
        Resource::NoticeCategories,
        Resource::AcademicYears,
        Resource::Semesters,
        Resource::Exams,
        Resource::Hostels,
        Resource::HostelRooms,
        Resource::HostelAllocations,
        Resource::Users,
    ];

    pub fn parse(raw: &str) -> Option<Resource> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', '.'], "_");
        Resource::ALL.into_iter().find(|r| r.name() == key)
    }

    pub fn name(self) -> &'static str {
        match self {
            Resource::Students => "students",
            Resource::Teachers => "teachers",
            Resource::Attendance => "attendance",
            Resource::AttendanceSessions => "attendance_sessions",
            Resource::Subjects => "subjects",
            Resource::LibraryBooks => "library_books",
            Resource::LibraryIssues => "library_issues",
            Resource::LibraryFines => "library_fines",
            Resource::Notes => "notes",
            Resource::NoteCategories => "note_categories",
            Resource::Notices => "notices",
            Resource::NoticeCategories => "notice_categories",
            Resource::AcademicYears => "academic_years",
            Resource::Semesters => "semesters",
            Resource::Exams => "exams",
            Resource::Hostels => "hostels",
            Resource::HostelRooms => "hostel_rooms",
            Resource::HostelAllocations => "hostel_allocations",
            Resource::Users => "users",
        }
    }

    /// Collection path relative to the API base.
    pub fn path(self) -> &'static str {
        match self {
            Resource::Students => "/students/",
            Resource::Teachers => "/teachers/",
            Resource::Attendance => "/attendance/",
            Resource::AttendanceSessions => "/attendance/sessions/",
            Resource::Subjects => "/attendance/subjects/",
            Resource::LibraryBooks => "/library/books/",
            Resource::LibraryIssues => "/library/issues/",
            Resource::LibraryFines => "/library/fines/",
            Resource::Notes => "/notes/",
            Resource::NoteCategories => "/notes/categories/",
            Resource::Notices => "/notices/",
            Resource::NoticeCategories => "/notices/categories/",
            Resource::AcademicYears => "/results/academic-years/",
            Resource::Semesters => "/results/semesters/",
            Resource::Exams => "/results/exams/",
            Resource::Hostels => "/hostel/",
            Resource::HostelRooms => "/hostel/rooms/",
            Resource::HostelAllocations => "/hostel/allocations/",
            Resource::Users => "/accounts/users/",
        }
    }

    pub fn item_path(self, id: i64) -> String {
        format!("{}{}/", self.path(), id)
    }

    /// Students read notices, notes, the library catalogue and the academic
    /// calendar but never write.
    pub fn student_readable(self) -> bool {
        matches!(
            self,
            Resource::Notes
                | Resource::NoteCategories
                | Resource::Notices
                | Resource::NoticeCategories
                | Resource::LibraryBooks
                | Resource::Subjects
                | Resource::AcademicYears
                | Resource::Semesters
                | Resource::Exams
        )
    }

    /// Accounts, hostel records and the academic calendar are changed from
    /// admin screens only.
    pub fn admin_writes_only(self) -> bool {
        matches!(
            self,
            Resource::Users
                | Resource::Hostels
                | Resource::HostelRooms
                | Resource::HostelAllocations
                | Resource::AcademicYears
                | Resource::Semesters
        )
    }
}
