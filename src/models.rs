use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entity instance as returned by the API: an opaque field mapping.
///
/// The console is field-type-agnostic; records are kept as raw JSON objects
/// and fields are addressed by name (dotted paths reach nested objects).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Record(pub Map<String, Value>);

impl Record {
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Record(map)),
            _ => None,
        }
    }

    /// Raw value at a dotted path, e.g. `"alumni.name"`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = self.0.get(path.split('.').next()?)?;
        for segment in path.split('.').skip(1) {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Textual form of a field. Strings, numbers, and booleans coerce to
    /// text; null, missing, and structured values yield `None` so that
    /// partially-populated API responses never panic downstream.
    pub fn text(&self, path: &str) -> Option<String> {
        match self.get(path)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Display form: missing or null fields render as a placeholder.
    pub fn display(&self, path: &str) -> String {
        self.text(path).unwrap_or_else(|| "N/A".to_string())
    }
}

/// Which login endpoint and token slot an entity belongs to. The admin
/// console and the university portal authenticate independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Realm {
    Admin,
    University,
}

impl Realm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Realm::Admin => "admin",
            Realm::University => "university",
        }
    }

    pub fn login_path(&self) -> &'static str {
        match self {
            Realm::Admin => "api/auth/login",
            Realm::University => "api/university/auth/login",
        }
    }

    pub fn token_file(&self) -> &'static str {
        match self {
            Realm::Admin => "admin.token",
            Realm::University => "university.token",
        }
    }
}

/// The entity catalog: one variant per console screen. Each carries the
/// REST path, the key the collection array lives under in the response,
/// the fields the free-text search scans, and the exact-match filter
/// fields whose dropdown options are derived from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    AdmissionLeads,
    Enquiries,
    Complaints,
    Universities,
    Programs,
    Branches,
    Faculty,
    Alumni,
    Blogs,
    Events,
    TeamMembers,
    Testimonials,
    Notices,
    Internships,
    PlacedStudents,
    PlacementTeam,
    Collaborators,
    BirthdayWishes,
    VideoFeedbacks,
    AppliedInstructors,
    UniversityAdmissionLeads,
    UniversityEnquiries,
}

impl Entity {
    pub fn all() -> &'static [Entity] {
        &[
            Entity::AdmissionLeads,
            Entity::Enquiries,
            Entity::Complaints,
            Entity::Universities,
            Entity::Programs,
            Entity::Branches,
            Entity::Faculty,
            Entity::Alumni,
            Entity::Blogs,
            Entity::Events,
            Entity::TeamMembers,
            Entity::Testimonials,
            Entity::Notices,
            Entity::Internships,
            Entity::PlacedStudents,
            Entity::PlacementTeam,
            Entity::Collaborators,
            Entity::BirthdayWishes,
            Entity::VideoFeedbacks,
            Entity::AppliedInstructors,
            Entity::UniversityAdmissionLeads,
            Entity::UniversityEnquiries,
        ]
    }

    /// Identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::AdmissionLeads => "admission-leads",
            Entity::Enquiries => "enquiries",
            Entity::Complaints => "complaints",
            Entity::Universities => "universities",
            Entity::Programs => "programs",
            Entity::Branches => "branches",
            Entity::Faculty => "faculty",
            Entity::Alumni => "alumni",
            Entity::Blogs => "blogs",
            Entity::Events => "events",
            Entity::TeamMembers => "team-members",
            Entity::Testimonials => "testimonials",
            Entity::Notices => "notices",
            Entity::Internships => "internships",
            Entity::PlacedStudents => "placed-students",
            Entity::PlacementTeam => "placement-team",
            Entity::Collaborators => "collaborators",
            Entity::BirthdayWishes => "birthday-wishes",
            Entity::VideoFeedbacks => "videofeedbacks",
            Entity::AppliedInstructors => "applied-instructors",
            Entity::UniversityAdmissionLeads => "university-admission-leads",
            Entity::UniversityEnquiries => "university-enquiries",
        }
    }

    /// REST path under the API base URL.
    pub fn path(&self) -> &'static str {
        match self {
            Entity::AdmissionLeads => "api/admission-leads/display",
            Entity::Enquiries => "api/enquiries",
            Entity::Complaints => "api/complaints",
            Entity::Universities => "api/universities",
            Entity::Programs => "api/programs",
            Entity::Branches => "api/branches",
            Entity::Faculty => "api/faculty",
            Entity::Alumni => "api/alumni",
            Entity::Blogs => "api/blogs",
            Entity::Events => "api/events",
            Entity::TeamMembers => "api/team-members",
            Entity::Testimonials => "api/testimonials",
            Entity::Notices => "api/notices",
            Entity::Internships => "api/internships",
            Entity::PlacedStudents => "api/placed-students",
            Entity::PlacementTeam => "api/placement-team",
            Entity::Collaborators => "api/collaborators",
            Entity::BirthdayWishes => "api/birthday-wishes",
            Entity::VideoFeedbacks => "api/videofeedbacks",
            Entity::AppliedInstructors => "api/applied-instructors",
            Entity::UniversityAdmissionLeads => "api/university/auth/admission-leads",
            Entity::UniversityEnquiries => "api/university/auth/enquiries",
        }
    }

    /// Path used for mutations. Most screens create/update/delete against
    /// the collection path; admission leads only diverge for display.
    pub fn mutation_path(&self) -> &'static str {
        match self {
            Entity::AdmissionLeads => "api/admission-leads",
            _ => self.path(),
        }
    }

    /// Key the record array lives under in the response body. `data` is
    /// the API's generic envelope; several screens use a named key.
    pub fn array_key(&self) -> &'static str {
        match self {
            Entity::AdmissionLeads => "admissionLeads",
            Entity::Enquiries => "data",
            Entity::Complaints => "complaints",
            Entity::Universities => "data",
            Entity::Programs => "data",
            Entity::Branches => "branches",
            Entity::Faculty => "faculty",
            Entity::Alumni => "alumni",
            Entity::Blogs => "blogPosts",
            Entity::Events => "events",
            Entity::TeamMembers => "teamMembers",
            Entity::Testimonials => "testimonials",
            Entity::Notices => "notices",
            Entity::Internships => "internships",
            Entity::PlacedStudents => "placedStudents",
            Entity::PlacementTeam => "placementTeam",
            Entity::Collaborators => "collaborators",
            Entity::BirthdayWishes => "birthdayWishes",
            Entity::VideoFeedbacks => "data",
            Entity::AppliedInstructors => "instructors",
            Entity::UniversityAdmissionLeads => "data",
            Entity::UniversityEnquiries => "data",
        }
    }

    pub fn realm(&self) -> Realm {
        match self {
            Entity::UniversityAdmissionLeads | Entity::UniversityEnquiries => Realm::University,
            _ => Realm::Admin,
        }
    }

    /// Fields scanned by the free-text search (case-insensitive substring,
    /// OR across fields).
    pub fn searchable_fields(&self) -> &'static [&'static str] {
        match self {
            Entity::AdmissionLeads | Entity::UniversityAdmissionLeads => {
                &["name", "phone", "email"]
            }
            Entity::Enquiries | Entity::UniversityEnquiries => {
                &["name", "phone", "email", "message"]
            }
            Entity::Complaints => {
                &["name", "admissionNumber", "complaintType", "complaintDetails"]
            }
            Entity::Universities => &["name", "location"],
            Entity::Programs => &["name", "description"],
            Entity::Branches => &["name"],
            Entity::Faculty => &["name", "email", "designation"],
            Entity::Alumni => &["name", "email", "company"],
            Entity::Blogs => &["title", "author"],
            Entity::Events => &["title", "description"],
            Entity::TeamMembers => &["name", "email", "designation"],
            Entity::Testimonials => &["name", "message"],
            Entity::Notices => &["title", "description"],
            Entity::Internships => &["title", "company"],
            Entity::PlacedStudents => &["name", "company"],
            Entity::PlacementTeam => &["name", "email"],
            Entity::Collaborators => &["name"],
            Entity::BirthdayWishes => &["name", "message"],
            Entity::VideoFeedbacks => &["name", "title"],
            Entity::AppliedInstructors => &["name", "email", "qualification"],
        }
    }

    /// Exact-match filter fields (AND across fields; options are derived
    /// from the fetched collection, never hardcoded).
    pub fn filter_fields(&self) -> &'static [&'static str] {
        match self {
            Entity::AdmissionLeads | Entity::UniversityAdmissionLeads => {
                &["state", "program", "university", "status"]
            }
            Entity::Enquiries | Entity::UniversityEnquiries => &["campus", "status"],
            Entity::Complaints => &["campus", "status"],
            Entity::Universities => &["location"],
            Entity::Programs => &["university"],
            Entity::Branches => &["program"],
            Entity::Faculty => &["department", "university"],
            Entity::Alumni => &["batch", "university"],
            Entity::Blogs => &["category"],
            Entity::Events => &["campus"],
            Entity::TeamMembers => &["department"],
            Entity::Testimonials => &["campus"],
            Entity::Notices => &["campus"],
            Entity::Internships => &["company"],
            Entity::PlacedStudents => &["company", "batch"],
            Entity::PlacementTeam => &["department"],
            Entity::Collaborators => &[],
            Entity::BirthdayWishes => &[],
            Entity::VideoFeedbacks => &[],
            Entity::AppliedInstructors => &["qualification"],
        }
    }

    /// Export column order and headers, fixed per screen.
    pub fn export_columns(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Entity::AdmissionLeads | Entity::UniversityAdmissionLeads => &[
                ("name", "Name"),
                ("phone", "Phone"),
                ("email", "Email"),
                ("state", "State"),
                ("district", "District"),
                ("university", "University"),
                ("program", "Program"),
                ("branch", "Branch"),
                ("createdAt", "Created At"),
            ],
            Entity::Enquiries | Entity::UniversityEnquiries => &[
                ("name", "Name"),
                ("phone", "Phone"),
                ("email", "Email"),
                ("campus", "Campus"),
                ("message", "Message"),
                ("createdAt", "Date"),
            ],
            Entity::Complaints => &[
                ("name", "Name"),
                ("campus", "Campus"),
                ("admissionNumber", "Admission Number"),
                ("complaintType", "Complaint Type"),
                ("complaintDetails", "Complaint Details"),
                ("date", "Date"),
                ("status", "Status"),
            ],
            Entity::Universities => &[
                ("name", "Name"),
                ("location", "Location"),
                ("establishedYear", "Established"),
            ],
            Entity::Programs => &[
                ("name", "Name"),
                ("university", "University"),
                ("duration", "Duration"),
            ],
            Entity::Branches => &[("name", "Name"), ("program", "Program")],
            Entity::Faculty => &[
                ("name", "Name"),
                ("email", "Email"),
                ("designation", "Designation"),
                ("department", "Department"),
            ],
            Entity::Alumni => &[
                ("name", "Name"),
                ("email", "Email"),
                ("batch", "Batch"),
                ("company", "Company"),
                ("linkedin", "LinkedIn"),
            ],
            Entity::Blogs => &[
                ("title", "Title"),
                ("author", "Author"),
                ("category", "Category"),
                ("createdAt", "Published"),
            ],
            Entity::Events => &[
                ("title", "Title"),
                ("campus", "Campus"),
                ("date", "Date"),
                ("description", "Description"),
            ],
            Entity::TeamMembers => &[
                ("name", "Name"),
                ("email", "Email"),
                ("designation", "Designation"),
                ("department", "Department"),
            ],
            Entity::Testimonials => &[
                ("name", "Name"),
                ("campus", "Campus"),
                ("message", "Message"),
            ],
            Entity::Notices => &[
                ("title", "Title"),
                ("campus", "Campus"),
                ("description", "Description"),
                ("createdAt", "Date"),
            ],
            Entity::Internships => &[
                ("title", "Title"),
                ("company", "Company"),
                ("duration", "Duration"),
            ],
            Entity::PlacedStudents => &[
                ("name", "Name"),
                ("company", "Company"),
                ("batch", "Batch"),
                ("package", "Package"),
            ],
            Entity::PlacementTeam => &[
                ("name", "Name"),
                ("email", "Email"),
                ("department", "Department"),
            ],
            Entity::Collaborators => &[("name", "Name"), ("website", "Website")],
            Entity::BirthdayWishes => &[
                ("name", "Name"),
                ("message", "Message"),
                ("date", "Date"),
            ],
            Entity::VideoFeedbacks => &[
                ("name", "Name"),
                ("title", "Title"),
                ("videoUrl", "Video URL"),
            ],
            Entity::AppliedInstructors => &[
                ("name", "Name"),
                ("phone", "Phone"),
                ("email", "Email"),
                ("qualification", "Qualification"),
                ("experience", "Experience"),
                ("resumeLink", "Resume Link"),
                ("dateApplied", "Date Applied"),
            ],
        }
    }

    /// Default sort applied after fetch, `(field, descending)`. Only the
    /// applied-instructors screen sorts; everything else keeps server order.
    pub fn default_sort(&self) -> Option<(&'static str, bool)> {
        match self {
            Entity::AppliedInstructors => Some(("dateApplied", true)),
            _ => None,
        }
    }

    /// Whether the endpoint paginates server-side via `page`/`itemsPerPage`
    /// query params and reports `totalPages` in the response.
    pub fn server_paginated(&self) -> bool {
        matches!(self, Entity::AppliedInstructors)
    }
}

/// Active search/filter combination. A blank search term and blank
/// selections mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    /// Free-text search term, matched case-insensitively as a substring
    /// of any searchable field.
    pub search: String,
    /// Exact-match selections, `(field, required value)`. Entries with a
    /// blank value pass everything through.
    pub selections: Vec<(String, String)>,
}

impl FilterCriteria {
    pub fn with_search(search: &str) -> Self {
        FilterCriteria {
            search: search.to_string(),
            selections: Vec::new(),
        }
    }

    pub fn select(mut self, field: &str, value: &str) -> Self {
        self.selections.push((field.to_string(), value.to_string()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.trim().is_empty()
            && self.selections.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// Current page number and fixed page size. The page number is clamped
/// into range whenever the filtered set changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub current_page: usize,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(page_size: usize) -> Self {
        ViewState {
            current_page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Navigate to `page` if it is within `[1, total_pages]`; out-of-range
    /// requests leave the state unchanged. Returns whether it moved.
    pub fn change_page(&mut self, page: usize, total_pages: usize) -> bool {
        if page >= 1 && page <= total_pages {
            self.current_page = page;
            true
        } else {
            false
        }
    }
}

/// Result of applying criteria and pagination to a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredView {
    pub page_records: Vec<Record>,
    pub total_pages: usize,
    pub total_filtered: usize,
}

/// One fetched collection plus any server-side pagination metadata. When
/// `total_pages` is present the server already sliced the page and the
/// client-side paginator is bypassed.
#[derive(Debug, Clone, Default)]
pub struct CollectionPage {
    pub records: Vec<Record>,
    pub total_pages: Option<u64>,
    pub total_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_text_coercion() {
        let record = Record::from_value(json!({
            "name": "Asha",
            "age": 21,
            "active": true,
            "email": null,
        }))
        .unwrap();

        assert_eq!(record.text("name").as_deref(), Some("Asha"));
        assert_eq!(record.text("age").as_deref(), Some("21"));
        assert_eq!(record.text("active").as_deref(), Some("true"));
        assert_eq!(record.text("email"), None);
        assert_eq!(record.text("missing"), None);
    }

    #[test]
    fn test_record_nested_path_and_placeholder() {
        let record = Record::from_value(json!({
            "alumni": { "name": "Ravi" },
            "event": null,
        }))
        .unwrap();

        assert_eq!(record.text("alumni.name").as_deref(), Some("Ravi"));
        assert_eq!(record.display("event.title"), "N/A");
        assert_eq!(record.display("alumni.name"), "Ravi");
    }

    #[test]
    fn test_entity_catalog_is_consistent() {
        for entity in Entity::all() {
            assert!(!entity.path().is_empty());
            assert!(!entity.array_key().is_empty());
            assert!(!entity.searchable_fields().is_empty());
            assert!(!entity.export_columns().is_empty());
        }
        assert_eq!(Entity::AdmissionLeads.realm(), Realm::Admin);
        assert_eq!(Entity::UniversityEnquiries.realm(), Realm::University);
    }

    #[test]
    fn test_view_state_rejects_out_of_range_pages() {
        let mut view = ViewState::new(5);
        assert!(!view.change_page(0, 3));
        assert_eq!(view.current_page, 1);
        assert!(view.change_page(3, 3));
        assert_eq!(view.current_page, 3);
        assert!(!view.change_page(4, 3));
        assert_eq!(view.current_page, 3);
    }
}
