use crate::model::Group;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub student_id: String,
    pub student_name: String,
    pub group_id: String,
    pub group_name: String,
    pub ticket_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub total: u64,
    pub student_count: usize,
}

/// Students with at least one ticket, highest count first. Ties keep roster
/// order (group order, then student order).
pub fn compute_report<'a>(groups: impl IntoIterator<Item = &'a Group>) -> Report {
    let mut rows: Vec<ReportRow> = Vec::new();
    let mut total: u64 = 0;
    for group in groups {
        for student in group.students.iter() {
            total += student.ticket_count as u64;
            if student.ticket_count == 0 {
                continue;
            }
            rows.push(ReportRow {
                student_id: student.id.clone(),
                student_name: student.name.clone(),
                group_id: group.id.clone(),
                group_name: group.name.clone(),
                ticket_count: student.ticket_count,
            });
        }
    }
    rows.sort_by(|a, b| b.ticket_count.cmp(&a.ticket_count));
    Report {
        student_count: rows.len(),
        rows,
        total,
    }
}
