use im::Vector;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A class ("turma") and its ordered roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "alunos", default)]
    pub students: Vector<Student>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    // Older payloads (and the spreadsheet) carry no student ids; see `normalize_ids`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "bilhetes", default)]
    pub ticket_count: u32,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ticket_count: 0,
        }
    }
}

impl Group {
    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn total_tickets(&self) -> u64 {
        self.students.iter().map(|s| s.ticket_count as u64).sum()
    }

    pub fn students_with_tickets(&self) -> usize {
        self.students.iter().filter(|s| s.ticket_count > 0).count()
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            student_count: self.students.len(),
            total_tickets: self.total_tickets(),
            students_with_tickets: self.students_with_tickets(),
        }
    }
}

/// Row of the class list screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    pub id: String,
    pub name: String,
    pub student_count: usize,
    pub total_tickets: u64,
    pub students_with_tickets: usize,
}

/// Makes group ids unique across the roster and student ids unique within
/// each group.
///
/// A student without an id gets `"<group id>.<position>"` (1-based). The first
/// student carrying a given id keeps it; later students repeating it are
/// re-keyed the same way as a missing id. Generated ids skip every id already
/// present, bumping the numeric part until free. Repeated group ids get the
/// same treatment with `"<id>.<n>"`. Running this twice is a no-op.
pub fn normalize_ids(groups: Vec<Group>) -> Vec<Group> {
    let mut group_ids = IdAllocator::new(groups.iter().map(|g| g.id.as_str()));
    groups
        .into_iter()
        .map(|mut group| {
            group.id = group_ids.claim(&group.id, |n| format!("{}.{n}", group.id), 2);

            let mut student_ids = IdAllocator::new(group.students.iter().map(|s| s.id.as_str()));
            let gid = group.id.clone();
            for (idx, student) in group.students.iter_mut().enumerate() {
                student.id = student_ids.claim(&student.id, |n| format!("{gid}.{n}"), idx + 1);
            }
            group
        })
        .collect()
}

/// Hands out unique ids. Ids present up front are reserved; each one goes to
/// the first record that asks for it.
struct IdAllocator {
    taken: HashSet<String>,
    kept: HashSet<String>,
}

impl IdAllocator {
    fn new<'a>(existing: impl Iterator<Item = &'a str>) -> Self {
        Self {
            taken: existing
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            kept: HashSet::new(),
        }
    }

    fn claim(&mut self, current: &str, make: impl Fn(usize) -> String, start: usize) -> String {
        if !current.is_empty() && self.kept.insert(current.to_string()) {
            return current.to_string();
        }
        let mut n = start;
        let mut candidate = make(n);
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = make(n);
        }
        self.taken.insert(candidate.clone());
        self.kept.insert(candidate.clone());
        candidate
    }
}

/// Roster used when neither the remote endpoint nor local storage has data.
pub fn default_groups() -> Vec<Group> {
    let seed: [(&str, &str, &[&str]); 3] = [
        ("1", "10 A", &["Ana Silva", "Bruno Costa", "Carlos Santos"]),
        ("2", "10 B", &["Diana Oliveira", "Eduardo Lima"]),
        (
            "3",
            "11 A",
            &[
                "Francisca Pinto",
                "Gabriel Sousa",
                "Helena Ferreira",
                "Igor Rocha",
            ],
        ),
    ];

    seed.iter()
        .map(|(id, name, students)| Group {
            id: id.to_string(),
            name: name.to_string(),
            students: students
                .iter()
                .enumerate()
                .map(|(i, n)| Student::new(format!("{id}.{}", i + 1), *n))
                .collect(),
        })
        .collect()
}
