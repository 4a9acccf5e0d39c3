use crate::model::Group;
use im::Vector;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("student not found: {0}")]
    StudentNotFound(String),
}

/// In-memory roster. Updates never touch records other than the target; the
/// persistent vectors share every untouched group and student with the
/// previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct GroupStore {
    groups: Vector<Group>,
    revision: u64,
}

impl GroupStore {
    pub fn new(groups: impl IntoIterator<Item = Group>) -> Self {
        Self {
            groups: groups.into_iter().collect(),
            revision: 0,
        }
    }

    pub fn groups(&self) -> &Vector<Group> {
        &self.groups
    }

    pub fn snapshot(&self) -> Vector<Group> {
        self.groups.clone()
    }

    /// Bumped by every mutation and replace.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn group(&self, group_id: &str) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn replace(&mut self, groups: impl IntoIterator<Item = Group>) {
        self.groups = groups.into_iter().collect();
        self.revision += 1;
    }

    pub fn set_ticket_count(
        &mut self,
        group_id: &str,
        student_id: &str,
        value: u32,
    ) -> Result<&Group, StoreError> {
        let gi = self
            .groups
            .iter()
            .position(|g| g.id == group_id)
            .ok_or_else(|| StoreError::GroupNotFound(group_id.to_string()))?;
        let group = &self.groups[gi];
        let si = group
            .students
            .iter()
            .position(|s| s.id == student_id)
            .ok_or_else(|| StoreError::StudentNotFound(student_id.to_string()))?;

        let mut student = group.students[si].clone();
        student.ticket_count = value;
        let updated = Group {
            students: group.students.update(si, student),
            ..group.clone()
        };
        self.groups = self.groups.update(gi, updated);
        self.revision += 1;
        Ok(&self.groups[gi])
    }
}
