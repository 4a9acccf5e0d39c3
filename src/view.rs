//! Screen and edit-modal state, independent of any rendering.

use crate::model::Group;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "camelCase")]
pub enum Screen {
    ClassList,
    ClassDetail {
        #[serde(rename = "groupId")]
        group_id: String,
    },
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Classes,
    Report,
}

impl Tab {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "classes" => Some(Tab::Classes),
            "report" => Some(Tab::Report),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModal {
    pub group_id: String,
    pub student_id: String,
    pub student_name: String,
    pub pending_value: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error("{0}")]
    InvalidTransition(&'static str),
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("student not found: {0}")]
    StudentNotFound(String),
    #[error("a save is in progress")]
    Busy,
}

impl ViewError {
    pub fn code(&self) -> &'static str {
        match self {
            ViewError::InvalidTransition(_) => "invalid_transition",
            ViewError::GroupNotFound(_) | ViewError::StudentNotFound(_) => "not_found",
            ViewError::Busy => "busy",
        }
    }
}

/// What happened to a modal action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalAction {
    Applied,
    /// Swallowed because a save is running.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewController {
    #[serde(flatten)]
    screen: Screen,
    modal: Option<EditModal>,
    saving: bool,
}

impl Default for ViewController {
    fn default() -> Self {
        Self {
            screen: Screen::ClassList,
            modal: None,
            saving: false,
        }
    }
}

impl ViewController {
    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn selected_group_id(&self) -> Option<&str> {
        match &self.screen {
            Screen::ClassDetail { group_id } => Some(group_id),
            _ => None,
        }
    }

    fn ensure_no_modal(&self) -> Result<(), ViewError> {
        if self.modal.is_some() {
            return Err(ViewError::InvalidTransition("close the edit dialog first"));
        }
        Ok(())
    }

    pub fn select_group<'a>(
        &mut self,
        groups: impl IntoIterator<Item = &'a Group>,
        group_id: &str,
    ) -> Result<(), ViewError> {
        self.ensure_no_modal()?;
        if self.screen != Screen::ClassList {
            return Err(ViewError::InvalidTransition(
                "a class can only be opened from the class list",
            ));
        }
        if !groups.into_iter().any(|g| g.id == group_id) {
            return Err(ViewError::GroupNotFound(group_id.to_string()));
        }
        self.screen = Screen::ClassDetail {
            group_id: group_id.to_string(),
        };
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), ViewError> {
        self.ensure_no_modal()?;
        match self.screen {
            Screen::ClassDetail { .. } => {
                self.screen = Screen::ClassList;
                Ok(())
            }
            _ => Err(ViewError::InvalidTransition("back is only available in a class")),
        }
    }

    pub fn switch_tab(&mut self, tab: Tab) -> Result<(), ViewError> {
        self.ensure_no_modal()?;
        self.screen = match tab {
            Tab::Report => Screen::Report,
            Tab::Classes => Screen::ClassList,
        };
        Ok(())
    }

    /// Opens the edit dialog for one student of the selected class.
    pub fn tap_student<'a>(
        &mut self,
        groups: impl IntoIterator<Item = &'a Group>,
        student_id: &str,
    ) -> Result<(), ViewError> {
        if self.saving {
            return Err(ViewError::Busy);
        }
        self.ensure_no_modal()?;
        let Screen::ClassDetail { group_id } = &self.screen else {
            return Err(ViewError::InvalidTransition(
                "students can only be edited from a class",
            ));
        };
        let group = groups
            .into_iter()
            .find(|g| &g.id == group_id)
            .ok_or_else(|| ViewError::GroupNotFound(group_id.clone()))?;
        let student = group
            .student(student_id)
            .ok_or_else(|| ViewError::StudentNotFound(student_id.to_string()))?;
        self.modal = Some(EditModal {
            group_id: group.id.clone(),
            student_id: student.id.clone(),
            student_name: student.name.clone(),
            pending_value: student.ticket_count,
        });
        Ok(())
    }

    fn modal_mut(&mut self) -> Result<&mut EditModal, ViewError> {
        self.modal
            .as_mut()
            .ok_or(ViewError::InvalidTransition("no edit dialog is open"))
    }

    pub fn increment(&mut self) -> Result<ModalAction, ViewError> {
        if self.saving {
            return Ok(ModalAction::Ignored);
        }
        let modal = self.modal_mut()?;
        modal.pending_value = modal.pending_value.saturating_add(1);
        Ok(ModalAction::Applied)
    }

    pub fn decrement(&mut self) -> Result<ModalAction, ViewError> {
        if self.saving {
            return Ok(ModalAction::Ignored);
        }
        let modal = self.modal_mut()?;
        modal.pending_value = modal.pending_value.saturating_sub(1);
        Ok(ModalAction::Applied)
    }

    pub fn cancel(&mut self) -> Result<ModalAction, ViewError> {
        if self.saving {
            return Ok(ModalAction::Ignored);
        }
        self.modal_mut()?;
        self.modal = None;
        Ok(ModalAction::Applied)
    }

    /// First half of confirm: marks the save as running and hands back the
    /// edit to apply. `Ok(None)` when a save is already running.
    pub fn begin_confirm(&mut self) -> Result<Option<EditModal>, ViewError> {
        if self.saving {
            return Ok(None);
        }
        let modal = self.modal_mut()?.clone();
        self.saving = true;
        Ok(Some(modal))
    }

    /// Second half of confirm: closes the dialog.
    pub fn finish_confirm(&mut self) {
        self.saving = false;
        self.modal = None;
    }

    /// Undoes `begin_confirm` when the edit could not be applied at all.
    pub fn abort_confirm(&mut self) {
        self.saving = false;
    }

    /// Drops references to groups or students that no longer exist, e.g.
    /// after adopting a pulled roster.
    pub fn reconcile<'a>(&mut self, groups: impl IntoIterator<Item = &'a Group> + Clone) {
        if let Screen::ClassDetail { group_id } = &self.screen {
            if !groups.clone().into_iter().any(|g| &g.id == group_id) {
                log::info!("selected class {group_id} disappeared, returning to class list");
                self.screen = Screen::ClassList;
            }
        }
        if self.saving {
            return;
        }
        if let Some(modal) = &self.modal {
            let still_there = groups
                .into_iter()
                .find(|g| g.id == modal.group_id)
                .and_then(|g| g.student(&modal.student_id))
                .is_some();
            if !still_there || self.selected_group_id() != Some(modal.group_id.as_str()) {
                self.modal = None;
            }
        }
    }
}
