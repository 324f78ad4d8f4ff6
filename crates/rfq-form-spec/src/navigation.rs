use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::answers::{AnswerMap, FieldRef};
use crate::render::{RenderSection, render_section};
use crate::spec::blueprint::Blueprint;
use crate::spec::component::Section;
use crate::spec::policy::{NavigationPolicy, RequiredPolicy};
use crate::validate::{SectionReport, evaluate_section};

/// Where a form instance currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NavState {
    AtSection { index: usize },
    Submitted,
}

/// Result of a successful navigation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved { from: usize, to: usize },
    Stayed { index: usize },
    /// Forward navigation from the last section; route to submission.
    ReadyToSubmit { index: usize },
}

/// Forward navigation refused because required fields are unanswered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("section '{section_id}' still has {} required field(s) to answer", .missing.len())]
pub struct ValidationBlocked {
    pub section_id: String,
    pub section_index: usize,
    pub missing: Vec<FieldRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error(transparent)]
    Blocked(#[from] ValidationBlocked),
    #[error("section {target} cannot be reached from section {current}")]
    JumpNotAllowed { current: usize, target: usize },
    #[error("section index {index} is out of range (form has {count} sections)")]
    OutOfRange { index: usize, count: usize },
    #[error("form has already been submitted")]
    Submitted,
}

/// Owns the current-section state machine of one form instance.
#[derive(Debug, Clone)]
pub struct Navigator {
    blueprint: Blueprint,
    policy: NavigationPolicy,
    required: RequiredPolicy,
    state: NavState,
    furthest_visited: usize,
}

impl Navigator {
    pub fn new(blueprint: Blueprint, policy: NavigationPolicy, required: RequiredPolicy) -> Self {
        Self {
            blueprint,
            policy,
            required,
            state: NavState::AtSection { index: 0 },
            furthest_visited: 0,
        }
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn policy(&self) -> NavigationPolicy {
        self.policy
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.state {
            NavState::AtSection { index } => Some(index),
            NavState::Submitted => None,
        }
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.current_index()
            .and_then(|index| self.blueprint.section(index).ok())
    }

    pub fn furthest_visited(&self) -> usize {
        self.furthest_visited
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.state, NavState::Submitted)
    }

    pub fn is_last(&self) -> bool {
        self.current_index()
            .is_some_and(|index| index + 1 == self.blueprint.section_count())
    }

    /// Completeness report of the section at `index`.
    pub fn section_report(
        &self,
        index: usize,
        answers: &AnswerMap,
    ) -> Result<SectionReport, NavigationError> {
        let section = self
            .blueprint
            .section(index)
            .map_err(|_| self.out_of_range(index))?;
        Ok(evaluate_section(index, section, answers, &self.required))
    }

    pub fn next(&mut self, answers: &AnswerMap) -> Result<Navigation, NavigationError> {
        let current = self.require_active()?;
        self.gate(current, answers)?;

        if current + 1 >= self.blueprint.section_count() {
            debug!(form = %self.blueprint.form_id(), section = current, "last section passed");
            return Ok(Navigation::ReadyToSubmit { index: current });
        }
        Ok(self.move_to(current, current + 1))
    }

    /// Backward navigation is never gated.
    pub fn previous(&mut self) -> Result<Navigation, NavigationError> {
        let current = self.require_active()?;
        if current == 0 {
            return Ok(Navigation::Stayed { index: 0 });
        }
        Ok(self.move_to(current, current - 1))
    }

    /// Jumps to a visited section, or to the one right after the current
    /// section when forward navigation would be allowed.
    pub fn jump_to(
        &mut self,
        target: usize,
        answers: &AnswerMap,
    ) -> Result<Navigation, NavigationError> {
        let current = self.require_active()?;
        if target >= self.blueprint.section_count() {
            return Err(self.out_of_range(target));
        }
        if target == current {
            return Ok(Navigation::Stayed { index: current });
        }
        if target <= self.furthest_visited {
            return Ok(self.move_to(current, target));
        }
        if target == current + 1 {
            self.gate(current, answers)?;
            return Ok(self.move_to(current, target));
        }
        Err(NavigationError::JumpNotAllowed { current, target })
    }

    /// Places the navigator on the first section that does not pass the
    /// gate, marking everything before it as visited. Used after a draft
    /// has been restored.
    pub fn resume(&mut self, answers: &AnswerMap) -> Result<usize, NavigationError> {
        self.require_active()?;
        let last = self.blueprint.section_count().saturating_sub(1);
        let mut index = 0;
        while index < last {
            let report = self.section_report(index, answers)?;
            if !report.is_complete() {
                break;
            }
            index += 1;
        }
        self.state = NavState::AtSection { index };
        self.furthest_visited = self.furthest_visited.max(index);
        debug!(form = %self.blueprint.form_id(), section = index, "resumed");
        Ok(index)
    }

    pub fn mark_submitted(&mut self) {
        self.state = NavState::Submitted;
    }

    pub fn render(&self, answers: &AnswerMap) -> Result<RenderSection, NavigationError> {
        let index = self.require_active()?;
        render_section(&self.blueprint, index, answers, &self.required)
            .map_err(|_| self.out_of_range(index))
    }

    fn require_active(&self) -> Result<usize, NavigationError> {
        self.current_index().ok_or(NavigationError::Submitted)
    }

    fn gate(&self, index: usize, answers: &AnswerMap) -> Result<(), NavigationError> {
        let report = self.section_report(index, answers)?;
        if report.is_complete() || self.policy == NavigationPolicy::AllowSkip {
            return Ok(());
        }
        debug!(
            form = %self.blueprint.form_id(),
            section = %report.section_id,
            missing = report.missing_field_ids.len(),
            "forward navigation blocked"
        );
        Err(ValidationBlocked {
            section_id: report.section_id,
            section_index: index,
            missing: report.missing_field_ids,
        }
        .into())
    }

    fn move_to(&mut self, from: usize, to: usize) -> Navigation {
        self.state = NavState::AtSection { index: to };
        self.furthest_visited = self.furthest_visited.max(to);
        debug!(form = %self.blueprint.form_id(), from, to, "section changed");
        Navigation::Moved { from, to }
    }

    fn out_of_range(&self, index: usize) -> NavigationError {
        NavigationError::OutOfRange {
            index,
            count: self.blueprint.section_count(),
        }
    }
}
